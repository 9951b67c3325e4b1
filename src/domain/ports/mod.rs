mod fetcher_port;
mod registry_store_port;
mod transcoder_port;

pub use fetcher_port::RemoteFetcher;
pub use registry_store_port::RegistryStore;
pub use transcoder_port::Transcoder;
