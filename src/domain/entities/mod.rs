//! Domain entity definitions.

mod cache_key;
mod options;
mod registry;
mod resolved;
mod transient;

pub use cache_key::CacheKey;
pub use options::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, OptimizeOptions};
pub use registry::{CacheRegistry, RegistryEntry};
pub use resolved::{ImageState, LoadPhase, ResolvedImage, is_remote_url};
pub use transient::TransientDownload;
