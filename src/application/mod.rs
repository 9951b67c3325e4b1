//! Application layer with the optimization services.

/// Service implementations.
pub mod services;

pub use services::{DEFAULT_RETRY_BACKOFF, ImageOptimizer, OptimizedImage, OptimizerConfig};
