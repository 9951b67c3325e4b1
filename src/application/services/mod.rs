pub mod image_optimizer;
pub mod optimized_image;

pub use image_optimizer::{ImageOptimizer, OptimizerConfig};
pub use optimized_image::{DEFAULT_RETRY_BACKOFF, OptimizedImage};
