//! Imgstash - an on-device image optimization cache.
//!
//! This crate downloads a remote image once and re-encodes it as a
//! width-bounded JPEG; later requests for the same URL are served from a
//! count-bounded disk cache. Consumers either call
//! [`application::ImageOptimizer`] directly or bind a URL to an
//! [`application::OptimizedImage`] and watch its state change.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the optimization services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "imgstash";
