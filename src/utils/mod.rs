pub mod error;
pub mod logging;
pub mod normalization;

pub use error::{ImportError, Result};
pub use normalization::{normalize, similarity};
