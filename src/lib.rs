pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod records;
pub mod stream;

pub use error::{AppError, Result};
