//! Core types shared by every crate in the Atrium Gate workspace:
//! configuration schemas, the unified error type, and the result alias.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
