//! Cross-cutting request plumbing: errors, input validation, authorization
//! and logging.

pub mod error;
pub mod extract;
pub mod gate;
pub mod logging;
pub mod response;
pub mod validators;

pub use error::{Error, Result};
