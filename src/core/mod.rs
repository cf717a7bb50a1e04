//! Core domain types and the error taxonomy shared by every pipeline stage.

pub mod errors;
pub mod types;

pub use errors::{AiError, ModelError, VectorError};
pub use types::*;
