//! Shared primitives and traits for the orfeval workspace.
//!
//! `orfeval-core` provides the foundation the other orfeval crates build on:
//!
//! - **Error types**: [`OrfevalError`] and [`Result`] for structured error handling
//! - **Traits**: small domain abstractions like [`Annotated`] and [`Summarizable`]

pub mod error;
pub mod traits;

pub use error::{OrfevalError, Result};
pub use traits::*;
