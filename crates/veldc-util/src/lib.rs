//! veldc-util - Shared infrastructure for the Veld compiler.
//!
//! This crate provides the pieces every phase of the front end needs:
//! source locations, the fatal error type that carries a location and a
//! message, and the small templating helper used for cast error messages.
//!
//! The front end is fail-fast: the first error wins and is propagated as
//! a [`CompileError`] all the way out of the pipeline. There is no error
//! recovery and no diagnostic batching.

mod error;
mod location;
mod template;

pub use error::{CompileError, CompileResult};
pub use location::Location;
pub use template::render_cast_template;
