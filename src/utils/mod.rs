//! Common utilities: error types, source locations, name interning.

pub mod errors;
pub mod intern;
pub mod location;

pub use errors::*;
pub use intern::{NameInterner, Symbol};
pub use location::{SourceLocation, Span};
