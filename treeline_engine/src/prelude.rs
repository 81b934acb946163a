//! The arity resolver, which may be imported without concern: `use treeline::prelude::*`.
//!
//! Implement [`Resolvable`] to place your own items over a token run with [`resolve`].

pub use crate::matcher::{resolve, Resolvable, ResolveError, Span};
