mod api;
mod core;
mod model;
mod resolver;

pub(crate) use self::core::*;
pub use api::*;
pub(crate) use model::*;
pub use resolver::resolve;
pub(crate) use resolver::resolve_repeated;
