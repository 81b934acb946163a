mod config;
mod node;
mod slot;
mod variant;

pub use config::*;
pub use node::*;
pub use slot::*;
pub use variant::*;
