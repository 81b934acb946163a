mod base;
mod construct;
mod interface;
mod middleware;
mod ordering;
mod printer;

pub use base::*;
pub(crate) use interface::{ConsoleInterface, UserInterface};
pub use middleware::*;

#[cfg(feature = "unit_test")]
pub(crate) use interface::SilentInterface;
#[cfg(test)]
pub(crate) use interface::util;
