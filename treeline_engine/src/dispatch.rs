mod default;
mod dispatcher;
mod selector;

pub(crate) use self::default::match_default;
pub(crate) use self::dispatcher::*;
pub(crate) use self::selector::*;
