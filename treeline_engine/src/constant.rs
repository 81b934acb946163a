pub(crate) const HELP_NAME: &str = "help";
pub(crate) const HELP_SHORT: char = 'h';

// Selector tokens are `<dotted.path>:<alternative>`.
pub(crate) const SELECTOR_DELIMITER: char = ':';
pub(crate) const PATH_DELIMITER: char = '.';

// Boolean switches also register `--no-<path>`.
pub(crate) const INVERSE_PREFIX: &str = "no-";

// Not a legal alternative name, so it can never collide with a real one.
pub(crate) const PLACEHOLDER_NAME: &str = "<placeholder>";
