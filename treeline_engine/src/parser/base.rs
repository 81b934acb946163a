use thiserror::Error;

use crate::matcher::CloseError;

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<String>>()
        .join(", ")
}

/// A malformed specification tree.
///
/// Raised by [`SpecTree::build`](crate::SpecTree::build) before any token is read.
/// Indicates a bug in the code building the tree, rather than in the user's input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpecificationError {
    /// Two slots (or a slot and a family) of one node share a path.
    #[error("Specification error: '{slot}' is declared more than once in '{node}'.")]
    DuplicateSlot {
        /// The node.
        node: String,
        /// The repeated path.
        slot: String,
    },

    /// Two slots of one node share a flag.
    #[error("Specification error: flag '{flag}' is declared more than once in '{node}'.")]
    DuplicateFlag {
        /// The node.
        node: String,
        /// The repeated flag.
        flag: String,
    },

    /// Two alternatives of one family share a name.
    /// Tolerated as a warning; the later registration replaces the earlier one.
    #[error("Specification error: alternative '{alternative}' is registered more than once in '{family}'; the last registration wins.")]
    DuplicateAlternative {
        /// The family.
        family: String,
        /// The repeated alternative name.
        alternative: String,
    },

    /// More than one unbounded slot within one positional run.
    #[error("Specification error: {} are all unbounded within one positional run.", quoted(.slots))]
    OverlappingUnbounded {
        /// The unbounded slots.
        slots: Vec<String>,
    },

    /// A family default matches none of its alternatives.
    #[error("Specification error: the default of '{family}' matches none of {}.", quoted(.candidates))]
    UnmatchableDefault {
        /// The family.
        family: String,
        /// Every selectable alternative.
        candidates: Vec<String>,
    },

    /// A family default matches more than one alternative equally well.
    #[error("Specification error: the default of '{family}' matches each of {}.", quoted(.candidates))]
    AmbiguousDefault {
        /// The family.
        family: String,
        /// The tied alternatives.
        candidates: Vec<String>,
    },

    /// A family without any alternatives.
    #[error("Specification error: family '{family}' has no alternatives.")]
    EmptyFamily {
        /// The family.
        family: String,
    },

    /// A slot that can never be constructed (ex: an empty choice).
    #[error("Specification error: '{slot}' has no constructible variant.")]
    EmptyVariants {
        /// The slot.
        slot: String,
    },

    /// A slot refers to a mutual-exclusion group its node does not declare.
    #[error("Specification error: '{slot}' refers to the undeclared group '{group}'.")]
    UnknownMutexGroup {
        /// The slot.
        slot: String,
        /// The undeclared group.
        group: String,
    },

    /// A path, alternative name or flag that cannot be addressed on the command line.
    #[error("Specification error: invalid name '{name}' ({reason}).")]
    InvalidName {
        /// The name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// The discriminant of a [`ParseError`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownFlag,
    UnrecognizedToken,
    UnknownSelector,
    AmbiguousSelector,
    SelectorOutOfOrder,
    RepeatedSelection,
    MissingSubcommand,
    MissingRequired,
    TooFewValues,
    ArityMismatch,
    Unresolvable,
    InvalidValue,
    RepeatedFlag,
    MutuallyExclusive,
    MissingMutexGroup,
}

/// One independently detectable problem with the user's input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A flag matching no visible slot.
    #[error("Parse error: unknown flag '{flag}'.")]
    UnknownFlag {
        /// The flag, without any `=value`.
        flag: String,
    },

    /// Tokens left over once every visible slot is matched.
    #[error("Parse error: unrecognized token(s) {}.", quoted(.tokens))]
    UnrecognizedToken {
        /// The left over tokens.
        tokens: Vec<String>,
    },

    /// A qualified selector naming no alternative of its family.
    #[error("Parse error: unknown selector '{token}' for '{family}' (choices: {}).", quoted(.choices))]
    UnknownSelector {
        /// The selector token.
        token: String,
        /// The family it addresses.
        family: String,
        /// The selectable alternatives.
        choices: Vec<String>,
    },

    /// A bare selector read while more than one family awaits selection.
    #[error("Parse error: selector '{token}' is ambiguous between {}; qualify it as '<family>:{token}'.", quoted(.families))]
    AmbiguousSelector {
        /// The selector token.
        token: String,
        /// The families awaiting selection.
        families: Vec<String>,
    },

    /// A selector preceding the selection of its parent.
    #[error("Parse error: selector '{token}' precedes the selection that makes '{family}' reachable.")]
    SelectorOutOfOrder {
        /// The selector token.
        token: String,
        /// The family it addresses.
        family: String,
    },

    /// A selector for a family that has already been resolved.
    #[error("Parse error: selector '{token}' repeats the selection of '{family}' (already '{selected}').")]
    RepeatedSelection {
        /// The selector token.
        token: String,
        /// The family it addresses.
        family: String,
        /// The alternative already selected.
        selected: String,
    },

    /// A family without a selector or default branch.
    #[error("Parse error: missing subcommand for '{family}' (choices: {}).", quoted(.choices))]
    MissingSubcommand {
        /// The family.
        family: String,
        /// The selectable alternatives.
        choices: Vec<String>,
    },

    /// A required slot left unmatched.
    #[error("Parse error: missing required '{slot}'.")]
    MissingRequired {
        /// The slot.
        slot: String,
    },

    /// A flag followed by fewer values than its arity requires.
    #[error("Parse error: too few values provided for '{slot}' (provided={provided}, expected={expected}).")]
    TooFewValues {
        /// The slot.
        slot: String,
        /// The number of values found.
        provided: usize,
        /// The slot's arity.
        expected: String,
    },

    /// A flag followed by a number of values its arity does not admit.
    #[error("Parse error: '{slot}' cannot take {provided} value(s) (expected={expected}).")]
    ArityMismatch {
        /// The slot.
        slot: String,
        /// The number of values found.
        provided: usize,
        /// The slot's arity.
        expected: String,
    },

    /// The positional run cannot be divided between its slots.
    #[error("Parse error: cannot place '{slot}' (expected={expected}) over the remaining {}.", quoted(.remainder))]
    Unresolvable {
        /// The slot the search could not place.
        slot: String,
        /// The tokens from the furthest point the search reached.
        remainder: Vec<String>,
        /// The slot's arity.
        expected: String,
    },

    /// Values no variant of the slot converts.
    #[error("Parse error: invalid value(s) {} for '{slot}': {reason}", quoted(.values))]
    InvalidValue {
        /// The slot.
        slot: String,
        /// The values.
        values: Vec<String>,
        /// The conversion failure.
        reason: String,
    },

    /// A (non counter) slot given more than once.
    #[error("Parse error: '{slot}' is provided more than once.")]
    RepeatedFlag {
        /// The slot.
        slot: String,
    },

    /// More than one member of a mutual-exclusion group given.
    #[error("Parse error: {} are mutually exclusive (group '{group}').", quoted(.slots))]
    MutuallyExclusive {
        /// The group.
        group: String,
        /// The members given.
        slots: Vec<String>,
    },

    /// No member of a required mutual-exclusion group given.
    #[error("Parse error: exactly one of {} is required (group '{group}').", quoted(.slots))]
    MissingMutexGroup {
        /// The group.
        group: String,
        /// Every member.
        slots: Vec<String>,
    },
}

impl ParseError {
    /// The kind of problem.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::UnknownFlag { .. } => ErrorKind::UnknownFlag,
            ParseError::UnrecognizedToken { .. } => ErrorKind::UnrecognizedToken,
            ParseError::UnknownSelector { .. } => ErrorKind::UnknownSelector,
            ParseError::AmbiguousSelector { .. } => ErrorKind::AmbiguousSelector,
            ParseError::SelectorOutOfOrder { .. } => ErrorKind::SelectorOutOfOrder,
            ParseError::RepeatedSelection { .. } => ErrorKind::RepeatedSelection,
            ParseError::MissingSubcommand { .. } => ErrorKind::MissingSubcommand,
            ParseError::MissingRequired { .. } => ErrorKind::MissingRequired,
            ParseError::TooFewValues { .. } => ErrorKind::TooFewValues,
            ParseError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            ParseError::Unresolvable { .. } => ErrorKind::Unresolvable,
            ParseError::InvalidValue { .. } => ErrorKind::InvalidValue,
            ParseError::RepeatedFlag { .. } => ErrorKind::RepeatedFlag,
            ParseError::MutuallyExclusive { .. } => ErrorKind::MutuallyExclusive,
            ParseError::MissingMutexGroup { .. } => ErrorKind::MissingMutexGroup,
        }
    }

    /// The qualified paths of the offending slots (empty when the problem is not tied to a slot).
    pub fn slot_paths(&self) -> Vec<&str> {
        match self {
            ParseError::MissingRequired { slot }
            | ParseError::TooFewValues { slot, .. }
            | ParseError::ArityMismatch { slot, .. }
            | ParseError::Unresolvable { slot, .. }
            | ParseError::InvalidValue { slot, .. }
            | ParseError::RepeatedFlag { slot } => vec![slot.as_str()],
            ParseError::MutuallyExclusive { slots, .. }
            | ParseError::MissingMutexGroup { slots, .. } => {
                slots.iter().map(String::as_str).collect()
            }
            _ => Vec::default(),
        }
    }
}

impl From<CloseError> for ParseError {
    fn from(error: CloseError) -> Self {
        match error {
            CloseError::TooFewValues {
                name,
                provided,
                expected,
            } => ParseError::TooFewValues {
                slot: name,
                provided,
                expected,
            },
            CloseError::ArityMismatch {
                name,
                provided,
                expected,
            } => ParseError::ArityMismatch {
                slot: name,
                provided,
                expected,
            },
        }
    }
}

/// Every problem found in one parse, in the order they were detected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", .errors.iter().map(ToString::to_string).collect::<Vec<String>>().join("\n"))]
pub struct ErrorReport {
    errors: Vec<ParseError>,
}

impl ErrorReport {
    /// The problems.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// The kinds of the problems, in order.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(ParseError::kind).collect()
    }

    /// The offending slot paths across every problem, in order.
    pub fn slot_paths(&self) -> Vec<&str> {
        self.errors.iter().flat_map(ParseError::slot_paths).collect()
    }
}

/// The engine reached a state its data model forbids.
///
/// Never caused by user input; indicates a bug in the engine itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Internal error: {context}")]
pub struct InternalInvariantError {
    context: String,
}

impl InternalInvariantError {
    pub(crate) fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// The diagnostic context.
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// The error of a [`parse`](crate::parse).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// The specification tree is malformed.
    #[error(transparent)]
    Specification(#[from] SpecificationError),
    /// The input is invalid.
    #[error(transparent)]
    Parse(#[from] ErrorReport),
    /// The engine is broken.
    #[error(transparent)]
    Internal(#[from] InternalInvariantError),
}

/// Collects parse errors without short-circuiting.
#[derive(Debug, Default)]
pub(crate) struct ErrorAggregator {
    errors: Vec<ParseError>,
}

impl ErrorAggregator {
    pub(crate) fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub(crate) fn extend(&mut self, errors: impl IntoIterator<Item = ParseError>) {
        self.errors.extend(errors);
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn finish(self) -> Result<(), ErrorReport> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ErrorReport {
                errors: self.errors,
            })
        }
    }
}
