use std::collections::HashMap;
use thiserror::Error;

use crate::model::Arity;

pub(crate) type OffsetValue = (usize, String);

/// What a slot was matched to during one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    Values(Vec<OffsetValue>),
    Count(usize),
    Inverse,
    // An optional positional left to its default.
    Absent,
    // A positional whose run failed to resolve; already reported.
    Unresolved,
}

impl Binding {
    pub(crate) fn tokens(&self) -> Vec<String> {
        match self {
            Binding::Values(values) => values.iter().map(|(_, value)| value.clone()).collect(),
            _ => Vec::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn offset(&self) -> Option<usize> {
        match self {
            Binding::Values(values) => values.first().map(|(offset, _)| *offset),
            _ => None,
        }
    }

    /// Whether the user supplied this slot.
    pub(crate) fn is_provided(&self) -> bool {
        matches!(
            self,
            Binding::Values(_) | Binding::Count(_) | Binding::Inverse
        )
    }
}

/// The per-parse record of which slots are bound, keyed by qualified path.
#[derive(Debug, Default)]
pub(crate) struct BindingTable {
    bindings: HashMap<String, Binding>,
}

impl BindingTable {
    /// Bind a slot, refusing to overwrite a user supplied binding.
    pub(crate) fn bind(&mut self, path: &str, binding: Binding) -> Result<(), ()> {
        match self.bindings.get(path) {
            Some(existing) if existing.is_provided() => Err(()),
            _ => {
                self.bindings.insert(path.to_string(), binding);
                Ok(())
            }
        }
    }

    pub(crate) fn count(&mut self, path: &str, occurrences: usize) {
        let entry = self
            .bindings
            .entry(path.to_string())
            .or_insert(Binding::Count(0));

        match entry {
            Binding::Count(total) => *total += occurrences,
            other => *other = Binding::Count(occurrences),
        }
    }

    pub(crate) fn get(&self, path: &str) -> Option<&Binding> {
        self.bindings.get(path)
    }

    pub(crate) fn is_provided(&self, path: &str) -> bool {
        self.bindings
            .get(path)
            .map(Binding::is_provided)
            .unwrap_or(false)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum CloseError {
    #[error("too few values provided for '{name}' (provided={provided}, expected={expected}).")]
    TooFewValues {
        name: String,
        provided: usize,
        expected: String,
    },

    #[error("'{name}' cannot take {provided} value(s) (expected={expected}).")]
    ArityMismatch {
        name: String,
        provided: usize,
        expected: String,
    },
}

/// Collects the values following a flag.
#[derive(Debug)]
pub(crate) struct MatchBuffer {
    name: String,
    arity: Arity,
    values: Vec<OffsetValue>,
}

impl MatchBuffer {
    pub(crate) fn new(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
            values: Vec::default(),
        }
    }

    pub(crate) fn push(&mut self, offset: usize, value: String) {
        self.values.push((offset, value));
    }

    /// Whether the buffer takes more values: a single fixed count stays open until full, anything else until interrupted.
    pub(crate) fn is_open(&self) -> bool {
        match self.arity.fixed() {
            Some(n) => self.values.len() < n,
            None => true,
        }
    }

    pub(crate) fn close(self) -> Result<Vec<OffsetValue>, CloseError> {
        let provided = self.values.len();

        if self.arity.admits(provided) {
            Ok(self.values)
        } else if provided < self.arity.min() {
            Err(CloseError::TooFewValues {
                name: self.name,
                provided,
                expected: self.arity.to_string(),
            })
        } else {
            Err(CloseError::ArityMismatch {
                name: self.name,
                provided,
                expected: self.arity.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Nargs;
    use rand::{thread_rng, Rng};
    use rstest::rstest;

    #[rstest]
    #[case(Arity::precisely(0), 0, true)]
    #[case(Arity::precisely(1), 0, true)]
    #[case(Arity::precisely(1), 1, false)]
    #[case(Arity::precisely(3), 2, true)]
    #[case(Arity::any(), 5, true)]
    #[case(Arity::one_of([Nargs::Precisely(1), Nargs::Precisely(2)]), 2, true)]
    fn match_buffer_open(#[case] arity: Arity, #[case] feed: usize, #[case] expected_open: bool) {
        let mut buffer = MatchBuffer::new("name", arity);

        for i in 0..feed {
            buffer.push(i, i.to_string());
        }

        assert_eq!(buffer.is_open(), expected_open);
    }

    #[rstest]
    #[case(Arity::precisely(0), 0, None)]
    #[case(Arity::precisely(2), 2, None)]
    #[case(Arity::precisely(2), 1, Some(true))]
    #[case(Arity::at_least(1), 0, Some(true))]
    #[case(Arity::at_least(1), 7, None)]
    #[case(Arity::one_of([Nargs::Precisely(1), Nargs::Precisely(3)]), 2, Some(false))]
    #[case(Arity::one_of([Nargs::Precisely(1), Nargs::Precisely(3)]), 4, Some(false))]
    fn match_buffer_close(
        #[case] arity: Arity,
        #[case] feed: usize,
        #[case] expected_too_few: Option<bool>,
    ) {
        // Setup
        let mut buffer = MatchBuffer::new("name", arity.clone());
        let tokens: Vec<OffsetValue> = (0..feed)
            .map(|i| (thread_rng().gen(), i.to_string()))
            .collect();

        for (offset, token) in &tokens {
            buffer.push(*offset, token.clone());
        }

        // Execute
        let result = buffer.close();

        // Verify
        match expected_too_few {
            None => assert_eq!(result.unwrap(), tokens),
            Some(true) => assert_eq!(
                result.unwrap_err(),
                CloseError::TooFewValues {
                    name: "name".to_string(),
                    provided: feed,
                    expected: arity.to_string(),
                }
            ),
            Some(false) => assert_eq!(
                result.unwrap_err(),
                CloseError::ArityMismatch {
                    name: "name".to_string(),
                    provided: feed,
                    expected: arity.to_string(),
                }
            ),
        }
    }

    #[test]
    fn binding_table() {
        let mut table = BindingTable::default();

        assert!(table.bind("a", Binding::Absent).is_ok());
        assert!(!table.is_provided("a"));
        assert!(table.bind("a", Binding::Values(vec![(0, "1".to_string())])).is_ok());
        assert!(table.is_provided("a"));
        assert!(table.bind("a", Binding::Inverse).is_err());
        assert_eq!(table.get("a").unwrap().tokens(), vec!["1".to_string()]);
        assert_eq!(table.get("a").unwrap().offset(), Some(0));

        table.count("v", 2);
        table.count("v", 1);
        assert_eq!(table.get("v"), Some(&Binding::Count(3)));
        assert_eq!(table.get("missing"), None);
    }
}
