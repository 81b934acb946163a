use std::sync::Arc;

use crate::api::{Alternative, ParserNode};
use crate::constant::*;
use crate::model::{Record, Value};
use crate::parser::SpecificationError;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

/// Choose the alternative a caller-supplied default selects.
///
/// Priority, highest first:
/// 1. The alternative whose recorded default is the very same instance.
/// 2. The alternative whose recorded default is deeply equal (integers equal floats of the same magnitude).
/// 3. The only alternative whose shape admits the default.
///
/// A tie at any level is ambiguous; when nothing matches by shape, the default is unmatchable.
/// Placeholder alternatives never participate, and are never named.
pub(crate) fn match_default(
    family: &str,
    alternatives: &[Alternative],
    default: &Arc<Value>,
) -> Result<usize, SpecificationError> {
    let candidates: Vec<(usize, &Alternative)> = alternatives
        .iter()
        .enumerate()
        .filter(|(_, alternative)| !alternative.is_placeholder())
        .collect();

    let identical = filter(&candidates, |alternative| {
        alternative
            .default_value()
            .map(|recorded| Arc::ptr_eq(recorded, default))
            .unwrap_or(false)
    });

    if let Some(index) = decide(family, "identity", identical)? {
        return Ok(index);
    }

    let equal = filter(&candidates, |alternative| {
        alternative
            .default_value()
            .map(|recorded| recorded.coerced_eq(default))
            .unwrap_or(false)
    });

    if let Some(index) = decide(family, "equality", equal)? {
        return Ok(index);
    }

    let shaped = filter(&candidates, |alternative| match default.as_record() {
        Some(record) => shape_matches(alternative.node(), alternative.name(), record),
        None => false,
    });

    match decide(family, "shape", shaped)? {
        Some(index) => Ok(index),
        None => Err(SpecificationError::UnmatchableDefault {
            family: family.to_string(),
            candidates: candidates
                .iter()
                .map(|(_, alternative)| alternative.name().to_string())
                .collect(),
        }),
    }
}

fn filter<'a>(
    candidates: &[(usize, &'a Alternative)],
    predicate: impl Fn(&Alternative) -> bool,
) -> Vec<(usize, &'a Alternative)> {
    candidates
        .iter()
        .filter(|(_, alternative)| predicate(alternative))
        .copied()
        .collect()
}

fn decide(
    family: &str,
    _level: &str,
    matched: Vec<(usize, &Alternative)>,
) -> Result<Option<usize>, SpecificationError> {
    match matched.as_slice() {
        [] => Ok(None),
        [(index, _alternative)] => {
            #[cfg(feature = "tracing_debug")]
            {
                debug!(
                    "Family '{family}' defaults to '{}' by {_level}.",
                    _alternative.name()
                );
            }
            Ok(Some(*index))
        }
        _ => Err(SpecificationError::AmbiguousDefault {
            family: family.to_string(),
            candidates: matched
                .iter()
                .map(|(_, alternative)| alternative.name().to_string())
                .collect(),
        }),
    }
}

// Whether a default record could have been built by this (unqualified) node.
fn shape_matches(node: &ParserNode, alternative: &str, record: &Record) -> bool {
    if record.name() != node.name() && record.name() != alternative {
        return false;
    }

    let covered = record.fields().iter().all(|(field, _)| {
        node.slots().iter().any(|slot| head(slot.path()) == field)
            || node
                .families()
                .iter()
                .any(|family| head(family.path()) == field)
    });

    let admitted = node.slots().iter().all(|slot| match record.get_path(slot.path()) {
        Some(value) => slot.admits_value(value),
        None => true,
    });

    let nested = node
        .families()
        .iter()
        .all(|family| match record.get_path(family.path()) {
            Some(Value::Record(inner)) => family
                .alternatives()
                .iter()
                .filter(|alternative| !alternative.is_placeholder())
                .any(|alternative| shape_matches(alternative.node(), alternative.name(), inner)),
            Some(_) => false,
            None => true,
        });

    covered && admitted && nested
}

fn head(path: &str) -> &str {
    path.split(PATH_DELIMITER).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Slot, SubcommandFamily, Variant};
    use crate::test::assert_contains;

    fn adam(lr: Value) -> Arc<Value> {
        Arc::new(Value::Record(Record::new("Adam").with("lr", lr)))
    }

    fn adam_node() -> ParserNode {
        ParserNode::new("Adam").slot(Slot::named("lr", Variant::Float))
    }

    fn sgd_node() -> ParserNode {
        ParserNode::new("Sgd")
            .slot(Slot::named("lr", Variant::Float))
            .slot(Slot::named("momentum", Variant::Float))
    }

    #[test]
    fn identity_beats_equality() {
        // Setup
        let equal = adam(Value::Float(0.1));
        let identical = adam(Value::Float(0.1));
        let alternatives = vec![
            Alternative::new("first", adam_node()).default(equal),
            Alternative::new("second", adam_node()).default(identical.clone()),
        ];

        // Execute
        let index = match_default("optimizer", &alternatives, &identical).unwrap();

        // Verify
        assert_eq!(index, 1);
    }

    #[test]
    fn equality_coerces_numbers() {
        // Setup
        let alternatives = vec![
            Alternative::new("adam", adam_node()).default(adam(Value::Float(3.0))),
            Alternative::new("sgd", sgd_node()),
        ];

        // Execute
        let index = match_default("optimizer", &alternatives, &adam(Value::Int(3))).unwrap();

        // Verify
        assert_eq!(index, 0);
    }

    #[test]
    fn equality_ambiguous() {
        let alternatives = vec![
            Alternative::new("a", adam_node()).default(adam(Value::Float(1.0))),
            Alternative::new("b", adam_node()).default(adam(Value::Float(1.0))),
        ];

        let error = match_default("optimizer", &alternatives, &adam(Value::Float(1.0))).unwrap_err();

        assert_matches!(error, SpecificationError::AmbiguousDefault { candidates, .. } if candidates == vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn shape_unique() {
        // Setup
        let default = Arc::new(Value::Record(
            Record::new("Sgd")
                .with("lr", Value::Float(0.1))
                .with("momentum", Value::Int(0)),
        ));
        let alternatives = vec![
            Alternative::new("adam", adam_node()),
            Alternative::new("sgd", sgd_node()),
        ];

        // Execute
        let index = match_default("optimizer", &alternatives, &default).unwrap();

        // Verify
        assert_eq!(index, 1);
    }

    #[test]
    fn shape_ambiguous() {
        let alternatives = vec![
            Alternative::new("Adam", ParserNode::new("X").slot(Slot::named("lr", Variant::Float))),
            Alternative::new("other", adam_node()),
        ];

        let error = match_default("optimizer", &alternatives, &adam(Value::Float(1.0))).unwrap_err();

        assert_matches!(error, SpecificationError::AmbiguousDefault { .. });
    }

    #[test]
    fn shape_nested_family() {
        // Setup
        let node = ParserNode::new("Train").family(
            SubcommandFamily::new("optimizer")
                .alternative(Alternative::new("adam", adam_node()))
                .alternative(Alternative::new("sgd", sgd_node())),
        );
        let default = Arc::new(Value::Record(
            Record::new("Train").with("optimizer", Value::Record(Record::new("Adam").with("lr", Value::Float(0.2)))),
        ));
        let alternatives = vec![
            Alternative::new("train", node),
            Alternative::new("eval", ParserNode::new("Eval")),
        ];

        // Execute
        let index = match_default("command", &alternatives, &default).unwrap();

        // Verify
        assert_eq!(index, 0);
    }

    #[test]
    fn unmatchable() {
        // Setup
        let default = Arc::new(Value::Record(
            Record::new("Adam").with("lr", Value::str("fast")),
        ));
        let alternatives = vec![
            Alternative::new("adam", adam_node()),
            Alternative::new("sgd", sgd_node()),
        ];

        // Execute
        let error = match_default("optimizer", &alternatives, &default).unwrap_err();

        // Verify
        assert_matches!(error.clone(), SpecificationError::UnmatchableDefault { candidates, .. } if candidates == vec!["adam".to_string(), "sgd".to_string()]);
        assert_contains!(error.to_string(), "'optimizer'");
    }

    #[test]
    fn unmatchable_single_member() {
        // Setup
        let root = ParserNode::new("Root").family(
            SubcommandFamily::new("optimizer")
                .alternative(Alternative::new("adam", adam_node()))
                .default(Arc::new(Value::Record(Record::new("Sgd")))),
        );

        // Execute
        let error = crate::api::SpecTree::build(root).unwrap_err();

        // Verify
        assert_matches!(error.clone(), SpecificationError::UnmatchableDefault { candidates, .. } if candidates == vec!["adam".to_string()]);
        assert!(!error.to_string().contains(PLACEHOLDER_NAME));
    }
}
