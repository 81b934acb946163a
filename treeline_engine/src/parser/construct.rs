use crate::api::{relative, ParserNode};
use crate::dispatch::{DispatchState, Dispatcher};
use crate::matcher::{Binding, BindingTable};
use crate::model::{Record, Value};
use crate::parser::base::InternalInvariantError;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

/// Assemble the nested value, following the shape of the activated tree.
///
/// Runs only once every problem has been ruled out; any failure here is an engine bug.
pub(crate) fn construct(
    dispatcher: &Dispatcher,
    bindings: &BindingTable,
) -> Result<Value, InternalInvariantError> {
    if dispatcher.state() != DispatchState::Complete {
        return Err(InternalInvariantError::new(
            "families remain awaiting selection at construction",
        ));
    }

    let root = match dispatcher.chain().first() {
        Some(activation) => activation.node,
        None => {
            return Err(InternalInvariantError::new(
                "the activation chain is empty at construction",
            ))
        }
    };

    Ok(Value::Record(build_record(root, dispatcher, bindings)?))
}

fn build_record(
    node: &ParserNode,
    dispatcher: &Dispatcher,
    bindings: &BindingTable,
) -> Result<Record, InternalInvariantError> {
    let mut record = Record::new(node.name());

    for slot in node.slots() {
        let value = match bindings.get(slot.path()) {
            Some(binding @ Binding::Values(_)) => {
                let tokens = binding.tokens();
                slot.construct(&tokens).map_err(|reason| {
                    InternalInvariantError::new(format!(
                        "'{}' failed to construct {tokens:?} after validation: {reason}",
                        slot.path()
                    ))
                })?
            }
            Some(Binding::Count(occurrences)) => Value::Int(*occurrences as i64),
            Some(Binding::Inverse) => Value::Bool(false),
            Some(Binding::Unresolved) => {
                return Err(InternalInvariantError::new(format!(
                    "'{}' is unresolved at construction",
                    slot.path()
                )));
            }
            Some(Binding::Absent) | None => match slot.default_value() {
                Some(default) => default.clone(),
                // An optional member of a mutual-exclusion group.
                None if !slot.is_required() => Value::None,
                None => {
                    return Err(InternalInvariantError::new(format!(
                        "required '{}' is unbound at construction",
                        slot.path()
                    )));
                }
            },
        };

        #[cfg(feature = "tracing_debug")]
        {
            debug!("Constructed '{}': {value}.", slot.path());
        }

        record.insert_path(slot.relative_path(node.prefix()), value);
    }

    for family in node.families() {
        let alternative = dispatcher.selected(family.path()).ok_or_else(|| {
            InternalInvariantError::new(format!(
                "family '{}' is unresolved at construction",
                family.path()
            ))
        })?;
        let inner = build_record(alternative.node(), dispatcher, bindings)?;
        record.insert_path(
            relative(family.path(), node.prefix()),
            Value::Record(inner),
        );
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Alternative, Slot, SpecTree, SubcommandFamily, Variant};

    fn tree() -> SpecTree {
        let adam = ParserNode::new("Adam")
            .slot(Slot::named("lr", Variant::Float).default(Value::Float(0.001)))
            .slot(Slot::named("betas", Variant::tuple([Variant::Float, Variant::Float])));

        SpecTree::build(
            ParserNode::new("Root")
                .slot(Slot::positional("dataset", Variant::Str))
                .slot(Slot::named("model.depth", Variant::Int).default(Value::Int(4)))
                .slot(Slot::counter("verbose"))
                .slot(Slot::flag("cache"))
                .slot(Slot::named("seed", Variant::Int).mutex("source"))
                .mutex_group("source", false)
                .family(
                    SubcommandFamily::new("optimizer")
                        .alternative(Alternative::new("adam", adam))
                        .alternative(Alternative::new("sgd", ParserNode::new("Sgd"))),
                ),
        )
        .unwrap()
    }

    fn values(values: &[&str]) -> Binding {
        Binding::Values(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (i, v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn construct_nested() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);
        dispatcher.select("adam").unwrap();
        let mut bindings = BindingTable::default();
        bindings.bind("dataset", values(&["mnist"])).unwrap();
        bindings.count("verbose", 3);
        bindings.bind("cache", Binding::Inverse).unwrap();
        bindings
            .bind("optimizer.betas", values(&["0.9", "0.99"]))
            .unwrap();

        // Execute
        let value = construct(&dispatcher, &bindings).unwrap();

        // Verify
        let record = value.as_record().unwrap();
        assert_eq!(record.name(), "Root");
        assert_eq!(record.get("dataset"), Some(&Value::str("mnist")));
        assert_eq!(record.get_path("model.depth"), Some(&Value::Int(4)));
        assert_eq!(record.get("verbose"), Some(&Value::Int(3)));
        assert_eq!(record.get("cache"), Some(&Value::Bool(false)));
        assert_eq!(record.get("seed"), Some(&Value::None));
        let optimizer = record.get("optimizer").unwrap().as_record().unwrap();
        assert_eq!(optimizer.name(), "Adam");
        assert_eq!(optimizer.get("lr"), Some(&Value::Float(0.001)));
        assert_eq!(
            optimizer.get("betas"),
            Some(&Value::Tuple(vec![Value::Float(0.9), Value::Float(0.99)]))
        );
    }

    #[test]
    fn construct_awaiting_selection() {
        // Setup
        let tree = tree();
        let dispatcher = Dispatcher::new(&tree);
        let mut bindings = BindingTable::default();
        bindings.bind("dataset", values(&["mnist"])).unwrap();

        // Execute
        let error = construct(&dispatcher, &bindings).unwrap_err();

        // Verify
        assert_eq!(
            error.context(),
            "families remain awaiting selection at construction"
        );
    }

    #[test]
    fn construct_unresolved_family() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);
        // Leaves 'optimizer' without a default branch to fall back to.
        let errors = dispatcher.activate_defaults();
        assert_eq!(errors.len(), 1);
        let mut bindings = BindingTable::default();
        bindings.bind("dataset", values(&["mnist"])).unwrap();

        // Execute
        let error = construct(&dispatcher, &bindings).unwrap_err();

        // Verify
        assert_eq!(
            error.context(),
            "family 'optimizer' is unresolved at construction"
        );
    }

    #[test]
    fn construct_invalid_binding() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);
        dispatcher.select("sgd").unwrap();
        let mut bindings = BindingTable::default();
        bindings.bind("dataset", values(&["mnist"])).unwrap();
        bindings.bind("model.depth", values(&["deep"])).unwrap();

        // Execute
        let error = construct(&dispatcher, &bindings).unwrap_err();

        // Verify
        crate::test::assert_contains!(error.to_string(), "'model.depth' failed to construct");
    }
}
