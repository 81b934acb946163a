use std::collections::VecDeque;

use crate::api::{Alternative, ParserNode, SpecTree, SubcommandFamily};
use crate::constant::*;
use crate::dispatch::selector::*;
use crate::parser::ParseError;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchState {
    AwaitingSelector,
    Complete,
}

/// One node made visible during a parse.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Activation<'s> {
    pub node: &'s ParserNode,
    /// The family and alternative selecting this node (`None` at the root).
    pub via: Option<(&'s SubcommandFamily, &'s Alternative)>,
    /// Whether the node was activated as a default branch, without a selector.
    pub implicit: bool,
}

impl<'s> Activation<'s> {
    pub(crate) fn selector(&self) -> Option<String> {
        self.via.map(|(family, alternative)| {
            format!("{}{SELECTOR_DELIMITER}{}", family.path(), alternative.name())
        })
    }
}

/// Walks the specification tree as selectors are consumed, maintaining the activation chain.
#[derive(Debug)]
pub(crate) struct Dispatcher<'s> {
    tree: &'s SpecTree,
    chain: Vec<Activation<'s>>,
    // Families of activated nodes, awaiting selection (in activation then declaration order).
    frontier: Vec<&'s SubcommandFamily>,
    resolved: Vec<(&'s SubcommandFamily, &'s Alternative)>,
}

impl<'s> Dispatcher<'s> {
    pub(crate) fn new(tree: &'s SpecTree) -> Self {
        let root = tree.root();

        Self {
            tree,
            chain: vec![Activation {
                node: root,
                via: None,
                implicit: false,
            }],
            frontier: root.families().iter().collect(),
            resolved: Vec::default(),
        }
    }

    pub(crate) fn state(&self) -> DispatchState {
        if self.frontier.is_empty() {
            DispatchState::Complete
        } else {
            DispatchState::AwaitingSelector
        }
    }

    pub(crate) fn chain(&self) -> &[Activation<'s>] {
        &self.chain
    }

    /// The most recently activated node.
    pub(crate) fn current(&self) -> &'s ParserNode {
        match self.chain.last() {
            Some(activation) => activation.node,
            None => unreachable!("internal error - the chain always contains the root"),
        }
    }

    /// The alternative selected for a family, if it has been resolved.
    pub(crate) fn selected(&self, family: &str) -> Option<&'s Alternative> {
        self.resolved
            .iter()
            .find(|(resolved, _)| resolved.path() == family)
            .map(|(_, alternative)| *alternative)
    }

    /// The explicit selectors consumed so far, root to leaf.
    pub(crate) fn path(&self) -> Vec<String> {
        self.chain
            .iter()
            .filter(|activation| !activation.implicit)
            .filter_map(Activation::selector)
            .collect()
    }

    /// Read `token` as a selector against the current frontier, without consuming it.
    ///
    /// Returns `Ok(None)` when the token is not a selector (it is then an ordinary value).
    pub(crate) fn recognize(
        &self,
        token: &str,
    ) -> Result<Option<(&'s SubcommandFamily, &'s Alternative)>, ParseError> {
        match split_selector(token) {
            SelectorToken::Qualified {
                family: path,
                alternative: name,
            } => {
                if let Some(family) = self.frontier.iter().copied().find(|family| family.path() == path) {
                    return match family.find(name) {
                        Some(alternative) => Ok(Some((family, alternative))),
                        None => Err(ParseError::UnknownSelector {
                            token: token.to_string(),
                            family: path.to_string(),
                            choices: choices(family),
                        }),
                    };
                }

                if let Some(selected) = self.selected(path) {
                    return Err(ParseError::RepeatedSelection {
                        token: token.to_string(),
                        family: path.to_string(),
                        selected: selected.name().to_string(),
                    });
                }

                if self.tree.find_family(path).is_some() {
                    return Err(ParseError::SelectorOutOfOrder {
                        token: token.to_string(),
                        family: path.to_string(),
                    });
                }

                Ok(None)
            }
            SelectorToken::Bare(name) => {
                let matches: Vec<(&'s SubcommandFamily, &'s Alternative)> = self
                    .frontier
                    .iter()
                    .copied()
                    .filter_map(|family| family.find(name).map(|alternative| (family, alternative)))
                    .collect();

                // A bare name only selects while exactly one family awaits selection.
                match (matches.as_slice(), self.frontier.len()) {
                    ([], _) => Ok(None),
                    ([selection], 1) => Ok(Some(*selection)),
                    _ => Err(ParseError::AmbiguousSelector {
                        token: token.to_string(),
                        families: self
                            .frontier
                            .iter()
                            .map(|family| family.path().to_string())
                            .collect(),
                    }),
                }
            }
        }
    }

    /// Whether `token` would be consumed (or rejected) as a selector.
    pub(crate) fn is_selector(&self, token: &str) -> bool {
        !matches!(self.recognize(token), Ok(None))
    }

    /// Consume `token` as a selector, activating the alternative's node.
    pub(crate) fn select(&mut self, token: &str) -> Result<Option<&'s ParserNode>, ParseError> {
        match self.recognize(token)? {
            Some((family, alternative)) => Ok(Some(self.activate(family, alternative, false))),
            None => Ok(None),
        }
    }

    /// Resolve every family still awaiting selection through its default branch.
    ///
    /// Families without a default branch are reported; their descendants stay inactive.
    pub(crate) fn activate_defaults(&mut self) -> Vec<ParseError> {
        let mut errors = Vec::default();
        let mut pending: VecDeque<&'s SubcommandFamily> = self.frontier.iter().copied().collect();

        while let Some(family) = pending.pop_front() {
            match family.default_alternative() {
                Some(alternative) => {
                    let node = self.activate(family, alternative, true);
                    pending.extend(node.families().iter());
                }
                None => {
                    errors.push(ParseError::MissingSubcommand {
                        family: family.path().to_string(),
                        choices: choices(family),
                    });
                }
            }
        }

        self.frontier.clear();
        errors
    }

    fn activate(
        &mut self,
        family: &'s SubcommandFamily,
        alternative: &'s Alternative,
        implicit: bool,
    ) -> &'s ParserNode {
        #[cfg(feature = "tracing_debug")]
        {
            debug!(
                "Activating '{}' for family '{}' (implicit={implicit}).",
                alternative.name(),
                family.path()
            );
        }

        self.frontier.retain(|pending| pending.path() != family.path());
        self.resolved.push((family, alternative));
        let node = alternative.node();
        self.chain.push(Activation {
            node,
            via: Some((family, alternative)),
            implicit,
        });

        if !implicit {
            self.frontier.extend(node.families().iter());
        }

        node
    }
}

fn choices(family: &SubcommandFamily) -> Vec<String> {
    family
        .choices()
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Slot;
    use crate::api::Variant;
    use crate::test::assert_contains;
    use rstest::rstest;
    use std::sync::Arc;

    fn tree() -> SpecTree {
        let adam = ParserNode::new("Adam").slot(Slot::named("lr", Variant::Float));
        let sgd = ParserNode::new("Sgd").family(
            SubcommandFamily::new("schedule")
                .alternative(Alternative::new("cosine", ParserNode::new("Cosine")))
                .alternative(Alternative::new("linear", ParserNode::new("Linear"))),
        );
        SpecTree::build(
            ParserNode::new("Root")
                .family(
                    SubcommandFamily::new("optimizer")
                        .alternative(Alternative::new("adam", adam))
                        .alternative(Alternative::new("sgd", sgd)),
                )
                .family(
                    SubcommandFamily::new("data")
                        .alternative(Alternative::new("mnist", ParserNode::new("Mnist")))
                        .alternative(Alternative::new("linear", ParserNode::new("Lines")))
                        .default(Arc::new(crate::model::Value::Record(
                            crate::model::Record::new("Mnist"),
                        ))),
                ),
        )
        .unwrap()
    }

    #[test]
    fn select_qualified_and_bare() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);
        assert_eq!(dispatcher.state(), DispatchState::AwaitingSelector);

        // Execute
        let sgd = dispatcher.select("optimizer:sgd").unwrap().unwrap();
        let mnist = dispatcher.select("data:mnist").unwrap().unwrap();
        let cosine = dispatcher.select("cosine").unwrap().unwrap();

        // Verify
        assert_eq!(sgd.name(), "Sgd");
        assert_eq!(mnist.name(), "Mnist");
        assert_eq!(cosine.name(), "Cosine");
        assert_eq!(dispatcher.current().name(), "Cosine");
        assert_eq!(dispatcher.state(), DispatchState::Complete);
        assert_eq!(
            dispatcher.path(),
            vec![
                "optimizer:sgd".to_string(),
                "data:mnist".to_string(),
                "optimizer.schedule:cosine".to_string()
            ]
        );
        assert_eq!(dispatcher.selected("optimizer").unwrap().name(), "sgd");
    }

    #[test]
    fn bare_selector_single_family() {
        // Setup
        let tree = SpecTree::build(
            ParserNode::new("Root").family(
                SubcommandFamily::new("optimizer")
                    .alternative(Alternative::new("adam", ParserNode::new("Adam")))
                    .alternative(Alternative::new("sgd", ParserNode::new("Sgd"))),
            ),
        )
        .unwrap();
        let mut dispatcher = Dispatcher::new(&tree);

        // Execute
        let sgd = dispatcher.select("sgd").unwrap().unwrap();

        // Verify
        assert_eq!(sgd.name(), "Sgd");
        assert_eq!(dispatcher.path(), vec!["optimizer:sgd".to_string()]);
    }

    #[rstest]
    #[case(vec![], "sgd", vec!["optimizer", "data"])]
    #[case(vec![], "mnist", vec!["optimizer", "data"])]
    #[case(vec!["optimizer:sgd"], "cosine", vec!["data", "optimizer.schedule"])]
    fn bare_selector_many_families(
        #[case] selected: Vec<&str>,
        #[case] token: &str,
        #[case] expected: Vec<&str>,
    ) {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);

        for selector in selected {
            dispatcher.select(selector).unwrap();
        }

        // Execute
        let error = dispatcher.select(token).unwrap_err();

        // Verify
        assert_matches!(error.clone(), ParseError::AmbiguousSelector { families, .. } if families == expected);
        assert_contains!(error.to_string(), &format!("'{token}' is ambiguous"));
        assert_eq!(dispatcher.select("data:mnist").unwrap().unwrap().name(), "Mnist");
    }

    #[test]
    fn plain_tokens() {
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);

        assert_matches!(dispatcher.select("value"), Ok(None));
        assert_matches!(dispatcher.select("unknown.family:x"), Ok(None));
        assert!(!dispatcher.is_selector("value"));
        assert_eq!(dispatcher.chain().len(), 1);
    }

    #[test]
    fn unknown_selector() {
        let tree = tree();
        let dispatcher = Dispatcher::new(&tree);

        let error = dispatcher.recognize("optimizer:adamw").unwrap_err();

        assert_matches!(error.clone(), ParseError::UnknownSelector { choices, .. } if choices == vec!["adam".to_string(), "sgd".to_string()]);
        assert!(dispatcher.is_selector("optimizer:adamw"));
    }

    #[test]
    fn ambiguous_selector() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);
        dispatcher.select("optimizer:sgd").unwrap();

        // Execute
        let error = dispatcher.select("linear").unwrap_err();

        // Verify
        assert_matches!(error, ParseError::AmbiguousSelector { families, .. } if families == vec!["data".to_string(), "optimizer.schedule".to_string()]);
    }

    #[test]
    fn out_of_order() {
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);

        let error = dispatcher.select("optimizer.schedule:cosine").unwrap_err();

        assert_matches!(error, ParseError::SelectorOutOfOrder { family, .. } if family == "optimizer.schedule");
    }

    #[test]
    fn repeated_selection() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);
        dispatcher.select("optimizer:adam").unwrap();

        // Execute
        let error = dispatcher.select("optimizer:sgd").unwrap_err();

        // Verify
        assert_matches!(error.clone(), ParseError::RepeatedSelection { selected, .. } if selected == "adam");
        assert_contains!(error.to_string(), "'adam'");
        // A repeated bare selector is no longer in the frontier.
        assert_matches!(dispatcher.select("sgd"), Ok(None));
    }

    #[test]
    fn activate_defaults() {
        // Setup
        let tree = tree();
        let mut dispatcher = Dispatcher::new(&tree);

        // Execute
        let errors = dispatcher.activate_defaults();

        // Verify
        assert_eq!(errors.len(), 1);
        assert_matches!(&errors[0], ParseError::MissingSubcommand { family, choices } if family == "optimizer" && choices == &vec!["adam".to_string(), "sgd".to_string()]);
        let chain = dispatcher.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].node.name(), "Mnist");
        assert!(chain[1].implicit);
        assert!(dispatcher.path().is_empty());
        assert_eq!(dispatcher.state(), DispatchState::Complete);
    }
}
