use std::collections::HashSet;

use crate::api::{OrderingPolicy, ParseConfig, ParserNode, Slot, SpecTree};
use crate::dispatch::{split_selector, Activation, Dispatcher, SelectorToken};
use crate::matcher::*;
use crate::parser::base::*;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

/// The outcome of matching a token vector.
#[derive(Debug)]
pub(crate) enum Resolution<'s> {
    Complete {
        dispatcher: Dispatcher<'s>,
        bindings: BindingTable,
    },
    Help {
        path: Vec<String>,
    },
}

enum Scan {
    Help,
    Done,
}

/// Match the tokens against the tree under the configured ordering policy.
///
/// Parse errors are aggregated and returned together, once every activated node has been walked.
pub(crate) fn resolve_tokens<'s>(
    tree: &'s SpecTree,
    tokens: &[String],
    config: &ParseConfig,
) -> Result<Resolution<'s>, EngineError> {
    #[cfg(feature = "tracing_debug")]
    {
        debug!(
            "Matching {} token(s) under {:?}.",
            tokens.len(),
            config.ordering()
        );
    }

    let mut controller = Controller::new(tree, tokens, config.is_help_enabled());
    let scan = match config.ordering() {
        OrderingPolicy::Strict => controller.strict()?,
        OrderingPolicy::Consolidated => controller.consolidated(false)?,
        OrderingPolicy::Cascading => controller.consolidated(true)?,
    };

    let Controller {
        dispatcher,
        bindings,
        mut aggregator,
        ..
    } = controller;

    match scan {
        Scan::Help => Ok(Resolution::Help {
            path: dispatcher.path(),
        }),
        Scan::Done => {
            aggregate(dispatcher.chain(), &bindings, &mut aggregator);
            aggregator.finish()?;
            Ok(Resolution::Complete {
                dispatcher,
                bindings,
            })
        }
    }
}

// The per-parse match state.
struct Controller<'s, 't> {
    tree: &'s SpecTree,
    tokens: &'t [String],
    help: bool,
    dispatcher: Dispatcher<'s>,
    bindings: BindingTable,
    aggregator: ErrorAggregator,
}

impl<'s, 't> Controller<'s, 't> {
    fn new(tree: &'s SpecTree, tokens: &'t [String], help: bool) -> Self {
        Self {
            tree,
            tokens,
            help,
            dispatcher: Dispatcher::new(tree),
            bindings: BindingTable::default(),
            aggregator: ErrorAggregator::default(),
        }
    }

    // One left-to-right pass: a node's flags and positionals only become visible once it is selected.
    fn strict(&mut self) -> Result<Scan, InternalInvariantError> {
        let tokens = self.tokens;
        let mut index = FlagIndex::default();
        index.extend(self.dispatcher.current());
        let mut run: Vec<usize> = Vec::default();
        let mut offset = 0;

        while offset < tokens.len() {
            let token = &tokens[offset];

            match classify(token, self.help) {
                TokenClass::Help => {
                    #[cfg(feature = "tracing_debug")]
                    {
                        debug!("Help requested at token {offset}.");
                    }
                    return Ok(Scan::Help);
                }
                TokenClass::Long(..) | TokenClass::Short(..) => {
                    let dispatcher = &self.dispatcher;
                    let outcome = match_flag(&index, tokens, offset, self.help, |next| {
                        dispatcher.is_selector(&tokens[next])
                    });
                    offset += outcome.consumed;
                    self.apply(outcome);
                }
                TokenClass::Plain => {
                    let previous = self.dispatcher.current();
                    let positionals: Vec<&Slot> = previous.positionals().collect();

                    // A node's required positionals are filled before a bare name may select.
                    if matches!(split_selector(token), SelectorToken::Bare(_))
                        && run.len() < required_tokens(&positionals)
                    {
                        run.push(offset);
                        offset += 1;
                        continue;
                    }

                    match self.dispatcher.select(token) {
                        Ok(Some(node)) => {
                            self.flush(&positionals, &run)?;
                            run.clear();
                            index.extend(node);
                        }
                        Ok(None) => run.push(offset),
                        Err(error) => self.aggregator.push(error),
                    }

                    offset += 1;
                }
            }
        }

        let current = self.dispatcher.current();
        self.flush(&current.positionals().collect::<Vec<&Slot>>(), &run)?;
        self.activate_defaults()?;
        Ok(Scan::Done)
    }

    // Locate every selector up front, then match every flag and positional against one pool.
    fn consolidated(&mut self, cascading: bool) -> Result<Scan, InternalInvariantError> {
        let tokens = self.tokens;
        let mut everything = FlagIndex::default();

        for node in self.tree.nodes() {
            everything.extend(node);
        }

        // Offsets already spoken for by selectors (valid or not).
        let mut claimed: HashSet<usize> = HashSet::default();
        let mut skipped: Vec<usize> = Vec::default();
        let mut help = false;
        let mut offset = 0;

        while offset < tokens.len() {
            let token = &tokens[offset];

            match classify(token, self.help) {
                TokenClass::Help => {
                    help = true;
                    offset += 1;
                }
                TokenClass::Long(..) | TokenClass::Short(..) => {
                    let dispatcher = &self.dispatcher;
                    let outcome = match_flag(&everything, tokens, offset, self.help, |next| {
                        dispatcher.is_selector(&tokens[next])
                    });
                    offset += outcome.consumed;
                }
                TokenClass::Plain => {
                    match self.dispatcher.select(token) {
                        Ok(Some(node)) => {
                            claimed.insert(offset);

                            // A child's selector may not precede its parent's.
                            for earlier in skipped.iter().copied() {
                                if let Some(family) = selects_within(node, &tokens[earlier]) {
                                    claimed.insert(earlier);
                                    self.aggregator.push(ParseError::SelectorOutOfOrder {
                                        token: tokens[earlier].clone(),
                                        family,
                                    });
                                }
                            }

                            skipped.retain(|earlier| !claimed.contains(earlier));
                        }
                        Ok(None) => skipped.push(offset),
                        Err(error) => {
                            claimed.insert(offset);
                            self.aggregator.push(error);
                        }
                    }

                    offset += 1;
                }
            }
        }

        if help {
            return Ok(Scan::Help);
        }

        let errors = self.dispatcher.activate_defaults();
        self.aggregator.extend(errors);

        let chain: Vec<Activation<'s>> = self.dispatcher.chain().to_vec();
        let mut index = FlagIndex::default();
        let mut pool: Vec<&'s Slot> = Vec::default();
        let mut outside: Vec<&'s ParserNode> = Vec::default();

        for activation in chain.iter() {
            if cascading || !activation.implicit {
                index.extend(activation.node);
                pool.extend(activation.node.positionals());
            } else {
                outside.push(activation.node);
            }
        }

        let mut run: Vec<usize> = Vec::default();
        offset = 0;

        while offset < tokens.len() {
            if claimed.contains(&offset) {
                offset += 1;
                continue;
            }

            match classify(&tokens[offset], self.help) {
                TokenClass::Help => {
                    unreachable!("internal error - help is handled before matching")
                }
                TokenClass::Long(..) | TokenClass::Short(..) => {
                    let outcome = match_flag(&index, tokens, offset, self.help, |next| {
                        claimed.contains(&next)
                    });
                    offset += outcome.consumed;
                    self.apply(outcome);
                }
                TokenClass::Plain => {
                    run.push(offset);
                    offset += 1;
                }
            }
        }

        self.flush(&pool, &run)?;

        for node in outside {
            self.flush(&node.positionals().collect::<Vec<&Slot>>(), &[])?;
        }

        Ok(Scan::Done)
    }

    fn activate_defaults(&mut self) -> Result<(), InternalInvariantError> {
        let errors = self.dispatcher.activate_defaults();
        self.aggregator.extend(errors);
        let implicit: Vec<&'s ParserNode> = self
            .dispatcher
            .chain()
            .iter()
            .filter(|activation| activation.implicit)
            .map(|activation| activation.node)
            .collect();

        for node in implicit {
            self.flush(&node.positionals().collect::<Vec<&Slot>>(), &[])?;
        }

        Ok(())
    }

    fn apply(&mut self, outcome: FlagOutcome<'s>) {
        let FlagOutcome { hits, errors, .. } = outcome;
        self.aggregator.extend(errors);

        for FlagHit { slot, matched } in hits {
            let binding = match matched {
                Matched::Count(occurrences) => {
                    self.bindings.count(slot.path(), occurrences);
                    continue;
                }
                Matched::Values(values) => Binding::Values(values),
                Matched::Inverse => Binding::Inverse,
            };

            if self.bindings.bind(slot.path(), binding).is_err() {
                self.aggregator.push(ParseError::RepeatedFlag {
                    slot: slot.path().to_string(),
                });
            }
        }
    }

    // Divide a positional run between its slots.
    fn flush(&mut self, slots: &[&'s Slot], run: &[usize]) -> Result<(), InternalInvariantError> {
        let values: Vec<String> = run
            .iter()
            .map(|offset| self.tokens[*offset].clone())
            .collect();

        if slots.is_empty() {
            if !values.is_empty() {
                self.aggregator
                    .push(ParseError::UnrecognizedToken { tokens: values });
            }

            return Ok(());
        }

        match resolve(slots, &values) {
            Ok(spans) => {
                for (slot, span) in slots.iter().zip(spans.into_iter()) {
                    let binding = match span {
                        Span::Bound(range) => Binding::Values(
                            range
                                .map(|i| (run[i], values[i].clone()))
                                .collect(),
                        ),
                        Span::Absent => Binding::Absent,
                    };

                    if self.bindings.bind(slot.path(), binding).is_err() {
                        self.aggregator.push(ParseError::RepeatedFlag {
                            slot: slot.path().to_string(),
                        });
                    }
                }
            }
            Err(ResolveError::Overlapping { labels }) => {
                return Err(InternalInvariantError::new(format!(
                    "unbounded positionals {labels:?} share a run after the tree was validated"
                )));
            }
            Err(ResolveError::Missing { items }) => {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("Positional run {values:?} is short of items {items:?}.");
                }

                for item in items {
                    self.aggregator.push(ParseError::MissingRequired {
                        slot: slots[item].path().to_string(),
                    });
                }

                self.mark_unresolved(slots);
            }
            Err(ResolveError::Unresolvable { item, cursor }) => {
                let remainder = values[cursor.min(values.len())..].to_vec();

                match item {
                    Some(item) => self.aggregator.push(ParseError::Unresolvable {
                        slot: slots[item].path().to_string(),
                        remainder,
                        expected: slots[item].arity().to_string(),
                    }),
                    None => self
                        .aggregator
                        .push(ParseError::UnrecognizedToken { tokens: remainder }),
                }

                self.mark_unresolved(slots);
            }
        }

        Ok(())
    }

    fn mark_unresolved(&mut self, slots: &[&'s Slot]) {
        for slot in slots {
            // Refused only when already provided, in which case the binding stands.
            let _ = self.bindings.bind(slot.path(), Binding::Unresolved);
        }
    }
}

// The fewest tokens the slots can be placed over.
fn required_tokens(slots: &[&Slot]) -> usize {
    slots
        .iter()
        .filter(|slot| !Resolvable::optional(**slot))
        .map(|slot| slot.arity().min())
        .sum()
}

// The family of `node` that `token` would select in, if any.
fn selects_within(node: &ParserNode, token: &str) -> Option<String> {
    node.families()
        .iter()
        .find(|family| match split_selector(token) {
            SelectorToken::Qualified {
                family: path,
                alternative,
            } => family.path() == path && family.find(alternative).is_some(),
            SelectorToken::Bare(name) => family.find(name).is_some(),
        })
        .map(|family| family.path().to_string())
}

// Walk every activated node once, recording each independently detectable problem in slot order.
fn aggregate(chain: &[Activation], bindings: &BindingTable, aggregator: &mut ErrorAggregator) {
    for activation in chain {
        let node = activation.node;

        for slot in node.slots() {
            match bindings.get(slot.path()) {
                Some(Binding::Unresolved) => {}
                Some(binding @ Binding::Values(_)) => {
                    let values = binding.tokens();

                    if !slot.accepts(&values) {
                        let reason = match slot.construct(&values) {
                            Err(reason) => reason,
                            Ok(_) => "no variant accepts the value(s).".to_string(),
                        };
                        aggregator.push(ParseError::InvalidValue {
                            slot: slot.path().to_string(),
                            values,
                            reason,
                        });
                    }
                }
                binding => {
                    let provided = binding.map(Binding::is_provided).unwrap_or(false);

                    if !provided && slot.is_required() {
                        aggregator.push(ParseError::MissingRequired {
                            slot: slot.path().to_string(),
                        });
                    }
                }
            }
        }

        for group in node.groups() {
            let members: Vec<String> = node
                .slots()
                .iter()
                .filter(|slot| slot.mutex_group() == Some(group.id()))
                .map(|slot| slot.path().to_string())
                .collect();
            let provided: Vec<String> = members
                .iter()
                .filter(|member| bindings.is_provided(member))
                .cloned()
                .collect();

            if provided.len() > 1 {
                aggregator.push(ParseError::MutuallyExclusive {
                    group: group.id().to_string(),
                    slots: provided,
                });
            } else if provided.is_empty() && group.is_required() {
                aggregator.push(ParseError::MissingMutexGroup {
                    group: group.id().to_string(),
                    slots: members,
                });
            }
        }
    }
}
