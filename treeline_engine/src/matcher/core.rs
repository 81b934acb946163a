use std::collections::HashMap;

use crate::api::{ParserNode, Slot, SlotKind};
use crate::constant::*;
use crate::matcher::model::*;
use crate::parser::ParseError;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenClass<'t> {
    Help,
    Long(&'t str, Option<&'t str>),
    Short(&'t str, Option<&'t str>),
    Plain,
}

pub(crate) fn classify(token: &str, help: bool) -> TokenClass<'_> {
    if help && is_help(token) {
        return TokenClass::Help;
    }

    // Find a 'long' flag, such as:
    //  --initial
    //  --initial ..
    //  --initial=..
    if let Some(long) = token.strip_prefix("--") {
        let (left, right) = split_equals_delimiter(long);
        return TokenClass::Long(left, right);
    }

    // Find 'short' flag(s), such as (both -i and -v are example short flags):
    //  -i
    //  -i ..
    //  -i=..
    //  -vvv
    //  -iv ..
    // Negative numbers are values.
    if token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err() {
        let (left, right) = split_equals_delimiter(&token[1..]);
        return TokenClass::Short(left, right);
    }

    TokenClass::Plain
}

fn is_help(token: &str) -> bool {
    token
        .strip_prefix("--")
        .map(|long| long == HELP_NAME)
        .unwrap_or(false)
        || token
            .strip_prefix('-')
            .map(|short| short.len() == 1 && short.starts_with(HELP_SHORT))
            .unwrap_or(false)
}

fn split_equals_delimiter(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((left, right)) => (left, Some(right)),
        None => (token, None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagAction {
    Set,
    Inverse,
}

/// The flags visible to a parse; the earliest registration of a flag owns it.
#[derive(Debug, Default)]
pub(crate) struct FlagIndex<'s> {
    flags: HashMap<String, (&'s Slot, FlagAction)>,
}

impl<'s> FlagIndex<'s> {
    pub(crate) fn extend(&mut self, node: &'s ParserNode) {
        for slot in node.slots().iter().filter(|s| s.kind() == SlotKind::Named) {
            let flags = slot
                .flags()
                .into_iter()
                .map(|flag| (flag, FlagAction::Set))
                .chain(slot.inverse_flag().map(|flag| (flag, FlagAction::Inverse)));

            for (flag, action) in flags {
                match self.flags.get(&flag) {
                    Some((_owner, _)) => {
                        #[cfg(feature = "tracing_debug")]
                        {
                            debug!(
                                "Flag '{flag}' of '{}' is shadowed by '{}'.",
                                slot.path(),
                                _owner.path()
                            );
                        }
                    }
                    None => {
                        self.flags.insert(flag, (slot, action));
                    }
                }
            }
        }
    }

    pub(crate) fn lookup(&self, flag: &str) -> Option<(&'s Slot, FlagAction)> {
        self.flags.get(flag).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Matched {
    Values(Vec<OffsetValue>),
    Count(usize),
    Inverse,
}

#[derive(Debug)]
pub(crate) struct FlagHit<'s> {
    pub slot: &'s Slot,
    pub matched: Matched,
}

#[derive(Debug, Default)]
pub(crate) struct FlagOutcome<'s> {
    pub hits: Vec<FlagHit<'s>>,
    pub errors: Vec<ParseError>,
    /// Tokens consumed, including the flag token itself.
    pub consumed: usize,
}

impl<'s> FlagOutcome<'s> {
    fn error(error: ParseError, consumed: usize) -> Self {
        Self {
            hits: Vec::default(),
            errors: vec![error],
            consumed,
        }
    }
}

/// Match the flag token at `offset`, together with the values that follow it.
///
/// Values are gathered until a non-value token (another flag, or the help token).
/// Unless the slot takes a single fixed count, gathering also stops at any offset where `stop` holds (ex: at a selector).
pub(crate) fn match_flag<'s>(
    index: &FlagIndex<'s>,
    tokens: &[String],
    offset: usize,
    help: bool,
    stop: impl Fn(usize) -> bool,
) -> FlagOutcome<'s> {
    let token = &tokens[offset];

    match classify(token, help) {
        TokenClass::Long(name, inline) => {
            let flag = format!("--{name}");

            match index.lookup(&flag) {
                Some((slot, FlagAction::Inverse)) => match inline {
                    Some(_) => FlagOutcome::error(
                        ParseError::ArityMismatch {
                            slot: slot.path().to_string(),
                            provided: 1,
                            expected: "0".to_string(),
                        },
                        1,
                    ),
                    None => FlagOutcome {
                        hits: vec![FlagHit {
                            slot,
                            matched: Matched::Inverse,
                        }],
                        errors: Vec::default(),
                        consumed: 1,
                    },
                },
                Some((slot, FlagAction::Set)) => {
                    take_values(slot, tokens, offset, inline, help, stop)
                }
                None => FlagOutcome::error(ParseError::UnknownFlag { flag }, 1),
            }
        }
        TokenClass::Short(cluster, inline) => {
            let mut slots = Vec::default();

            for short in cluster.chars() {
                match index.lookup(&format!("-{short}")) {
                    Some((slot, FlagAction::Set)) => slots.push(slot),
                    _ => {
                        return FlagOutcome::error(
                            ParseError::UnknownFlag {
                                flag: format!("-{cluster}"),
                            },
                            1,
                        );
                    }
                }
            }

            let last = match slots.pop() {
                Some(last) => last,
                None => unreachable!("internal error - short flags have at least one character"),
            };
            let mut outcome = FlagOutcome::default();

            // Every member but the last is a switch or counter.
            for slot in slots {
                if slot.is_counter() {
                    outcome.hits.push(FlagHit {
                        slot,
                        matched: Matched::Count(1),
                    });
                } else if slot.arity().admits(0) {
                    outcome.hits.push(FlagHit {
                        slot,
                        matched: Matched::Values(Vec::default()),
                    });
                } else {
                    outcome.errors.push(ParseError::TooFewValues {
                        slot: slot.path().to_string(),
                        provided: 0,
                        expected: slot.arity().to_string(),
                    });
                }
            }

            let FlagOutcome {
                hits,
                errors,
                consumed,
            } = take_values(last, tokens, offset, inline, help, stop);
            outcome.hits.extend(hits);
            outcome.errors.extend(errors);
            outcome.consumed = consumed;
            outcome
        }
        TokenClass::Help | TokenClass::Plain => {
            unreachable!("internal error - match_flag requires a flag token")
        }
    }
}

fn take_values<'s>(
    slot: &'s Slot,
    tokens: &[String],
    offset: usize,
    inline: Option<&str>,
    help: bool,
    stop: impl Fn(usize) -> bool,
) -> FlagOutcome<'s> {
    if slot.is_counter() {
        return match inline {
            Some(_) => FlagOutcome::error(
                ParseError::ArityMismatch {
                    slot: slot.path().to_string(),
                    provided: 1,
                    expected: "0".to_string(),
                },
                1,
            ),
            None => FlagOutcome {
                hits: vec![FlagHit {
                    slot,
                    matched: Matched::Count(1),
                }],
                errors: Vec::default(),
                consumed: 1,
            },
        };
    }

    let arity = slot.arity();
    let fixed = arity.fixed().is_some();
    let mut buffer = MatchBuffer::new(slot.path(), arity);
    let mut next = offset + 1;

    match inline {
        Some(value) => {
            // Flags using k=v syntax cannot follow up with more values afterwards.
            buffer.push(offset, value.to_string());
        }
        None => {
            while buffer.is_open() && next < tokens.len() {
                let candidate = &tokens[next];

                if classify(candidate, help) != TokenClass::Plain || (!fixed && stop(next)) {
                    break;
                }

                buffer.push(next, candidate.clone());
                next += 1;
            }
        }
    }

    match buffer.close() {
        Ok(values) => FlagOutcome {
            hits: vec![FlagHit {
                slot,
                matched: Matched::Values(values),
            }],
            errors: Vec::default(),
            consumed: next - offset,
        },
        Err(error) => FlagOutcome::error(ParseError::from(error), next - offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SpecTree, Variant};
    use rstest::rstest;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn tree() -> SpecTree {
        SpecTree::build(
            ParserNode::new("Root")
                .slot(Slot::named("lr", Variant::Float).short('l'))
                .slot(Slot::named("pair", Variant::tuple([Variant::Int, Variant::Int])))
                .slot(Slot::named("items", Variant::list(Variant::Str)))
                .slot(Slot::flag("dry").short('d'))
                .slot(Slot::counter("verbose").short('v')),
        )
        .unwrap()
    }

    #[rstest]
    #[case("--lr", TokenClass::Long("lr", None))]
    #[case("--lr=0.1", TokenClass::Long("lr", Some("0.1")))]
    #[case("--lr=", TokenClass::Long("lr", Some("")))]
    #[case("-l", TokenClass::Short("l", None))]
    #[case("-l=3", TokenClass::Short("l", Some("3")))]
    #[case("-vvv", TokenClass::Short("vvv", None))]
    #[case("-1", TokenClass::Plain)]
    #[case("-0.5", TokenClass::Plain)]
    #[case("-", TokenClass::Plain)]
    #[case("abc", TokenClass::Plain)]
    #[case("a:b", TokenClass::Plain)]
    #[case("--help", TokenClass::Help)]
    #[case("-h", TokenClass::Help)]
    fn classify_tokens(#[case] token: &str, #[case] expected: TokenClass) {
        assert_eq!(classify(token, true), expected);
    }

    #[test]
    fn classify_help_disabled() {
        assert_eq!(classify("--help", false), TokenClass::Long("help", None));
        assert_eq!(classify("-h", false), TokenClass::Short("h", None));
    }

    #[rstest]
    #[case(vec!["--lr", "0.1"], 2, vec!["0.1"])]
    #[case(vec!["--lr=0.1", "2"], 1, vec!["0.1"])]
    #[case(vec!["-l", "-3"], 2, vec!["-3"])]
    #[case(vec!["--pair", "1", "2", "3"], 3, vec!["1", "2"])]
    #[case(vec!["--items", "a", "b", "--lr", "1"], 3, vec!["a", "b"])]
    #[case(vec!["--items", "a", "stop", "b"], 2, vec!["a"])]
    #[case(vec!["--items"], 1, vec![])]
    #[case(vec!["--dry", "x"], 1, vec![])]
    fn match_flag_values(
        #[case] input: Vec<&str>,
        #[case] consumed: usize,
        #[case] expected: Vec<&str>,
    ) {
        // Setup
        let tree = tree();
        let mut index = FlagIndex::default();
        index.extend(tree.root());
        let input = tokens(&input);

        // Execute
        let outcome = match_flag(&index, &input, 0, true, |i| input[i] == "stop");

        // Verify
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.consumed, consumed);
        assert_eq!(outcome.hits.len(), 1);
        assert_matches!(&outcome.hits[0].matched, Matched::Values(values) if values.iter().map(|(_, v)| v.as_str()).collect::<Vec<&str>>() == expected);
    }

    #[test]
    fn match_flag_inverse() {
        let tree = tree();
        let mut index = FlagIndex::default();
        index.extend(tree.root());

        let outcome = match_flag(&index, &tokens(&["--no-dry"]), 0, true, |_| false);

        assert_eq!(outcome.consumed, 1);
        assert_eq!(outcome.hits[0].slot.path(), "dry");
        assert_eq!(outcome.hits[0].matched, Matched::Inverse);
    }

    #[test]
    fn match_flag_cluster() {
        let tree = tree();
        let mut index = FlagIndex::default();
        index.extend(tree.root());

        let outcome = match_flag(&index, &tokens(&["-vvdl", "2"]), 0, true, |_| false);

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.consumed, 2);
        let paths: Vec<&str> = outcome.hits.iter().map(|hit| hit.slot.path()).collect();
        assert_eq!(paths, vec!["verbose", "verbose", "dry", "lr"]);
        assert_eq!(outcome.hits[0].matched, Matched::Count(1));
    }

    #[rstest]
    #[case(vec!["--nope"], "'--nope'")]
    #[case(vec!["-x"], "'-x'")]
    #[case(vec!["-vx"], "'-vx'")]
    #[case(vec!["--lr"], "too few values provided for 'lr'")]
    #[case(vec!["--lr", "--dry"], "too few values provided for 'lr'")]
    #[case(vec!["--pair", "1"], "too few values provided for 'pair'")]
    #[case(vec!["--dry=1"], "'dry' cannot take 1 value(s)")]
    #[case(vec!["--verbose=1"], "'verbose' cannot take 1 value(s)")]
    #[case(vec!["-lv"], "too few values provided for 'lr'")]
    fn match_flag_errors(#[case] input: Vec<&str>, #[case] message: &str) {
        // Setup
        let tree = tree();
        let mut index = FlagIndex::default();
        index.extend(tree.root());

        // Execute
        let outcome = match_flag(&index, &tokens(&input), 0, true, |_| false);

        // Verify
        assert_eq!(outcome.errors.len(), 1);
        crate::test::assert_contains!(outcome.errors[0].to_string(), message);
    }

    #[test]
    fn flag_index_first_wins() {
        let first = ParserNode::new("First").slot(Slot::flag("a").short('x'));
        let second = ParserNode::new("Second").slot(Slot::flag("b").short('x'));
        let mut index = FlagIndex::default();

        index.extend(&first);
        index.extend(&second);

        let (slot, action) = index.lookup("-x").unwrap();
        assert_eq!(slot.path(), "a");
        assert_eq!(action, FlagAction::Set);
        assert_eq!(index.lookup("--b").unwrap().0.path(), "b");
        assert_eq!(index.lookup("--no-b").unwrap().1, FlagAction::Inverse);
    }
}
