use std::collections::HashSet;
use std::ops::Range;

use crate::matcher::api::*;
use crate::model::Arity;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Take(usize),
    Absent,
}

impl Choice {
    fn len(&self) -> usize {
        match self {
            Choice::Take(len) => *len,
            Choice::Absent => 0,
        }
    }
}

#[derive(Debug)]
struct Frame {
    cursor: usize,
    choices: Vec<Choice>,
    next: usize,
}

/// Find token boundaries placing every item over the tokens, in order.
///
/// Each item's span must be admitted by its arity and accepted by the item.
/// Alternatives are explored in ascending arity order (an unbounded alternative from its longest run downwards), backtracking to the most recent item with an untried alternative.
/// Optional items try being left unmatched last.
/// Failed `(item, cursor)` pairs are memoized, so the search is polynomial in the number of tokens.
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use treeline::prelude::*;
/// use treeline::{Arity, Nargs};
///
/// struct Pair;
///
/// impl Resolvable for Pair {
///     fn label(&self) -> String { "pair".to_string() }
///     fn arity(&self) -> Arity { Arity::one_of([Nargs::Precisely(2), Nargs::Precisely(3)]) }
///     fn accepts(&self, _tokens: &[String]) -> bool { true }
/// }
///
/// let tokens: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
/// let spans = resolve(&[Pair, Pair], &tokens).unwrap();
/// assert_eq!(spans, vec![Span::Bound(0..2), Span::Bound(2..5)]);
/// ```
pub fn resolve<R: Resolvable>(items: &[R], tokens: &[String]) -> Result<Vec<Span>, ResolveError> {
    let unbounded: Vec<String> = items
        .iter()
        .filter(|item| item.arity().is_unbounded())
        .map(Resolvable::label)
        .collect();

    if unbounded.len() > 1 {
        return Err(ResolveError::Overlapping { labels: unbounded });
    }

    let k = items.len();
    let n = tokens.len();

    if k == 0 {
        return if n == 0 {
            Ok(Vec::default())
        } else {
            Err(ResolveError::Unresolvable {
                item: None,
                cursor: 0,
            })
        };
    }

    let arities: Vec<Arity> = items.iter().map(Resolvable::arity).collect();
    let mut suffix_min = vec![0usize; k + 1];
    let mut suffix_max: Vec<Option<usize>> = vec![Some(0); k + 1];

    for i in (0..k).rev() {
        let min = if items[i].optional() {
            0
        } else {
            arities[i].min()
        };
        suffix_min[i] = suffix_min[i + 1] + min;
        suffix_max[i] = match (arities[i].max(), suffix_max[i + 1]) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };
    }

    if n < suffix_min[0] {
        // Place required minimums leftmost; whatever cannot be covered is missing.
        let mut remaining = n;
        let mut missing = Vec::default();

        for (i, item) in items.iter().enumerate() {
            if item.optional() {
                continue;
            }

            let min = arities[i].min();

            if remaining >= min {
                remaining -= min;
            } else {
                missing.push(i);
            }
        }

        return Err(ResolveError::Missing { items: missing });
    }

    if let Some(max) = suffix_max[0] {
        if n > max {
            // Tokens remain however greedily every item is placed.
            return Err(ResolveError::Unresolvable {
                item: None,
                cursor: max,
            });
        }
    }

    let choices = |i: usize, cursor: usize| -> Vec<Choice> {
        let remaining = n - cursor;
        let fits = |rest: usize| {
            rest >= suffix_min[i + 1] && suffix_max[i + 1].map_or(true, |max| rest <= max)
        };
        let mut out: Vec<Choice> = arities[i]
            .candidates(remaining)
            .into_iter()
            .filter(|len| fits(remaining - len))
            .filter(|len| items[i].accepts(&tokens[cursor..cursor + len]))
            .map(Choice::Take)
            .collect();

        if items[i].optional() && fits(remaining) {
            out.push(Choice::Absent);
        }

        out
    };

    let mut failed: HashSet<(usize, usize)> = HashSet::default();
    let mut furthest: (usize, usize) = (0, 0);
    let mut stack = vec![Frame {
        cursor: 0,
        choices: choices(0, 0),
        next: 0,
    }];

    loop {
        let depth = match stack.len() {
            0 => break,
            len => len - 1,
        };
        let frame = &mut stack[depth];
        furthest = furthest.max((frame.cursor, depth));

        match frame.choices.get(frame.next).copied() {
            Some(choice) => {
                frame.next += 1;
                let end = frame.cursor + choice.len();
                #[cfg(feature = "tracing_debug")]
                {
                    debug!(
                        "Resolve: '{}' tries {choice:?} at {}.",
                        items[depth].label(),
                        frame.cursor
                    );
                }

                if depth + 1 == k {
                    if end == n {
                        return Ok(stack
                            .iter()
                            .map(|frame| match frame.choices[frame.next - 1] {
                                Choice::Take(len) => Span::Bound(frame.cursor..frame.cursor + len),
                                Choice::Absent => Span::Absent,
                            })
                            .collect());
                    }
                } else if !failed.contains(&(depth + 1, end)) {
                    stack.push(Frame {
                        cursor: end,
                        choices: choices(depth + 1, end),
                        next: 0,
                    });
                }
            }
            None => {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!(
                        "Resolve: '{}' exhausted at {}; backtracking.",
                        items[depth].label(),
                        frame.cursor
                    );
                }
                failed.insert((depth, frame.cursor));
                stack.pop();
            }
        }
    }

    let (cursor, item) = furthest;
    Err(ResolveError::Unresolvable {
        item: Some(item),
        cursor,
    })
}

/// Split the tokens into consecutive spans of one repeated item (at least one token per span).
pub(crate) fn resolve_repeated<R: Resolvable + ?Sized>(
    item: &R,
    tokens: &[String],
) -> Option<Vec<Range<usize>>> {
    let n = tokens.len();

    if n == 0 {
        return Some(Vec::default());
    }

    let arity = item.arity();
    let lengths = |cursor: usize| -> Vec<usize> {
        arity
            .candidates(n - cursor)
            .into_iter()
            .filter(|len| *len > 0 && item.accepts(&tokens[cursor..cursor + len]))
            .collect()
    };
    let mut failed: HashSet<usize> = HashSet::default();
    let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, lengths(0), 0)];

    loop {
        let (cursor, options, next) = stack.last_mut()?;

        match options.get(*next).copied() {
            Some(len) => {
                *next += 1;
                let end = *cursor + len;

                if end == n {
                    return Some(
                        stack
                            .iter()
                            .map(|(cursor, options, next)| *cursor..*cursor + options[*next - 1])
                            .collect(),
                    );
                }

                if !failed.contains(&end) {
                    stack.push((end, lengths(end), 0));
                }
            }
            None => {
                failed.insert(*cursor);
                stack.pop();
            }
        }
    }
}
