use std::ops::Range;
use thiserror::Error;

use crate::model::Arity;

/// Something the arity resolver can place over a run of tokens.
///
/// Slots and variants implement this; callers may implement it on their own item types.
pub trait Resolvable {
    /// A name for messages.
    fn label(&self) -> String;

    /// The admissible span lengths.
    fn arity(&self) -> Arity;

    /// Whether the item converts the whole span.
    fn accepts(&self, tokens: &[String]) -> bool;

    /// Whether the item may be left unmatched (it then falls back to a default).
    fn optional(&self) -> bool {
        false
    }
}

impl<R: Resolvable + ?Sized> Resolvable for &R {
    fn label(&self) -> String {
        (**self).label()
    }

    fn arity(&self) -> Arity {
        (**self).arity()
    }

    fn accepts(&self, tokens: &[String]) -> bool {
        (**self).accepts(tokens)
    }

    fn optional(&self) -> bool {
        (**self).optional()
    }
}

/// The tokens assigned to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// The half-open token range `[start, end)`.
    Bound(Range<usize>),
    /// An optional item left unmatched.
    Absent,
}

/// Why no boundary assignment exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// More than one item in the run is unbounded.
    #[error("items {} are all unbounded within one run.", .labels.join(", "))]
    Overlapping {
        /// The unbounded items.
        labels: Vec<String>,
    },
    /// Fewer tokens than the items' combined minimum.
    #[error("too few tokens for items {items:?}.")]
    Missing {
        /// The indices of the required items left without tokens, placing minimums leftmost.
        items: Vec<usize>,
    },
    /// The search was exhausted.
    /// Reports the furthest point it reached: the item it could not place, and where.
    #[error("cannot place item {item:?} at token {cursor}.")]
    Unresolvable {
        /// The index of the item that could not be placed (`None` when tokens remain after every item).
        item: Option<usize>,
        /// The token offset the item could not be placed at.
        cursor: usize,
    },
}

#[cfg(test)]
pub(crate) mod test {
    use rand::distributions::Standard;
    use rand::prelude::Distribution;
    use rand::Rng;

    use crate::model::{Arity, Nargs};

    /// A random, small arity.
    pub(crate) struct SmallArity(pub Arity);

    impl Distribution<SmallArity> for Standard {
        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SmallArity {
            let alternatives: Vec<Nargs> = (0..rng.gen_range(1..4))
                .map(|_| Nargs::Precisely(rng.gen_range(0..4)))
                .collect();
            SmallArity(Arity::one_of(alternatives))
        }
    }
}
