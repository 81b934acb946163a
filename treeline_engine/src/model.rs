use std::cmp::Ordering;
use std::fmt;

/// One admissible token count for a slot.
///
/// Inspired by argparse: <https://docs.python.org/3/library/argparse.html#nargs>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nargs {
    /// `N`: Precisely `N` values.
    Precisely(u8),
    /// `N..`: At least `N` values; `AtLeast(0)` is `*` and `AtLeast(1)` is `+`.
    AtLeast(u8),
}

impl Nargs {
    /// `*`: any number of values, including `0`.
    pub const ANY: Nargs = Nargs::AtLeast(0);
    /// `+`: at least one value.
    pub const AT_LEAST_ONE: Nargs = Nargs::AtLeast(1);

    /// The smallest token count this alternative admits.
    pub fn min(&self) -> usize {
        match self {
            Nargs::Precisely(n) | Nargs::AtLeast(n) => *n as usize,
        }
    }

    /// Whether this alternative has no upper bound.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Nargs::AtLeast(_))
    }

    /// Whether precisely `len` tokens satisfy this alternative.
    pub fn admits(&self, len: usize) -> bool {
        match self {
            Nargs::Precisely(n) => len == *n as usize,
            Nargs::AtLeast(n) => len >= *n as usize,
        }
    }

    fn sort_key(&self) -> (usize, u8) {
        match self {
            Nargs::Precisely(n) => (*n as usize, 0),
            Nargs::AtLeast(n) => (*n as usize, 1),
        }
    }
}

impl PartialOrd for Nargs {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Nargs {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Nargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nargs::Precisely(n) => write!(f, "{n}"),
            Nargs::AtLeast(n) => write!(f, "[{n}, ∞)"),
        }
    }
}

/// The set of token counts a slot may legally consume.
///
/// Alternatives are always held in ascending order (by minimum count, fixed before unbounded).
/// The ordering is what the resolver walks through when it breaks ties, so two arities built from the same alternatives in a different order are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arity {
    alternatives: Vec<Nargs>,
}

impl Arity {
    /// Precisely `n` tokens.
    pub fn precisely(n: u8) -> Self {
        Self {
            alternatives: vec![Nargs::Precisely(n)],
        }
    }

    /// At least `n` tokens.
    pub fn at_least(n: u8) -> Self {
        Self {
            alternatives: vec![Nargs::AtLeast(n)],
        }
    }

    /// Any number of tokens, including none.
    pub fn any() -> Self {
        Self::at_least(0)
    }

    /// A finite set of alternatives.
    ///
    /// ### Example
    /// ```
    /// # use treeline_engine as treeline;
    /// use treeline::{Arity, Nargs};
    ///
    /// let arity = Arity::one_of([Nargs::Precisely(3), Nargs::Precisely(2), Nargs::Precisely(3)]);
    /// assert_eq!(arity.alternatives(), &[Nargs::Precisely(2), Nargs::Precisely(3)]);
    /// ```
    pub fn one_of(alternatives: impl IntoIterator<Item = Nargs>) -> Self {
        let mut alternatives: Vec<Nargs> = alternatives.into_iter().collect();
        alternatives.sort();
        alternatives.dedup();
        Self { alternatives }
    }

    /// The ascending alternatives of this arity.
    pub fn alternatives(&self) -> &[Nargs] {
        &self.alternatives
    }

    /// An arity admitting nothing; only produced by an empty `one_of`.
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Combine the alternatives of both arities.
    pub fn union(&self, other: &Arity) -> Arity {
        Arity::one_of(
            self.alternatives
                .iter()
                .chain(other.alternatives.iter())
                .copied(),
        )
    }

    /// The arity of two spans consumed back to back.
    pub(crate) fn concat(&self, other: &Arity) -> Arity {
        if self.is_unbounded() || other.is_unbounded() {
            let min = (self.min() + other.min()).min(u8::MAX as usize) as u8;
            return Arity::at_least(min);
        }

        let mut sums = Vec::default();

        for left in &self.alternatives {
            for right in &other.alternatives {
                let total = (left.min() + right.min()).min(u8::MAX as usize) as u8;
                sums.push(Nargs::Precisely(total));
            }
        }

        Arity::one_of(sums)
    }

    /// Whether precisely `len` tokens satisfy some alternative.
    pub fn admits(&self, len: usize) -> bool {
        self.alternatives.iter().any(|n| n.admits(len))
    }

    /// Whether some alternative has no upper bound.
    pub fn is_unbounded(&self) -> bool {
        self.alternatives.iter().any(Nargs::is_unbounded)
    }

    /// The smallest admissible token count (`0` for an empty arity).
    pub fn min(&self) -> usize {
        self.alternatives.first().map(Nargs::min).unwrap_or(0)
    }

    /// The largest admissible token count, or `None` when unbounded.
    pub fn max(&self) -> Option<usize> {
        if self.is_unbounded() {
            None
        } else {
            Some(self.alternatives.iter().map(Nargs::min).max().unwrap_or(0))
        }
    }

    /// The single fixed count, when that is the only alternative.
    pub fn fixed(&self) -> Option<usize> {
        match &self.alternatives[..] {
            [Nargs::Precisely(n)] => Some(*n as usize),
            _ => None,
        }
    }

    /// Span lengths to try, in resolution order, with at most `remaining` tokens available.
    ///
    /// Fixed alternatives come first, ascending.
    /// The unbounded alternative follows, starting from the longest run and shrinking towards its minimum.
    pub(crate) fn candidates(&self, remaining: usize) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::default();

        for nargs in &self.alternatives {
            if let Nargs::Precisely(n) = nargs {
                let n = *n as usize;
                if n <= remaining && !out.contains(&n) {
                    out.push(n);
                }
            }
        }

        let unbounded_min = self
            .alternatives
            .iter()
            .filter(|n| n.is_unbounded())
            .map(Nargs::min)
            .min();

        if let Some(lower) = unbounded_min {
            if lower <= remaining {
                for n in (lower..=remaining).rev() {
                    if !out.contains(&n) {
                        out.push(n);
                    }
                }
            }
        }

        out
    }
}

impl From<Nargs> for Arity {
    fn from(value: Nargs) -> Self {
        Arity {
            alternatives: vec![value],
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alternatives[..] {
            [single] => write!(f, "{single}"),
            alternatives => {
                let parts: Vec<String> = alternatives.iter().map(|n| n.to_string()).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// A constructed value.
///
/// Slot constructors produce the leaves; the construction stage assembles records following the shape of the specification tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The literal `None`.
    None,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A homogeneous, variable length sequence.
    List(Vec<Value>),
    /// A fixed shape sequence.
    Tuple(Vec<Value>),
    /// A named group of fields.
    Record(Record),
}

impl Value {
    /// Convenience constructor for [`Value::Str`].
    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    /// A short name for the shape of this value, used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Record(_) => "record",
        }
    }

    /// The record behind this value, if it is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Deep structural equality, where an integer equals the float of the same magnitude.
    ///
    /// ### Example
    /// ```
    /// # use treeline_engine as treeline;
    /// use treeline::Value;
    ///
    /// assert!(Value::Int(3).coerced_eq(&Value::Float(3.0)));
    /// assert!(!Value::Int(3).coerced_eq(&Value::Float(3.5)));
    /// assert!(!Value::Int(1).coerced_eq(&Value::Bool(true)));
    /// ```
    pub fn coerced_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                (*i as f64) == *f
            }
            (Value::List(left), Value::List(right)) | (Value::Tuple(left), Value::Tuple(right)) => {
                left.len() == right.len()
                    && left.iter().zip(right.iter()).all(|(l, r)| l.coerced_eq(r))
            }
            (Value::Record(left), Value::Record(right)) => left.coerced_eq(right),
            (left, right) => left == right,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Str(value) => write!(f, "{value:?}"),
            Value::List(items) => write!(f, "[{}]", join(items)),
            Value::Tuple(items) => write!(f, "({})", join(items)),
            Value::Record(record) => write!(f, "{record}"),
        }
    }
}

fn join(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// A named, ordered group of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::default(),
        }
    }

    /// Add (or replace) a field.
    ///
    /// ### Example
    /// ```
    /// # use treeline_engine as treeline;
    /// use treeline::{Record, Value};
    ///
    /// let record = Record::new("Adam")
    ///     .with("lr", Value::Float(0.001))
    ///     .with("lr", Value::Float(0.01));
    /// assert_eq!(record.get("lr"), Some(&Value::Float(0.01)));
    /// assert_eq!(record.fields().len(), 1);
    /// ```
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field.into(), value);
        self
    }

    /// The record's type or alternative name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fields, in insertion order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Look up a direct field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Look up a nested field by dotted path (ex: `optimizer.lr`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            Some((head, tail)) => self.get(head)?.as_record()?.get_path(tail),
            None => self.get(path),
        }
    }

    pub(crate) fn insert(&mut self, field: String, value: Value) {
        match self.fields.iter_mut().find(|(name, _)| name == &field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Insert by dotted path, creating intermediate records as required.
    pub(crate) fn insert_path(&mut self, path: &str, value: Value) {
        match path.split_once('.') {
            Some((head, tail)) => {
                if !matches!(self.get(head), Some(Value::Record(_))) {
                    self.insert(head.to_string(), Value::Record(Record::new(head)));
                }

                if let Some((_, Value::Record(inner))) =
                    self.fields.iter_mut().find(|(name, _)| name == head)
                {
                    inner.insert_path(tail, value);
                }
            }
            None => self.insert(path.to_string(), value),
        }
    }

    fn coerced_eq(&self, other: &Record) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self.fields.iter().all(|(name, value)| {
                other
                    .get(name)
                    .map(|o| value.coerced_eq(o))
                    .unwrap_or(false)
            })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        write!(f, "{}({})", self.name, parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{thread_rng, Rng};
    use rstest::rstest;

    fn random_nargs() -> Nargs {
        match thread_rng().gen_range(0..2) {
            0 => Nargs::Precisely(thread_rng().gen_range(0..10)),
            1 => Nargs::AtLeast(thread_rng().gen_range(0..10)),
            _ => unreachable!("internal error - impossible gen_range()"),
        }
    }

    #[test]
    fn arity_sorted() {
        for _ in 0..100 {
            let alternatives: Vec<Nargs> = (0..thread_rng().gen_range(1..6))
                .map(|_| random_nargs())
                .collect();
            let arity = Arity::one_of(alternatives.clone());
            let reversed = Arity::one_of(alternatives.into_iter().rev());

            assert_eq!(arity, reversed);
            assert!(arity.alternatives().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn nargs_order() {
        assert!(Nargs::Precisely(2) < Nargs::Precisely(3));
        assert!(Nargs::Precisely(2) < Nargs::AtLeast(2));
        assert!(Nargs::AtLeast(1) < Nargs::Precisely(2));
    }

    #[rstest]
    #[case(Arity::precisely(2), 0, false)]
    #[case(Arity::precisely(2), 2, true)]
    #[case(Arity::precisely(2), 3, false)]
    #[case(Arity::any(), 0, true)]
    #[case(Arity::any(), 7, true)]
    #[case(Arity::at_least(1), 0, false)]
    #[case(Arity::one_of([Nargs::Precisely(1), Nargs::Precisely(3)]), 2, false)]
    #[case(Arity::one_of([Nargs::Precisely(1), Nargs::Precisely(3)]), 3, true)]
    #[case(Arity::one_of([]), 0, false)]
    fn arity_admits(#[case] arity: Arity, #[case] len: usize, #[case] expected: bool) {
        assert_eq!(arity.admits(len), expected);
    }

    #[rstest]
    #[case(Arity::one_of([Nargs::Precisely(3), Nargs::Precisely(2)]), 5, vec![2, 3])]
    #[case(Arity::one_of([Nargs::Precisely(3), Nargs::Precisely(2)]), 2, vec![2])]
    #[case(Arity::any(), 3, vec![3, 2, 1, 0])]
    #[case(Arity::at_least(2), 1, vec![])]
    #[case(Arity::one_of([Nargs::Precisely(1), Nargs::AtLeast(2)]), 4, vec![1, 4, 3, 2])]
    #[case(Arity::one_of([Nargs::Precisely(3), Nargs::AtLeast(2)]), 4, vec![3, 4, 2])]
    fn arity_candidates(#[case] arity: Arity, #[case] remaining: usize, #[case] expected: Vec<usize>) {
        assert_eq!(arity.candidates(remaining), expected);
    }

    #[test]
    fn arity_concat() {
        let pair = Arity::one_of([Nargs::Precisely(1), Nargs::Precisely(2)]);
        assert_eq!(
            pair.concat(&pair),
            Arity::one_of([Nargs::Precisely(2), Nargs::Precisely(3), Nargs::Precisely(4)])
        );
        assert_eq!(pair.concat(&Arity::at_least(1)), Arity::at_least(2));
    }

    #[test]
    fn arity_display() {
        assert_eq!(Arity::precisely(2).to_string(), "2");
        assert_eq!(Arity::at_least(1).to_string(), "[1, ∞)");
        assert_eq!(
            Arity::one_of([Nargs::Precisely(3), Nargs::Precisely(2)]).to_string(),
            "{2, 3}"
        );
    }

    #[test]
    fn record_paths() {
        let mut record = Record::new("Config");
        record.insert_path("model.layers", Value::Int(4));
        record.insert_path("model.width", Value::Int(128));
        record.insert_path("lr", Value::Float(0.1));

        assert_eq!(record.get_path("model.layers"), Some(&Value::Int(4)));
        assert_eq!(record.get_path("model.width"), Some(&Value::Int(128)));
        assert_eq!(record.get_path("model.depth"), None);
        assert_eq!(record.fields().len(), 2);
        assert_eq!(
            record.to_string(),
            "Config(model=model(layers=4, width=128), lr=0.1)"
        );
    }

    #[rstest]
    #[case(Value::Int(2), Value::Float(2.0), true)]
    #[case(Value::Float(2.0), Value::Int(2), true)]
    #[case(Value::Int(2), Value::Int(3), false)]
    #[case(Value::Str("2".to_string()), Value::Int(2), false)]
    #[case(
        Value::Tuple(vec![Value::Int(1), Value::Float(2.0)]),
        Value::Tuple(vec![Value::Float(1.0), Value::Int(2)]),
        true
    )]
    #[case(
        Value::Record(Record::new("A").with("x", Value::Int(1))),
        Value::Record(Record::new("A").with("x", Value::Float(1.0))),
        true
    )]
    #[case(
        Value::Record(Record::new("A").with("x", Value::Int(1))),
        Value::Record(Record::new("B").with("x", Value::Int(1))),
        false
    )]
    fn value_coerced_eq(#[case] left: Value, #[case] right: Value, #[case] expected: bool) {
        assert_eq!(left.coerced_eq(&right), expected);
    }
}
