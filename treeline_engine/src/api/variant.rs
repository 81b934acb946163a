use crate::matcher::{resolve, resolve_repeated, Resolvable, Span};
use crate::model::{Arity, Value};

/// One way of reading a slot's tokens into a [`Value`].
///
/// A slot lists its variants in preference order.
/// When more than one variant admits a span of the same length, the first whose every token converts wins.
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use treeline::{Value, Variant};
///
/// let pair = Variant::tuple([Variant::Int, Variant::Str]);
/// let tokens = vec!["1".to_string(), "a".to_string()];
/// assert_eq!(
///     pair.construct(&tokens),
///     Ok(Value::Tuple(vec![Value::Int(1), Value::str("a")]))
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// A signed integer.
    Int,
    /// A floating point number; integers also convert.
    Float,
    /// `true`/`false` (also `True`/`False`, `1`/`0`).
    Bool,
    /// Any token.
    Str,
    /// The literal `None`.
    NoneLiteral,
    /// One of a fixed set of literals.
    Choice(Vec<String>),
    /// Consumes no tokens, producing the given value (a switch).
    Constant(Value),
    /// A fixed sequence of parts, consumed back to back.
    Tuple(Vec<Variant>),
    /// Any number of repetitions of one item.
    List(Box<Variant>),
}

impl Variant {
    /// Convenience constructor for [`Variant::Choice`].
    pub fn choice<S: Into<String>>(choices: impl IntoIterator<Item = S>) -> Self {
        Variant::Choice(choices.into_iter().map(Into::into).collect())
    }

    /// Convenience constructor for [`Variant::Tuple`].
    pub fn tuple(parts: impl IntoIterator<Item = Variant>) -> Self {
        Variant::Tuple(parts.into_iter().collect())
    }

    /// Convenience constructor for [`Variant::List`].
    pub fn list(item: Variant) -> Self {
        Variant::List(Box::new(item))
    }

    /// A short display name (ex: `int`, `(int, str)`, `{a,b}`).
    pub fn name(&self) -> String {
        match self {
            Variant::Int => "int".to_string(),
            Variant::Float => "float".to_string(),
            Variant::Bool => "bool".to_string(),
            Variant::Str => "str".to_string(),
            Variant::NoneLiteral => "None".to_string(),
            Variant::Choice(choices) => format!("{{{}}}", choices.join(",")),
            Variant::Constant(value) => format!("={value}"),
            Variant::Tuple(parts) => {
                let names: Vec<String> = parts.iter().map(Variant::name).collect();
                format!("({})", names.join(", "))
            }
            Variant::List(item) => format!("[{} ...]", item.name()),
        }
    }

    /// The token counts this variant can consume.
    pub fn arity(&self) -> Arity {
        match self {
            Variant::Int
            | Variant::Float
            | Variant::Bool
            | Variant::Str
            | Variant::NoneLiteral
            | Variant::Choice(_) => Arity::precisely(1),
            Variant::Constant(_) => Arity::precisely(0),
            Variant::Tuple(parts) => parts
                .iter()
                .fold(Arity::precisely(0), |total, part| total.concat(&part.arity())),
            Variant::List(_) => Arity::any(),
        }
    }

    /// Whether a single token converts under this variant (or under some part of a composite).
    pub fn validate(&self, token: &str) -> bool {
        match self {
            Variant::Constant(_) => false,
            Variant::Tuple(parts) => parts.iter().any(|part| part.validate(token)),
            Variant::List(item) => item.validate(token),
            scalar => scalar.convert(token).is_ok(),
        }
    }

    /// Whether the whole span has an admissible length and converts under this variant.
    ///
    /// Every token is first checked with [`Variant::validate`], before the span is constructed.
    pub fn accepts(&self, tokens: &[String]) -> bool {
        self.arity().admits(tokens.len())
            && tokens.iter().all(|token| self.validate(token))
            && self.construct(tokens).is_ok()
    }

    /// Convert the span into a value.
    pub fn construct(&self, tokens: &[String]) -> Result<Value, String> {
        match self {
            Variant::Constant(value) => {
                if tokens.is_empty() {
                    Ok(value.clone())
                } else {
                    Err(format!("'{}' takes no values.", self.name()))
                }
            }
            Variant::Tuple(parts) => {
                let spans = resolve(parts, tokens).map_err(|_| {
                    format!(
                        "{:?} cannot convert to {} (expected {} values).",
                        tokens,
                        self.name(),
                        self.arity()
                    )
                })?;
                let mut values = Vec::default();

                for (part, span) in parts.iter().zip(spans.into_iter()) {
                    match span {
                        Span::Bound(range) => values.push(part.construct(&tokens[range])?),
                        Span::Absent => {
                            unreachable!("internal error - tuple parts are never optional")
                        }
                    }
                }

                Ok(Value::Tuple(values))
            }
            Variant::List(item) => {
                if tokens.is_empty() {
                    return Ok(Value::List(Vec::default()));
                }

                let spans = resolve_repeated(item.as_ref(), tokens).ok_or_else(|| {
                    format!("{:?} cannot convert to {}.", tokens, self.name())
                })?;
                let mut values = Vec::default();

                for range in spans {
                    values.push(item.construct(&tokens[range])?);
                }

                Ok(Value::List(values))
            }
            scalar => match tokens {
                [token] => scalar.convert(token),
                _ => Err(format!(
                    "{} takes precisely 1 value (provided={}).",
                    scalar.name(),
                    tokens.len()
                )),
            },
        }
    }

    fn convert(&self, token: &str) -> Result<Value, String> {
        let converted = match self {
            Variant::Int => token.parse::<i64>().ok().map(Value::Int),
            Variant::Float => token.parse::<f64>().ok().map(Value::Float),
            Variant::Bool => match token {
                "true" | "True" | "1" => Some(Value::Bool(true)),
                "false" | "False" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Variant::Str => Some(Value::str(token)),
            Variant::NoneLiteral => (token == "None").then_some(Value::None),
            Variant::Choice(choices) => choices
                .iter()
                .any(|choice| choice == token)
                .then(|| Value::str(token)),
            _ => unreachable!("internal error - only scalar variants convert single tokens"),
        };

        converted.ok_or_else(|| format!("'{token}' cannot convert to {}.", self.name()))
    }

    /// Whether an already constructed value has the shape this variant produces.
    pub(crate) fn admits_value(&self, value: &Value) -> bool {
        match (self, value) {
            (Variant::Int, Value::Int(_)) => true,
            (Variant::Float, Value::Float(_) | Value::Int(_)) => true,
            (Variant::Bool, Value::Bool(_)) => true,
            (Variant::Str, Value::Str(_)) => true,
            (Variant::NoneLiteral, Value::None) => true,
            (Variant::Choice(choices), Value::Str(s)) => choices.contains(s),
            (Variant::Constant(constant), value) => constant.coerced_eq(value),
            (Variant::Tuple(parts), Value::Tuple(values)) => {
                parts.len() == values.len()
                    && parts
                        .iter()
                        .zip(values.iter())
                        .all(|(part, value)| part.admits_value(value))
            }
            (Variant::List(item), Value::List(values)) => {
                values.iter().all(|value| item.admits_value(value))
            }
            _ => false,
        }
    }

    /// Convert an admitted value into exactly what this variant constructs (ex: an `Int` under `Float`).
    pub(crate) fn conform(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Variant::Float, Value::Int(int)) => Some(Value::Float(*int as f64)),
            (Variant::Tuple(parts), Value::Tuple(values)) if parts.len() == values.len() => parts
                .iter()
                .zip(values.iter())
                .map(|(part, value)| part.conform(value))
                .collect::<Option<Vec<Value>>>()
                .map(Value::Tuple),
            (Variant::List(item), Value::List(values)) => values
                .iter()
                .map(|value| item.conform(value))
                .collect::<Option<Vec<Value>>>()
                .map(Value::List),
            (variant, value) if variant.admits_value(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl Resolvable for Variant {
    fn label(&self) -> String {
        self.name()
    }

    fn arity(&self) -> Arity {
        Variant::arity(self)
    }

    fn accepts(&self, tokens: &[String]) -> bool {
        Variant::accepts(self, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Nargs;
    use rstest::rstest;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[rstest]
    #[case(Variant::Int, "-3", Value::Int(-3))]
    #[case(Variant::Float, "0.5", Value::Float(0.5))]
    #[case(Variant::Float, "2", Value::Float(2.0))]
    #[case(Variant::Bool, "True", Value::Bool(true))]
    #[case(Variant::Bool, "0", Value::Bool(false))]
    #[case(Variant::Str, "abc", Value::str("abc"))]
    #[case(Variant::NoneLiteral, "None", Value::None)]
    #[case(Variant::choice(["a", "b"]), "b", Value::str("b"))]
    fn construct_scalar(#[case] variant: Variant, #[case] token: &str, #[case] expected: Value) {
        assert!(variant.validate(token));
        assert_eq!(variant.construct(&tokens(&[token])), Ok(expected));
    }

    #[rstest]
    #[case(Variant::Int, "1.5")]
    #[case(Variant::Float, "x")]
    #[case(Variant::Bool, "yes")]
    #[case(Variant::NoneLiteral, "none")]
    #[case(Variant::choice(["a", "b"]), "c")]
    fn construct_scalar_invalid(#[case] variant: Variant, #[case] token: &str) {
        assert!(!variant.validate(token));
        let error = variant.construct(&tokens(&[token])).unwrap_err();
        assert!(error.contains("cannot convert"), "{error}");
    }

    #[test]
    fn construct_constant() {
        let variant = Variant::Constant(Value::Bool(true));
        assert_eq!(variant.arity(), Arity::precisely(0));
        assert_eq!(variant.construct(&[]), Ok(Value::Bool(true)));
        assert!(!variant.accepts(&tokens(&["true"])));
    }

    #[test]
    fn tuple_arity() {
        let variant = Variant::tuple([Variant::Int, Variant::Str, Variant::Int]);
        assert_eq!(variant.arity(), Arity::precisely(3));

        let nested = Variant::tuple([Variant::Int, Variant::list(Variant::Int)]);
        assert_eq!(nested.arity(), Arity::at_least(1));
    }

    #[rstest]
    #[case(Variant::tuple([Variant::Int, Variant::choice(["a"])]), vec!["1", "a"], true)]
    #[case(Variant::tuple([Variant::Int, Variant::choice(["a"])]), vec!["1", "b"], false)]
    #[case(Variant::tuple([Variant::Int, Variant::choice(["a"])]), vec!["a", "1"], false)]
    #[case(Variant::list(Variant::Float), vec!["1", "x"], false)]
    fn accepts_validates_tokens(#[case] variant: Variant, #[case] input: Vec<&str>, #[case] expected: bool) {
        assert_eq!(variant.accepts(&tokens(&input)), expected);
    }

    #[test]
    fn construct_tuple() {
        let variant = Variant::tuple([Variant::Int, Variant::Float]);
        assert_eq!(
            variant.construct(&tokens(&["1", "2"])),
            Ok(Value::Tuple(vec![Value::Int(1), Value::Float(2.0)]))
        );
        assert!(!variant.accepts(&tokens(&["a", "2"])));
        assert!(!variant.accepts(&tokens(&["1"])));
    }

    #[test]
    fn construct_list() {
        let variant = Variant::list(Variant::Int);
        assert_eq!(variant.construct(&[]), Ok(Value::List(vec![])));
        assert_eq!(
            variant.construct(&tokens(&["1", "2", "3"])),
            Ok(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
        assert!(!variant.accepts(&tokens(&["1", "x"])));
    }

    #[test]
    fn construct_list_of_pairs() {
        let variant = Variant::list(Variant::tuple([Variant::Str, Variant::Int]));
        assert_eq!(
            variant.construct(&tokens(&["a", "1", "b", "2"])),
            Ok(Value::List(vec![
                Value::Tuple(vec![Value::str("a"), Value::Int(1)]),
                Value::Tuple(vec![Value::str("b"), Value::Int(2)]),
            ]))
        );
        assert!(!variant.accepts(&tokens(&["a", "1", "b"])));
    }

    #[test]
    fn tuple_with_variable_part() {
        let variant = Variant::tuple([Variant::list(Variant::Int), Variant::Str]);
        assert_eq!(variant.arity().alternatives(), &[Nargs::AtLeast(1)]);
        assert_eq!(
            variant.construct(&tokens(&["1", "2", "x"])),
            Ok(Value::Tuple(vec![
                Value::List(vec![Value::Int(1), Value::Int(2)]),
                Value::str("x"),
            ]))
        );
    }

    #[rstest]
    #[case(Variant::Float, Value::Int(1), true)]
    #[case(Variant::Int, Value::Float(1.0), false)]
    #[case(Variant::choice(["a"]), Value::str("a"), true)]
    #[case(Variant::choice(["a"]), Value::str("b"), false)]
    #[case(Variant::list(Variant::Int), Value::List(vec![Value::Int(1)]), true)]
    #[case(Variant::tuple([Variant::Int, Variant::Str]), Value::Tuple(vec![Value::Int(1)]), false)]
    fn admits_value(#[case] variant: Variant, #[case] value: Value, #[case] expected: bool) {
        assert_eq!(variant.admits_value(&value), expected);
    }

    #[rstest]
    #[case(Variant::Float, Value::Int(1), Some(Value::Float(1.0)))]
    #[case(Variant::Int, Value::Int(1), Some(Value::Int(1)))]
    #[case(Variant::Int, Value::Float(1.0), None)]
    #[case(
        Variant::tuple([Variant::Float, Variant::Int]),
        Value::Tuple(vec![Value::Int(2), Value::Int(3)]),
        Some(Value::Tuple(vec![Value::Float(2.0), Value::Int(3)]))
    )]
    #[case(
        Variant::list(Variant::Float),
        Value::List(vec![Value::Int(1), Value::Float(0.5)]),
        Some(Value::List(vec![Value::Float(1.0), Value::Float(0.5)]))
    )]
    fn conform(#[case] variant: Variant, #[case] value: Value, #[case] expected: Option<Value>) {
        assert_eq!(variant.conform(&value), expected);
    }
}
