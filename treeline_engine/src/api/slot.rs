use crate::api::Variant;
use crate::constant::*;
use crate::matcher::Resolvable;
use crate::model::{Arity, Value};

/// How a slot is addressed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Matched by position, together with the other positional slots of its run.
    Positional,
    /// Matched by flag (ex: `--lr 0.1`).
    Named,
}

/// One addressable argument position of a [`ParserNode`](crate::ParserNode).
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use treeline::{Slot, SlotKind, Value, Variant};
///
/// let slot = Slot::named("lr", Variant::Float)
///     .default(Value::Float(0.001))
///     .help("The learning rate.");
/// assert_eq!(slot.kind(), SlotKind::Named);
/// assert_eq!(slot.flags(), vec!["--lr".to_string()]);
/// assert!(!slot.is_required());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    path: String,
    kind: SlotKind,
    aliases: Vec<String>,
    variants: Vec<Variant>,
    default: Option<Value>,
    counter: bool,
    switch: bool,
    mutex: Option<String>,
    help: Option<String>,
}

impl Slot {
    fn new(path: impl Into<String>, kind: SlotKind, variants: Vec<Variant>) -> Self {
        Self {
            path: path.into(),
            kind,
            aliases: Vec::default(),
            variants,
            default: None,
            counter: false,
            switch: false,
            mutex: None,
            help: None,
        }
    }

    /// Create a positional slot.
    pub fn positional(path: impl Into<String>, variant: Variant) -> Self {
        Self::new(path, SlotKind::Positional, vec![variant])
    }

    /// Create a named slot, addressed by `--<path>`.
    pub fn named(path: impl Into<String>, variant: Variant) -> Self {
        Self::new(path, SlotKind::Named, vec![variant])
    }

    /// Create a boolean switch: `--<path>` sets `true`, `--no-<path>` sets `false`.
    /// Defaults to `false`.
    pub fn flag(path: impl Into<String>) -> Self {
        let mut slot = Self::new(
            path,
            SlotKind::Named,
            vec![Variant::Constant(Value::Bool(true))],
        );
        slot.default = Some(Value::Bool(false));
        slot.switch = true;
        slot
    }

    /// Create a repeatable counter (ex: `-vvv`), constructing the number of occurrences.
    /// Defaults to `0`.
    pub fn counter(path: impl Into<String>) -> Self {
        let mut slot = Self::new(
            path,
            SlotKind::Named,
            vec![Variant::Constant(Value::Int(1))],
        );
        slot.default = Some(Value::Int(0));
        slot.counter = true;
        slot
    }

    /// Add another variant, tried after the existing ones.
    pub fn or(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Set the default, making the slot optional.
    /// If repeated, only the final default will apply.
    pub fn default(mut self, value: Value) -> Self {
        self.default.replace(value);
        self
    }

    /// Add a short alias (ex: `-v`).
    pub fn short(self, short: char) -> Self {
        self.alias(format!("-{short}"))
    }

    /// Add an alias flag, either `-<char>` or `--<name>`.
    /// Aliases are not qualified with the node's path.
    pub fn alias(mut self, flag: impl Into<String>) -> Self {
        self.aliases.push(flag.into());
        self
    }

    /// Place the slot in a mutual-exclusion group declared on its node.
    pub fn mutex(mut self, group: impl Into<String>) -> Self {
        self.mutex.replace(group.into());
        self
    }

    /// Document the slot.
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.help.replace(description.into());
        self
    }

    /// The (qualified, once built) dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Positional or named.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// The alias flags.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The variants, in preference order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// The default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether this is a repeatable counter.
    pub fn is_counter(&self) -> bool {
        self.counter
    }

    /// Whether this is a boolean switch with a `--no-<path>` inverse.
    pub fn is_switch(&self) -> bool {
        self.switch
    }

    /// The mutual-exclusion group, if any.
    pub fn mutex_group(&self) -> Option<&str> {
        self.mutex.as_deref()
    }

    /// The help text, if any.
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The union of the variants' arities.
    pub fn arity(&self) -> Arity {
        self.variants
            .iter()
            .fold(Arity::one_of([]), |total, variant| {
                total.union(&variant.arity())
            })
    }

    /// Whether the slot must be matched.
    /// Slots with a default, counters and mutex group members are never individually required.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.counter && self.mutex.is_none()
    }

    /// The flags addressing this slot (empty for positionals).
    pub fn flags(&self) -> Vec<String> {
        match self.kind {
            SlotKind::Positional => Vec::default(),
            SlotKind::Named => std::iter::once(format!("--{}", self.path))
                .chain(self.aliases.iter().cloned())
                .collect(),
        }
    }

    /// The `--no-<path>` flag of a switch.
    pub fn inverse_flag(&self) -> Option<String> {
        if self.switch {
            Some(format!("--{INVERSE_PREFIX}{}", self.path))
        } else {
            None
        }
    }

    /// Whether some variant converts the whole span.
    pub fn accepts(&self, tokens: &[String]) -> bool {
        self.variants.iter().any(|variant| variant.accepts(tokens))
    }

    /// Convert the span with the first variant that accepts it.
    pub fn construct(&self, tokens: &[String]) -> Result<Value, String> {
        let mut reason = None;

        for variant in &self.variants {
            if variant.arity().admits(tokens.len()) {
                match variant.construct(tokens) {
                    Ok(value) => return Ok(value),
                    Err(error) => {
                        reason.get_or_insert(error);
                    }
                }
            }
        }

        Err(reason.unwrap_or_else(|| {
            format!(
                "'{}' cannot take {} value(s) (expected={}).",
                self.path,
                tokens.len(),
                self.arity()
            )
        }))
    }

    /// Whether a pre-built value could have come from this slot.
    pub(crate) fn admits_value(&self, value: &Value) -> bool {
        if self.counter {
            return matches!(value, Value::Int(_));
        }

        if self.switch && matches!(value, Value::Bool(_)) {
            return true;
        }

        self.variants.iter().any(|variant| variant.admits_value(value))
    }

    /// The path without its node's prefix.
    pub(crate) fn relative_path(&self, prefix: &str) -> &str {
        relative(&self.path, prefix)
    }

    pub(crate) fn qualify(mut self, prefix: &str) -> Self {
        self.path = qualify(prefix, &self.path);
        if let Some(group) = self.mutex.take() {
            self.mutex.replace(qualify(prefix, &group));
        }
        self
    }

    // Defaults taken from a caller's record are converted the way a parsed value would be.
    pub(crate) fn set_default(&mut self, value: &Value) {
        let conformed = self
            .variants
            .iter()
            .find_map(|variant| variant.conform(value))
            .unwrap_or_else(|| value.clone());
        self.default.replace(conformed);
    }
}

impl Resolvable for Slot {
    fn label(&self) -> String {
        self.path.clone()
    }

    fn arity(&self) -> Arity {
        Slot::arity(self)
    }

    fn accepts(&self, tokens: &[String]) -> bool {
        Slot::accepts(self, tokens)
    }

    fn optional(&self) -> bool {
        self.default.is_some()
    }
}

pub(crate) fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{PATH_DELIMITER}{name}")
    }
}

pub(crate) fn relative<'p>(path: &'p str, prefix: &str) -> &'p str {
    if prefix.is_empty() {
        path
    } else {
        path.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(PATH_DELIMITER))
            .unwrap_or(path)
    }
}
