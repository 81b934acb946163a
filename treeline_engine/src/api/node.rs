use std::collections::HashSet;
use std::sync::Arc;

use crate::api::slot::qualify;
use crate::api::{OrderingPolicy, Slot, SlotKind, Variant};
use crate::constant::*;
use crate::dispatch::match_default;
use crate::model::Value;
use crate::parser::SpecificationError;

#[cfg(feature = "tracing_debug")]
use tracing::{debug, warn};

/// A set of slots (and nested subcommand families) matched together.
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use treeline::{ParserNode, Slot, Variant};
///
/// let node = ParserNode::new("Train")
///     .about("Train a model.")
///     .slot(Slot::positional("dataset", Variant::Str))
///     .slot(Slot::named("epochs", Variant::Int));
/// assert_eq!(node.slots().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParserNode {
    name: String,
    prefix: String,
    about: Option<String>,
    slots: Vec<Slot>,
    groups: Vec<MutexGroup>,
    families: Vec<SubcommandFamily>,
}

impl ParserNode {
    /// Create an empty node.
    /// The name is used as the record name of the constructed value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::default(),
            about: None,
            slots: Vec::default(),
            groups: Vec::default(),
            families: Vec::default(),
        }
    }

    /// Document the node.
    /// If repeated, only the final description will apply.
    pub fn about(mut self, description: impl Into<String>) -> Self {
        self.about.replace(description.into());
        self
    }

    /// Add a slot.
    ///
    /// The order of positional slots is their positional order during parsing.
    pub fn slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Declare a mutual-exclusion group.
    /// When `required`, exactly one member must be provided.
    pub fn mutex_group(mut self, id: impl Into<String>, required: bool) -> Self {
        self.groups.push(MutexGroup {
            id: id.into(),
            required,
        });
        self
    }

    /// Add a subcommand family.
    pub fn family(mut self, family: SubcommandFamily) -> Self {
        self.families.push(family);
        self
    }

    /// The node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dotted path every slot of this node is qualified with (empty at the root).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.about.as_deref()
    }

    /// The slots, in declaration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The mutual-exclusion groups.
    pub fn groups(&self) -> &[MutexGroup] {
        &self.groups
    }

    /// The subcommand families, in declaration order.
    pub fn families(&self) -> &[SubcommandFamily] {
        &self.families
    }

    pub(crate) fn positionals(&self) -> impl Iterator<Item = &Slot> {
        self.slots
            .iter()
            .filter(|slot| slot.kind() == SlotKind::Positional)
    }

    // Overwrite slot defaults (relative paths, before qualification) from a caller's default record.
    fn absorb_default(&mut self, value: &Value) {
        let record = match value.as_record() {
            Some(record) => record,
            None => return,
        };

        for slot in self.slots.iter_mut() {
            if let Some(field) = record.get_path(slot.path()) {
                slot.set_default(field);
            }
        }

        for family in self.families.iter_mut() {
            if family.default.is_none() {
                if let Some(field) = record.get_path(&family.path) {
                    family.default.replace(Arc::new(field.clone()));
                }
            }
        }
    }

    // The unbounded positionals that can be activated together with this node, taking the longest list per family.
    fn pooled_unbounded(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .positionals()
            .filter(|slot| slot.arity().is_unbounded())
            .map(|slot| slot.path().to_string())
            .collect();

        for family in &self.families {
            let mut widest: Vec<String> = Vec::default();

            for alternative in family.alternatives.iter().filter(|a| !a.placeholder) {
                let pooled = alternative.node.pooled_unbounded();

                if pooled.len() > widest.len() {
                    widest = pooled;
                }
            }

            out.extend(widest);
        }

        out
    }

    fn find_family(&self, path: &str) -> Option<&SubcommandFamily> {
        for family in &self.families {
            if family.path == path {
                return Some(family);
            }

            for alternative in &family.alternatives {
                if let Some(found) = alternative.node.find_family(path) {
                    return Some(found);
                }
            }
        }

        None
    }

    fn collect<'s>(&'s self, out: &mut Vec<&'s ParserNode>) {
        out.push(self);

        for family in &self.families {
            for alternative in family.alternatives.iter().filter(|a| !a.placeholder) {
                alternative.node.collect(out);
            }
        }
    }
}

/// A mutual-exclusion group of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexGroup {
    id: String,
    required: bool,
}

impl MutexGroup {
    /// The (qualified, once built) group id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether exactly one member must be provided.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// A set of named alternatives, exactly one of which is selected per parse.
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use std::sync::Arc;
/// use treeline::{Alternative, ParserNode, Record, Slot, SubcommandFamily, Value, Variant};
///
/// let adam_default = Arc::new(Value::Record(Record::new("Adam").with("lr", Value::Float(0.001))));
/// let family = SubcommandFamily::new("optimizer")
///     .alternative(
///         Alternative::new("adam", ParserNode::new("Adam").slot(Slot::named("lr", Variant::Float)))
///             .default(adam_default.clone()),
///     )
///     .alternative(Alternative::new("sgd", ParserNode::new("Sgd")))
///     .default(adam_default);
/// assert_eq!(family.choices(), vec!["adam", "sgd"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SubcommandFamily {
    path: String,
    alternatives: Vec<Alternative>,
    default: Option<Arc<Value>>,
    default_name: Option<String>,
}

impl SubcommandFamily {
    /// Create an empty family, placed at `path` in the constructed value.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alternatives: Vec::default(),
            default: None,
            default_name: None,
        }
    }

    /// Add an alternative.
    pub fn alternative(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(alternative);
        self
    }

    /// Supply the caller's default, from which the default branch is chosen.
    pub fn default(mut self, value: Arc<Value>) -> Self {
        self.default.replace(value);
        self
    }

    /// The (qualified, once built) dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Every alternative, including any internal placeholder.
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// The names of the selectable alternatives.
    pub fn choices(&self) -> Vec<&str> {
        self.alternatives
            .iter()
            .filter(|alternative| !alternative.placeholder)
            .map(|alternative| alternative.name.as_str())
            .collect()
    }

    /// The caller's default, if any.
    pub fn default_value(&self) -> Option<&Arc<Value>> {
        self.default.as_ref()
    }

    /// The default branch chosen when the tree was built, if any.
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Find a selectable alternative.
    pub fn find(&self, name: &str) -> Option<&Alternative> {
        self.alternatives
            .iter()
            .find(|alternative| !alternative.placeholder && alternative.name == name)
    }

    pub(crate) fn default_alternative(&self) -> Option<&Alternative> {
        self.default_name.as_deref().and_then(|name| self.find(name))
    }
}

/// One named alternative of a [`SubcommandFamily`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    name: String,
    node: Arc<ParserNode>,
    default: Option<Arc<Value>>,
    placeholder: bool,
}

impl Alternative {
    /// Create an alternative.
    pub fn new(name: impl Into<String>, node: ParserNode) -> Self {
        Self {
            name: name.into(),
            node: Arc::new(node),
            default: None,
            placeholder: false,
        }
    }

    fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_NAME.to_string(),
            node: Arc::new(ParserNode::new(PLACEHOLDER_NAME)),
            default: None,
            placeholder: true,
        }
    }

    /// Record this alternative's own default instance.
    pub fn default(mut self, value: Arc<Value>) -> Self {
        self.default.replace(value);
        self
    }

    /// The selector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nested node.
    pub fn node(&self) -> &ParserNode {
        &self.node
    }

    /// The recorded default instance, if any.
    pub fn default_value(&self) -> Option<&Arc<Value>> {
        self.default.as_ref()
    }

    /// Whether this is an internal placeholder (never selectable, never displayed).
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// The immutable specification tree.
///
/// Built once via [`SpecTree::build`]; cheap to clone and safe to share between parses.
#[derive(Debug, Clone)]
pub struct SpecTree {
    root: Arc<ParserNode>,
    warnings: Vec<SpecificationError>,
}

impl SpecTree {
    /// Qualify, validate and finalize the tree rooted at `root`.
    ///
    /// ### Example
    /// ```
    /// # use treeline_engine as treeline;
    /// use treeline::{ParserNode, Slot, SpecTree, SpecificationError, Variant};
    ///
    /// let root = ParserNode::new("Root")
    ///     .slot(Slot::named("lr", Variant::Float))
    ///     .slot(Slot::named("lr", Variant::Int));
    /// assert!(matches!(
    ///     SpecTree::build(root),
    ///     Err(SpecificationError::DuplicateSlot { .. })
    /// ));
    /// ```
    pub fn build(root: ParserNode) -> Result<Self, SpecificationError> {
        let mut warnings = Vec::default();
        let root = build_node(root, "", &mut warnings)?;

        Ok(Self {
            root: Arc::new(root),
            warnings,
        })
    }

    /// Check the tree may be matched under `policy`.
    ///
    /// The consolidated policies resolve the positional slots of every activated node as one run, so at most one unbounded positional slot may be activated at once.
    /// Called by [`parse`](crate::parse) and [`ParseConfig::build_engine`](crate::ParseConfig::build_engine) before any token is read.
    ///
    /// ### Example
    /// ```
    /// # use treeline_engine as treeline;
    /// use treeline::{Alternative, OrderingPolicy, ParserNode, Slot, SpecTree, SubcommandFamily, Variant};
    ///
    /// let tree = SpecTree::build(
    ///     ParserNode::new("Root")
    ///         .slot(Slot::positional("xs", Variant::list(Variant::Int)))
    ///         .family(SubcommandFamily::new("command").alternative(Alternative::new(
    ///             "child",
    ///             ParserNode::new("Child").slot(Slot::positional("ys", Variant::list(Variant::Int))),
    ///         ))),
    /// )
    /// .unwrap();
    /// assert!(tree.validate_for(OrderingPolicy::Strict).is_ok());
    /// assert!(tree.validate_for(OrderingPolicy::Consolidated).is_err());
    /// ```
    pub fn validate_for(&self, policy: OrderingPolicy) -> Result<(), SpecificationError> {
        if !policy.is_consolidated() {
            return Ok(());
        }

        let unbounded = self.root.pooled_unbounded();

        if unbounded.len() > 1 {
            return Err(SpecificationError::OverlappingUnbounded { slots: unbounded });
        }

        Ok(())
    }

    /// The root node.
    pub fn root(&self) -> &ParserNode {
        &self.root
    }

    /// Problems recorded (but tolerated) while building.
    pub fn warnings(&self) -> &[SpecificationError] {
        &self.warnings
    }

    pub(crate) fn find_family(&self, path: &str) -> Option<&SubcommandFamily> {
        self.root.find_family(path)
    }

    /// Every selectable node, pre-order.
    pub(crate) fn nodes(&self) -> Vec<&ParserNode> {
        let mut out = Vec::default();
        self.root.collect(&mut out);
        out
    }
}

fn build_node(
    node: ParserNode,
    prefix: &str,
    warnings: &mut Vec<SpecificationError>,
) -> Result<ParserNode, SpecificationError> {
    let ParserNode {
        name,
        prefix: _,
        about,
        slots,
        groups,
        families,
    } = node;
    let node_label = if prefix.is_empty() {
        name.clone()
    } else {
        prefix.to_string()
    };
    let groups: Vec<MutexGroup> = groups
        .into_iter()
        .map(|group| MutexGroup {
            id: qualify(prefix, &group.id),
            required: group.required,
        })
        .collect();
    let mut members: HashSet<String> = HashSet::default();
    let mut flags: HashSet<String> = HashSet::default();
    let mut unbounded: Vec<String> = Vec::default();
    let mut qualified_slots = Vec::default();

    for slot in slots.into_iter() {
        validate_path(slot.path())?;

        if !members.insert(slot.path().to_string()) {
            return Err(SpecificationError::DuplicateSlot {
                node: node_label,
                slot: slot.path().to_string(),
            });
        }

        if slot.arity().is_empty() || slot.variants().iter().any(is_empty_variant) {
            return Err(SpecificationError::EmptyVariants {
                slot: qualify(prefix, slot.path()),
            });
        }

        let slot = slot.qualify(prefix);

        if let Some(parts) = slot
            .variants()
            .iter()
            .find_map(|variant| overlapping_parts(variant, slot.path()))
        {
            return Err(SpecificationError::OverlappingUnbounded { slots: parts });
        }

        if let Some(group) = slot.mutex_group() {
            if !groups.iter().any(|g| g.id == group) {
                return Err(SpecificationError::UnknownMutexGroup {
                    slot: slot.path().to_string(),
                    group: group.to_string(),
                });
            }
        }

        for flag in slot.flags().into_iter().chain(slot.inverse_flag()) {
            validate_flag(&flag)?;

            if !flags.insert(flag.clone()) {
                return Err(SpecificationError::DuplicateFlag {
                    node: node_label,
                    flag,
                });
            }
        }

        if slot.kind() == SlotKind::Positional && slot.arity().is_unbounded() {
            unbounded.push(slot.path().to_string());
        }

        qualified_slots.push(slot);
    }

    if unbounded.len() > 1 {
        return Err(SpecificationError::OverlappingUnbounded { slots: unbounded });
    }

    let mut built_families = Vec::default();

    for family in families.into_iter() {
        validate_path(&family.path)?;

        let collides = members.iter().any(|member| {
            member == &family.path
                || member.starts_with(&format!("{}{PATH_DELIMITER}", family.path))
                || family.path.starts_with(&format!("{member}{PATH_DELIMITER}"))
        });

        if collides || !members.insert(family.path.clone()) {
            return Err(SpecificationError::DuplicateSlot {
                node: node_label,
                slot: qualify(prefix, &family.path),
            });
        }

        built_families.push(build_family(family, prefix, warnings)?);
    }

    Ok(ParserNode {
        name,
        prefix: prefix.to_string(),
        about,
        slots: qualified_slots,
        groups,
        families: built_families,
    })
}

fn build_family(
    family: SubcommandFamily,
    prefix: &str,
    warnings: &mut Vec<SpecificationError>,
) -> Result<SubcommandFamily, SpecificationError> {
    let SubcommandFamily {
        path,
        alternatives,
        default,
        default_name: _,
    } = family;
    let path = qualify(prefix, &path);

    if alternatives.is_empty() {
        return Err(SpecificationError::EmptyFamily { family: path });
    }

    let mut registered: Vec<Alternative> = Vec::default();

    for alternative in alternatives.into_iter() {
        validate_name(&alternative.name)?;

        match registered
            .iter_mut()
            .find(|existing| existing.name == alternative.name)
        {
            Some(existing) => {
                let warning = SpecificationError::DuplicateAlternative {
                    family: path.clone(),
                    alternative: alternative.name.clone(),
                };
                #[cfg(feature = "tracing_debug")]
                {
                    warn!("{warning}");
                }
                warnings.push(warning);
                *existing = alternative;
            }
            None => registered.push(alternative),
        }
    }

    let default_name = match &default {
        Some(value) => {
            let index = match_default(&path, &registered, value)?;
            Some(registered[index].name.clone())
        }
        None => None,
    };

    let mut built = Vec::default();

    for alternative in registered.into_iter() {
        let Alternative {
            name,
            node,
            default: recorded,
            placeholder,
        } = alternative;
        let mut node = Arc::try_unwrap(node).unwrap_or_else(|shared| (*shared).clone());

        if default_name.as_ref() == Some(&name) {
            if let Some(value) = &default {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("Family '{path}' defaults to '{name}'; absorbing its field defaults.");
                }
                node.absorb_default(value);
            }
        }

        let node = build_node(node, &path, warnings)?;
        built.push(Alternative {
            name,
            node: Arc::new(node),
            default: recorded,
            placeholder,
        });
    }

    if built.len() == 1 {
        built.push(Alternative::placeholder());
    }

    Ok(SubcommandFamily {
        path,
        alternatives: built,
        default,
        default_name,
    })
}

fn is_empty_variant(variant: &Variant) -> bool {
    match variant {
        Variant::Choice(choices) => choices.is_empty(),
        Variant::Tuple(parts) => parts.is_empty() || parts.iter().any(is_empty_variant),
        Variant::List(item) => is_empty_variant(item),
        _ => false,
    }
}

// The parts of a tuple are resolved as one run, so at most one of them may be unbounded.
fn overlapping_parts(variant: &Variant, label: &str) -> Option<Vec<String>> {
    match variant {
        Variant::Tuple(parts) => {
            let unbounded: Vec<String> = parts
                .iter()
                .enumerate()
                .filter(|(_, part)| part.arity().is_unbounded())
                .map(|(index, _)| format!("{label}[{index}]"))
                .collect();

            if unbounded.len() > 1 {
                return Some(unbounded);
            }

            parts
                .iter()
                .enumerate()
                .find_map(|(index, part)| overlapping_parts(part, &format!("{label}[{index}]")))
        }
        Variant::List(item) => overlapping_parts(item, label),
        _ => None,
    }
}

fn validate_name(name: &str) -> Result<(), SpecificationError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.starts_with('-') {
        Some("must not start with '-'")
    } else if name.contains(SELECTOR_DELIMITER) {
        Some("must not contain ':'")
    } else if name.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SpecificationError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_path(path: &str) -> Result<(), SpecificationError> {
    validate_name(path)?;

    if path.split(PATH_DELIMITER).any(str::is_empty) {
        return Err(SpecificationError::InvalidName {
            name: path.to_string(),
            reason: "must not contain an empty path segment".to_string(),
        });
    }

    Ok(())
}

fn validate_flag(flag: &str) -> Result<(), SpecificationError> {
    let valid = match flag.strip_prefix("--") {
        Some(long) => {
            !long.is_empty() && !long.contains('=') && !long.chars().any(char::is_whitespace)
        }
        None => match flag.strip_prefix('-') {
            Some(short) => {
                let mut chars = short.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c != '-' && c != '=' && !c.is_ascii_digit())
            }
            None => false,
        },
    };

    if valid {
        Ok(())
    } else {
        Err(SpecificationError::InvalidName {
            name: flag.to_string(),
            reason: "flags must be '-<char>' or '--<name>'".to_string(),
        })
    }
}
