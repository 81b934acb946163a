use crate::api::{ParserNode, SpecTree};
use crate::parser::{ConsoleInterface, Engine, SpecificationError, UserInterface};

/// Which token-to-slot visibility rules apply to a parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrderingPolicy {
    /// One left-to-right pass.
    /// A node's flags only become visible once its selector has been consumed, so flags are position sensitive.
    #[default]
    Strict,
    /// Selectors are located up front; flags may appear before, between or after them.
    Consolidated,
    /// Consolidated, and the slots of implicitly selected default branches are also visible.
    Cascading,
}

impl OrderingPolicy {
    pub(crate) fn is_consolidated(&self) -> bool {
        !matches!(self, OrderingPolicy::Strict)
    }
}

/// The explicit configuration threaded through every parse.
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use treeline::{OrderingPolicy, ParseConfig};
///
/// let config = ParseConfig::new("program")
///     .policy(OrderingPolicy::Cascading)
///     .help(false);
/// assert_eq!(config.program(), "program");
/// assert!(!config.is_help_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfig {
    program: String,
    policy: OrderingPolicy,
    help: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self::new("program")
    }
}

impl ParseConfig {
    /// Create a configuration with the [`OrderingPolicy::Strict`] policy and `-h`/`--help` reserved.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            policy: OrderingPolicy::default(),
            help: true,
        }
    }

    /// Select the ordering policy.
    pub fn policy(mut self, policy: OrderingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether `-h`/`--help` is the reserved help short-circuit token.
    pub fn help(mut self, enabled: bool) -> Self {
        self.help = enabled;
        self
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The selected ordering policy.
    pub fn ordering(&self) -> OrderingPolicy {
        self.policy
    }

    /// Whether the help token is reserved.
    pub fn is_help_enabled(&self) -> bool {
        self.help
    }

    fn build_with_interface(
        self,
        root: ParserNode,
        user_interface: Box<dyn UserInterface>,
    ) -> Result<Engine, SpecificationError> {
        let tree = SpecTree::build(root)?;
        tree.validate_for(self.policy)?;

        for warning in tree.warnings() {
            user_interface.print_warning(warning.to_string());
        }

        Ok(Engine::new(tree, self, user_interface))
    }

    /// Build the engine as a Result.
    /// This builds the specification tree and checks it for errors (ex: a duplicated flag).
    pub fn build_engine(self, root: ParserNode) -> Result<Engine, SpecificationError> {
        self.build_with_interface(root, Box::new(ConsoleInterface::default()))
    }

    /// Build the engine.
    /// This builds the specification tree and checks it for errors (ex: a duplicated flag).
    /// If an error is encountered, exits with error code `1` (via [`std::process::exit`]).
    pub fn build(self, root: ParserNode) -> Engine {
        match self.build_engine(root) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    /// *Available using 'unit_test' crate feature only.*</br></br>
    /// Build an engine which prints nothing, for use in testing.
    ///
    /// ### Example
    /// ```
    /// # use treeline_engine as treeline;
    /// use treeline::{ParseConfig, ParserNode, Slot, Value, Variant};
    ///
    /// let engine = ParseConfig::new("program")
    ///     .build_silent(ParserNode::new("Root").slot(Slot::positional("value", Variant::Int)))
    ///     .unwrap();
    /// assert_eq!(engine.parse_tokens(&["abc"]), Err(1));
    /// assert!(engine.parse_tokens(&["2"]).is_ok());
    /// ```
    #[cfg(feature = "unit_test")]
    pub fn build_silent(self, root: ParserNode) -> Result<Engine, SpecificationError> {
        self.build_with_interface(root, Box::new(crate::parser::SilentInterface::default()))
    }

    #[cfg(test)]
    pub(crate) fn build_test(
        self,
        root: ParserNode,
        user_interface: Box<dyn UserInterface>,
    ) -> Result<Engine, SpecificationError> {
        self.build_with_interface(root, user_interface)
    }
}
