use std::env;
use std::fmt;

use crate::api::{ParseConfig, SpecTree};
use crate::model::Value;
use crate::parser::base::*;
use crate::parser::construct::construct;
use crate::parser::interface::UserInterface;
use crate::parser::ordering::{resolve_tokens, Resolution};
use crate::parser::printer::Printer;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

/// The outcome of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// The constructed value, shaped like the activated part of the specification tree.
    Value(Value),
    /// The help token was encountered; matching stopped there.
    Help {
        /// The explicit selectors consumed before the help token, root to leaf (ex: `optimizer:adam`).
        path: Vec<String>,
    },
}

/// Match `tokens` against `tree` and construct the resulting value.
///
/// This is the library entry point: nothing is printed, and the process is never terminated.
/// Parse errors are aggregated, so a single call reports every independent problem in the input.
/// The tree is first checked against the configured ordering policy (see [`SpecTree::validate_for`]).
///
/// ### Example
/// ```
/// # use treeline_engine as treeline;
/// use treeline::{parse, ParseConfig, Parsed, ParserNode, Slot, SpecTree, Value, Variant};
///
/// let tree = SpecTree::build(
///     ParserNode::new("Root")
///         .slot(Slot::positional("dataset", Variant::Str))
///         .slot(Slot::named("lr", Variant::Float).default(Value::Float(0.1))),
/// )
/// .unwrap();
///
/// let parsed = parse(&tree, &["mnist", "--lr", "0.5"], &ParseConfig::default()).unwrap();
/// match parsed {
///     Parsed::Value(value) => {
///         let record = value.as_record().unwrap();
///         assert_eq!(record.get("dataset"), Some(&Value::str("mnist")));
///         assert_eq!(record.get("lr"), Some(&Value::Float(0.5)));
///     }
///     Parsed::Help { .. } => unreachable!(),
/// }
/// ```
pub fn parse(tree: &SpecTree, tokens: &[&str], config: &ParseConfig) -> Result<Parsed, EngineError> {
    tree.validate_for(config.ordering())?;
    let tokens: Vec<String> = tokens.iter().map(|token| token.to_string()).collect();

    match resolve_tokens(tree, &tokens, config)? {
        Resolution::Help { path } => {
            #[cfg(feature = "tracing_debug")]
            {
                debug!("Help requested at {path:?}.");
            }

            Ok(Parsed::Help { path })
        }
        Resolution::Complete {
            dispatcher,
            bindings,
        } => Ok(Parsed::Value(construct(&dispatcher, &bindings)?)),
    }
}

/// The configured command line engine.
/// Built via [`ParseConfig::build`] or [`ParseConfig::build_engine`].
pub struct Engine {
    tree: SpecTree,
    config: ParseConfig,
    user_interface: Box<dyn UserInterface>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("tree", &self.tree)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub(crate) fn new(
        tree: SpecTree,
        config: ParseConfig,
        user_interface: Box<dyn UserInterface>,
    ) -> Self {
        Self {
            tree,
            config,
            user_interface,
        }
    }

    /// The specification tree this engine parses against.
    pub fn tree(&self) -> &SpecTree {
        &self.tree
    }

    /// The configuration threaded through every parse.
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Run the engine against the input tokens.
    ///
    /// Parsing happens in two phases:
    /// 1. Token matching aligns the tokens to the slots of the activated nodes.
    /// Every problem found is collected; if there are any, the full report is printed and no value is constructed.
    /// 2. Construction builds the nested value from the matched tokens and the defaults.
    ///
    /// If the input has any problem (ex: an unknown flag, a missing subcommand, etc), the report is printed and this returns with `Err(1)`.
    ///
    /// If the help switch (`-h` or `--help`) is encountered, the engine will display the help message and return with `Err(0)`.
    pub fn parse_tokens(&self, tokens: &[&str]) -> Result<Value, i32> {
        match parse(&self.tree, tokens, &self.config) {
            Ok(Parsed::Value(value)) => Ok(value),
            Ok(Parsed::Help { path }) => {
                Printer::terminal(&self.tree, &self.config, &path)
                    .print_help(&*self.user_interface);
                Err(0)
            }
            Err(EngineError::Parse(report)) => {
                for error in report.errors() {
                    self.user_interface.print_error(error.to_string());
                }

                Err(1)
            }
            Err(error) => {
                self.user_interface.print_error(error.to_string());
                Err(1)
            }
        }
    }

    /// Run the engine against the Cli [`env::args`].
    ///
    /// Behaves like [`Engine::parse_tokens`], except on failure it exits with the error code (via [`std::process::exit`]).
    pub fn parse(&self) -> Value {
        let command_input: Vec<String> = env::args().skip(1).collect();

        match self.parse_tokens(
            command_input
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .as_slice(),
        ) {
            Ok(value) => value,
            Err(exit_code) => std::process::exit(exit_code),
        }
    }
}
