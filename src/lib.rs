//! `treeline` turns command line tokens into a nested, typed value, driven by a declarative specification tree.
//!
//! The specification tree describes what a program accepts: *slots* (each with an arity and one or more value *variants*), grouped into *parser nodes*, with *subcommand families* choosing between alternative nodes.
//! `treeline` does not derive this tree from your types; you (or a reflection layer) build it, and `treeline` does the rest:
//! * *Arity resolution*:
//! Adjacent positional slots may each admit several token counts (ex: 2 or 3 tokens).
//! The boundaries between them are found by a backtracking search, preferring the smallest count first, and only settling once every slot fits.
//! * *Subcommand dispatch*:
//! Selector tokens (`family:alternative`, or just `alternative` while only one family awaits selection) activate nested nodes.
//! Families with a default activate their default branch when no selector is given.
//! * *Ordering policies*:
//! In [`OrderingPolicy::Strict`] mode a subcommand's flags are only visible after its selector.
//! [`OrderingPolicy::Consolidated`] mode locates every selector up front, so flags may appear anywhere.
//! [`OrderingPolicy::Cascading`] additionally exposes the flags of implicitly selected default branches.
//! * *Structural defaults*:
//! A family's default may be given as a value; `treeline` finds the alternative it came from, first by identity, then by equality, and lastly by shape.
//! * *Complete error reports*:
//! Every independent problem in the input is reported at once, rather than stopping at the first.
//!
//! # Usage
//! ```no_run
#![doc = include_str!("../demos/demo_train.rs")]
//! ```
//!
//! ```console
//! $ train -h
//! usage: train [-h] DATASET [--epochs EPOCHS] [--verbose] {adam,sgd}
//!
//! Train a model.
//!
//! positional arguments:
//!  DATASET   The dataset to train on. [str]
//!
//! options:
//!  -h, --help        Show this help message and exit.
//!  --epochs EPOCHS   [int] (default: 10)
//!  --verbose, -v     (default: 0)
//!
//! subcommands:
//!  optimizer:ALTERNATIVE   Select one of {adam,sgd} (default: adam).
//!
//! $ train mnist sgd --optimizer.momentum 0.9
//! Train(dataset="mnist", epochs=10, verbose=0, optimizer=Sgd(lr=0.1, momentum=0.9))
//!
//! $ train --bogus optimizer:sgd --optimizer.lr
//! Parse error: unknown flag '--bogus'.
//! Parse error: missing required 'dataset'.
//! Parse error: too few values provided for 'optimizer.lr' (provided=0, expected=1).
//! ```
//!
//! # Specification tree
//! A tree is built from a root [`ParserNode`] via [`SpecTree::build`] (or, more commonly, [`ParseConfig::build`]).
//! Building qualifies every slot with its ancestors' paths (the `lr` slot of the `optimizer` family is addressed as `--optimizer.lr`), and checks the tree for errors.
//! These are reported as a [`SpecificationError`], before any token is read.
//!
//! ### Slots
//! * [`Slot::positional`]: matched by position.
//! The positional slots of the activated nodes form one run, whose boundaries the arity resolver decides.
//! * [`Slot::named`]: matched by flag, `--path value` or `--path=value`.
//! * [`Slot::flag`]: a boolean switch, `--path` (`true`) and `--no-path` (`false`).
//! * [`Slot::counter`]: counts its occurrences (ex: `-vvv`).
//!
//! A slot with a [`Slot::default`] is optional.
//! Slots may be placed in a mutual-exclusion group declared via [`ParserNode::mutex_group`].
//!
//! ### Variants
//! Each slot lists one or more [`Variant`]s, tried in order.
//! The arity of a slot is the union of its variants' arities.
//! For example, `Slot::positional("pair", Variant::tuple([Variant::Int, Variant::Int])).or(Variant::tuple([Variant::Int, Variant::Int, Variant::Int]))` consumes 2 or 3 tokens.
//!
//! ### Subcommand families
//! A [`SubcommandFamily`] groups [`Alternative`]s.
//! Exactly one alternative per reachable family is activated per parse, either by its selector token or as the family's default.
//! The constructed value places the activated alternative's record at the family's path.
//!
//! # Errors
//! [`parse`] returns an [`EngineError`]:
//! * [`EngineError::Specification`]: the tree is malformed (a bug in the caller).
//! * [`EngineError::Parse`]: the input is invalid; the [`ErrorReport`] lists every problem found.
//! * [`EngineError::Internal`]: the engine reached a state it forbids (a bug in `treeline`).
//!
//! The [`Engine`] embedding boundary prints the report and exits instead (see [`Engine::parse`]).
//!
//! # Features
//! * `unit_test`: For features that help with unit testing.
//! * `tracing_debug`: Emit `tracing::debug!` events while matching (resolver choices, selector activations, default branches).
pub use treeline_engine::*;
