//! A type-directed PEG parser with packrat memoization.
//!
//! A grammar is data: a [`Grammar`] holds rule descriptors (sequence,
//! ordered choice, repetition, optional, positive and negative lookahead,
//! and pluggable leaves) and the engine interprets them over a byte source
//! with PEG semantics. Every attempt is memoized, so parse time is linear in
//! the source for a fixed grammar, and left recursion is detected instead of
//! overflowing the stack.
//!
//! The shape of a Rust type can *be* the grammar. Deriving [`Syntax`] turns a
//! struct into a sequence and an enum into an ordered choice, with `Vec`,
//! `Option`, [`Ahead`] and [`Never`] fields mapping to repetition, optional
//! and the two lookaheads:
//!
//! ```
//! use descent::{Parser, Syntax, Text};
//!
//! #[derive(Syntax)]
//! struct Greeting {
//!     #[syntax(literal = "hello ")]
//!     hello: Text,
//!     #[syntax(regex = "[a-z]+")]
//!     name: Text,
//! }
//!
//! let parser = Parser::<Greeting>::new();
//! let greeting = parser.parse("hello world").unwrap();
//! assert_eq!(greeting.name.text, "world");
//! ```
//!
//! Errors carry a 1-origin `line:column` location. Grammars that know what
//! they are parsing can upgrade a deep failure into a *commit*, a fatal,
//! non-backtracking error that earlier parts of the parse may annotate, via
//! the [`Verify`], [`OnFailed`] and [`Annotate`] hooks.

mod engine;
pub mod error;
pub mod grammar;
pub mod hooks;
pub mod leaf;
mod memo;
pub mod state;
pub mod value;

pub use descent_macros::Syntax;

pub use crate::error::{CommitPayload, Error, Reject};
pub use crate::grammar::{Field, Grammar, LeafId, RuleId};
pub use crate::hooks::{Annotate, OnFailed, Verify};
pub use crate::leaf::Leaf;
pub use crate::state::{Location, State};
pub use crate::value::{Ahead, FromValue, Mark, Never, Num, Text, Value};

/// A type whose shape is a grammar rule.
///
/// Usually implemented with `#[derive(Syntax)]`. `register` adds the type's
/// rule to a grammar (via [`Grammar::rule_of`], which breaks recursive
/// cycles); `build` rebuilds the typed value from the engine's output.
pub trait Syntax: FromValue {
    fn register(grammar: &mut Grammar) -> RuleId;
}

impl Syntax for Num {
    fn register(grammar: &mut Grammar) -> RuleId {
        grammar.number()
    }
}

impl Syntax for Mark {
    fn register(grammar: &mut Grammar) -> RuleId {
        grammar.location()
    }
}

impl<T: Syntax + 'static> Syntax for Vec<T> {
    fn register(grammar: &mut Grammar) -> RuleId {
        let child = grammar.rule_of::<T>();
        grammar.repeat(child)
    }
}

impl<T: Syntax + 'static> Syntax for Option<T> {
    fn register(grammar: &mut Grammar) -> RuleId {
        let child = grammar.rule_of::<T>();
        grammar.optional(child)
    }
}

impl<T: Syntax + 'static> Syntax for Box<T> {
    fn register(grammar: &mut Grammar) -> RuleId {
        grammar.rule_of::<T>()
    }
}

impl<T: Syntax + 'static> Syntax for Ahead<T> {
    fn register(grammar: &mut Grammar) -> RuleId {
        let child = grammar.rule_of::<T>();
        grammar.ahead(child)
    }
}

/// A parser for a [`Syntax`] type: the type's grammar, built once.
pub struct Parser<T> {
    grammar: Grammar,
    root: RuleId,
    marker: std::marker::PhantomData<T>,
}

impl<T: Syntax + 'static> Parser<T> {
    pub fn new() -> Self {
        Self::with_grammar(Grammar::new())
    }

    /// Build on a pre-seeded grammar. Use this when the grammar needs
    /// embedder leaves registered before the type's rules refer to them.
    pub fn with_grammar(mut grammar: Grammar) -> Self {
        let root = grammar.rule_of::<T>();
        Self {
            grammar,
            root,
            marker: std::marker::PhantomData,
        }
    }

    pub fn parse(&self, source: &str) -> Result<T, Error> {
        self.parse_bytes(source.as_bytes())
    }

    pub fn parse_bytes(&self, source: &[u8]) -> Result<T, Error> {
        self.grammar.parse(self.root, source).map(T::build)
    }
}

impl<T: Syntax + 'static> Default for Parser<T> {
    fn default() -> Self {
        Self::new()
    }
}
