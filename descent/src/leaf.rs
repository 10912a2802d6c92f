//! Leaf parsers: the primitives that actually consume bytes.
//!
//! Everything above a leaf is pure combinator structure; a [`Leaf`] is where
//! the source gets read. Four built-ins are registered on every
//! [`Grammar`](crate::Grammar): `literal`, `regex`, `number` and `location`.
//! Embedders can register their own under a name of their choosing.

use std::cell::RefCell;
use std::rc::Rc;
use std::str;

use regex_automata::meta::Regex;
use regex_automata::{Anchored, Input};
use rustc_hash::FxHashMap;

use crate::error::Reject;
use crate::state::State;
use crate::value::Value;

/// A pluggable primitive.
///
/// `tag` is the configuration string the rule was constructed with (the
/// literal text for `literal`, the pattern for `regex`). The contract: on
/// failure return a [`Reject`] and report no advance; on success the engine
/// advances the cursor by exactly the returned amount. A leaf may also raise
/// a commit via [`Reject::Commit`].
pub trait Leaf {
    fn consume(&self, state: &State<'_>, tag: Option<&str>) -> Result<(Value, usize), Reject>;
}

/// Compiled patterns, shared between the grammar builder and the regex leaf
/// so each pattern compiles once per grammar. An invalid pattern is a
/// configuration error and panics.
#[derive(Default)]
pub(crate) struct RegexCache {
    map: RefCell<FxHashMap<String, Rc<Regex>>>,
}

impl RegexCache {
    pub fn compile(&self, pattern: &str) -> Rc<Regex> {
        if let Some(re) = self.map.borrow().get(pattern) {
            return re.clone();
        }
        let re = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("invalid regex pattern {pattern:?}: {err}"));
        let re = Rc::new(re);
        self.map
            .borrow_mut()
            .insert(pattern.to_string(), re.clone());
        re
    }
}

/// Matches its tag byte-for-byte.
pub(crate) struct LiteralLeaf;

impl Leaf for LiteralLeaf {
    fn consume(&self, state: &State<'_>, tag: Option<&str>) -> Result<(Value, usize), Reject> {
        let literal = tag.unwrap_or_else(|| panic!("literal rule has no tag"));
        let expected = literal.as_bytes();
        let rest = state.rest();
        if rest.len() < expected.len() || &rest[..expected.len()] != expected {
            return Err(Reject::Soft(format!("Expected {literal:?}")));
        }
        Ok((
            Value::Token {
                contents: expected.to_vec(),
                at: state.location(),
            },
            expected.len(),
        ))
    }
}

/// Matches its tag as a regex anchored at the cursor.
///
/// A zero-length anchored match counts as success.
pub(crate) struct RegexLeaf {
    pub cache: Rc<RegexCache>,
}

impl Leaf for RegexLeaf {
    fn consume(&self, state: &State<'_>, tag: Option<&str>) -> Result<(Value, usize), Reject> {
        let pattern = tag.unwrap_or_else(|| panic!("regex rule has no tag"));
        let re = self.cache.compile(pattern);
        let input = Input::new(state.rest()).anchored(Anchored::Yes);
        match re.find(input) {
            Some(m) => Ok((
                Value::Token {
                    contents: state.rest()[..m.end()].to_vec(),
                    at: state.location(),
                },
                m.end(),
            )),
            None => Err(Reject::Soft(format!(
                "expected string to match regex {pattern:?}"
            ))),
        }
    }
}

// Matches 4e6, -4.e7, .6E20, -0e0. Doesn't match .e7.
const NUMBER_PATTERN: &str =
    r"-?[0-9]+\.?[0-9]*([eE]-?[0-9]+)?|-?[0-9]*\.?[0-9]+([eE]-?[0-9]+)?";

/// Matches the first occurrence of a numeric lexeme in the remaining input
/// and advances by the match length. Needs no tag.
pub(crate) struct NumberLeaf {
    regex: Regex,
}

impl NumberLeaf {
    pub fn new() -> Self {
        let regex = Regex::new(NUMBER_PATTERN).expect("internal error: number pattern compiles");
        Self { regex }
    }
}

impl Leaf for NumberLeaf {
    fn consume(&self, state: &State<'_>, _tag: Option<&str>) -> Result<(Value, usize), Reject> {
        let rest = state.rest();
        let Some(m) = self.regex.find(rest) else {
            return Err(Reject::Soft("expected number".to_string()));
        };
        let text = str::from_utf8(&rest[m.range()]).expect("internal error: number lexeme is ascii");
        match text.parse::<f64>() {
            Ok(value) => Ok((
                Value::Number {
                    value,
                    at: state.location(),
                },
                m.len(),
            )),
            Err(err) => Err(Reject::Soft(format!("expected number but {err}"))),
        }
    }
}

/// Captures the current location without consuming anything. Never fails.
pub(crate) struct MarkLeaf;

impl Leaf for MarkLeaf {
    fn consume(&self, state: &State<'_>, _tag: Option<&str>) -> Result<(Value, usize), Reject> {
        Ok((
            Value::Mark {
                at: state.location(),
            },
            0,
        ))
    }
}
