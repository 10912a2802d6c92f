//! Parsed values.
//!
//! The engine produces a [`Value`] tree mirroring the descriptor algebra: a
//! record for a sequence, a tagged variant for a choice, a list for a
//! repetition, and so on. Embedders either pattern-match the tree directly or
//! derive [`Syntax`](crate::Syntax) and get their own types back via
//! [`FromValue`].

use std::fmt;
use std::marker::PhantomData;

use crate::state::Location;

/// The dynamic counterpart of a grammar rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Bytes consumed by a literal or regex leaf, with the location they
    /// started at.
    Token { contents: Vec<u8>, at: Location },
    /// A numeric leaf.
    Number { value: f64, at: Location },
    /// A location capture. Consumes nothing.
    Mark { at: Location },
    /// A sequence: one entry per field, in field order.
    Record(Vec<(Option<String>, Value)>),
    /// A choice: the first alternative that succeeded.
    Variant {
        index: usize,
        name: String,
        value: Box<Value>,
    },
    /// A repetition: zero or more child values.
    List(Vec<Value>),
    /// An optional: the child value if it matched.
    Maybe(Option<Box<Value>>),
    /// The witness of a satisfied negative lookahead.
    Unit,
}

impl Value {
    /// Look up a named sequence field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields
                .iter()
                .find(|(field, _)| field.as_deref() == Some(name))
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

/// Rebuild a typed value from the engine's [`Value`] tree.
///
/// Implementations may assume the value has the shape their grammar rule
/// produces; a mismatch is an engine bug and panics.
pub trait FromValue: Sized {
    fn build(value: Value) -> Self;
}

/// The text consumed by a literal or regex leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub at: Location,
}

impl FromValue for Text {
    fn build(value: Value) -> Self {
        match value {
            Value::Token { contents, at } => Text {
                text: String::from_utf8_lossy(&contents).into_owned(),
                at,
            },
            other => panic!("internal error: expected token value, got {other:?}"),
        }
    }
}

/// A parsed number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Num {
    pub value: f64,
    pub at: Location,
}

impl FromValue for Num {
    fn build(value: Value) -> Self {
        match value {
            Value::Number { value, at } => Num { value, at },
            other => panic!("internal error: expected number value, got {other:?}"),
        }
    }
}

/// A captured location. Consumes no input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub at: Location,
}

impl FromValue for Mark {
    fn build(value: Value) -> Self {
        match value {
            Value::Mark { at } => Mark { at },
            other => panic!("internal error: expected mark value, got {other:?}"),
        }
    }
}

/// Positive lookahead: `T` must match here, but nothing is consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Ahead<T>(pub T);

impl<T: FromValue> FromValue for Ahead<T> {
    fn build(value: Value) -> Self {
        Ahead(T::build(value))
    }
}

/// Negative lookahead: `T` must *fail* to match here. Nothing is consumed
/// and no value is produced.
pub struct Never<T>(PhantomData<T>);

impl<T> fmt::Debug for Never<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Never")
    }
}

impl<T> Clone for Never<T> {
    fn clone(&self) -> Self {
        Never(PhantomData)
    }
}

impl<T> PartialEq for Never<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> FromValue for Never<T> {
    fn build(value: Value) -> Self {
        match value {
            Value::Unit => Never(PhantomData),
            other => panic!("internal error: expected unit value, got {other:?}"),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn build(value: Value) -> Self {
        match value {
            Value::List(items) => items.into_iter().map(T::build).collect(),
            other => panic!("internal error: expected list value, got {other:?}"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn build(value: Value) -> Self {
        match value {
            Value::Maybe(inner) => inner.map(|value| T::build(*value)),
            other => panic!("internal error: expected optional value, got {other:?}"),
        }
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn build(value: Value) -> Self {
        Box::new(T::build(value))
    }
}
