//! Parse errors and the commit channel.
//!
//! The engine distinguishes two failure kinds. An [`Error`] is an ordinary
//! backtracking failure: the nearest enclosing choice, optional or repetition
//! catches it and tries something else. A commit ([`Reject::Commit`]) is
//! final: it unwinds through every combinator without being caught, picking
//! up annotations from already-parsed sequence fields on the way out.

use std::any::Any;
use std::fmt;

use crate::state::Location;

/// A located parse error.
///
/// Rendered as `{message} at {line}:{column}`, 1-origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// What was expected or what went wrong.
    pub message: String,
    /// Where the failure occurred.
    pub at: Location,
}

impl Error {
    pub fn new(message: impl Into<String>, at: Location) -> Self {
        Self {
            message: message.into(),
            at,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.at)
    }
}

impl std::error::Error for Error {}

/// The payload a commit carries up through the parse.
///
/// Annotators match on the concrete payload type via [`as_any`], and the
/// entry facade calls [`render`] to produce the final message: strings render
/// verbatim, [`Error`] payloads render via their message, and marker types
/// render however they choose.
///
/// [`as_any`]: CommitPayload::as_any
/// [`render`]: CommitPayload::render
pub trait CommitPayload: Any {
    fn as_any(&self) -> &dyn Any;

    fn render(&self) -> String;
}

impl CommitPayload for String {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl CommitPayload for &'static str {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl CommitPayload for Error {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

/// A rejection raised by a [`Verify`] hook or a [`Leaf`] parser.
///
/// `Soft` is a backtrackable failure; the location is attached by the engine
/// at the point of failure. `Commit` is final and skips every remaining
/// alternative on the way out.
///
/// [`Verify`]: crate::hooks::Verify
/// [`Leaf`]: crate::leaf::Leaf
pub enum Reject {
    Soft(String),
    Commit(Box<dyn CommitPayload>),
}

impl Reject {
    /// A backtrackable failure with the given message.
    pub fn soft(message: impl Into<String>) -> Self {
        Reject::Soft(message.into())
    }

    /// A non-backtracking commit carrying `payload`.
    pub fn commit(payload: impl CommitPayload) -> Self {
        Reject::Commit(Box::new(payload))
    }
}

impl fmt::Debug for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reject::Soft(message) => f.debug_tuple("Soft").field(message).finish(),
            Reject::Commit(payload) => f.debug_tuple("Commit").field(&payload.render()).finish(),
        }
    }
}

/// A commit in flight: the payload plus the location stamped when it was
/// raised. The location is captured exactly once; annotators only replace
/// the payload.
pub(crate) struct Fatal {
    pub payload: Box<dyn CommitPayload>,
    pub at: Location,
}

/// Internal result branch threaded through every engine recursion.
pub(crate) enum Failure {
    Error(Error),
    Commit(Fatal),
}

pub(crate) type ParseResult<T> = Result<T, Failure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::new("Expected \"B\"", Location { line: 1, column: 2 });
        assert_eq!(err.to_string(), "Expected \"B\" at 1:2");
    }

    #[test]
    fn payload_rendering() {
        assert_eq!(CommitPayload::render(&String::from("boom")), "boom");
        assert_eq!(CommitPayload::render(&"boom"), "boom");
        let err = Error::new("missing brace", Location { line: 3, column: 7 });
        assert_eq!(CommitPayload::render(&err), "missing brace at 3:7");
    }
}
