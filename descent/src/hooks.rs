//! User hooks: semantic validation and commit-grade error enrichment.
//!
//! Hooks attach to a rule on the [`Grammar`](crate::Grammar), either directly
//! as closures (`Grammar::verify`, `Grammar::on_failed`, `Grammar::annotate`)
//! or through these traits when the grammar is authored with
//! `#[derive(Syntax)]`.

use std::any::Any;

use crate::error::{CommitPayload, Reject};
use crate::value::Value;

/// Semantic validation, run after a rule produces a value.
///
/// Returning `Err(Reject::Soft(..))` turns the successful sub-parse into an
/// ordinary backtrackable failure; the cursor rewinds to where the rule
/// started. `Err(Reject::Commit(..))` makes the failure final.
pub trait Verify {
    fn verify(&self) -> Result<(), Reject>;
}

/// Called when a rule fails with an ordinary error.
///
/// Returning a payload upgrades the failure to a commit: no enclosing choice
/// will try another alternative past this point. This is the place where a
/// grammar that has seen an opening delimiter declares that a missing closer
/// is no longer survivable.
pub trait OnFailed {
    fn failed() -> Option<Box<dyn CommitPayload>>;
}

/// Message enrichment for commits unwinding through a sequence.
///
/// When a commit rises through a sequence, each already-parsed field is
/// offered the payload in reverse field order; a field whose annotator admits
/// the payload type replaces it. An opening bracket uses this to attach its
/// own location to a "missing close bracket" commit raised much deeper.
pub trait Annotate<M: Any> {
    fn annotate(&self, message: &M) -> Box<dyn CommitPayload>;
}

pub(crate) type VerifyHook = Box<dyn Fn(&Value) -> Result<(), Reject>>;
pub(crate) type OnFailedHook = Box<dyn Fn() -> Option<Box<dyn CommitPayload>>>;
pub(crate) type AnnotateHook = Box<dyn Fn(&Value, &dyn Any) -> Option<Box<dyn CommitPayload>>>;

/// Hook slots for one rule.
#[derive(Default)]
pub(crate) struct Hooks {
    pub verify: Option<VerifyHook>,
    pub on_failed: Option<OnFailedHook>,
    pub annotate: Option<AnnotateHook>,
}
