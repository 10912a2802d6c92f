//! Packrat memoization.
//!
//! Every completed attempt at a `(position, rule)` pair is recorded together
//! with the position the cursor ended at, so a second attempt replays the
//! outcome instead of re-parsing. This is what makes parse time linear in the
//! source for a fixed grammar. Entries are idempotent: errors are recorded
//! too, with the cursor already rewound to the attempt position.

use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::grammar::RuleId;
use crate::value::Value;

struct Entry {
    result: Result<Value, Error>,
    end: usize,
}

#[derive(Default)]
pub(crate) struct Memo {
    map: FxHashMap<(usize, RuleId), Entry>,
}

impl Memo {
    /// Replay a completed attempt, if there is one. The returned `end` is the
    /// position the cursor advanced to (the attempt position itself for
    /// errors).
    pub fn lookup(&self, pos: usize, rule: RuleId) -> Option<(Result<Value, Error>, usize)> {
        self.map
            .get(&(pos, rule))
            .map(|entry| (entry.result.clone(), entry.end))
    }

    /// Record a completed attempt.
    pub fn store(&mut self, pos: usize, rule: RuleId, result: Result<Value, Error>, end: usize) {
        self.map.insert((pos, rule), Entry { result, end });
    }
}
