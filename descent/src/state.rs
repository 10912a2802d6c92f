//! The mutable parse state.
//!
//! A [`State`] is a cursor over an immutable byte source, together with the
//! packrat memo table and the set of in-progress rules. One state is owned by
//! one interpretation at a time; the engine is the only mutator. Leaf parsers
//! receive a shared reference and report how far to advance.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::grammar::RuleId;
use crate::memo::Memo;

/// A place in the source, 1-origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The state of a single parse: source, cursor, memo table and the set of
/// `(position, rule)` pairs currently on the stack.
pub struct State<'s> {
    src: &'s [u8],
    pos: usize,
    pub(crate) memo: Memo,
    active: FxHashSet<(usize, RuleId)>,
}

impl<'s> State<'s> {
    pub(crate) fn new(src: &'s [u8]) -> Self {
        Self {
            src,
            pos: 0,
            memo: Memo::default(),
            active: FxHashSet::default(),
        }
    }

    /// The full source.
    pub fn src(&self) -> &'s [u8] {
        self.src
    }

    /// The next unconsumed offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The unconsumed tail of the source. Zero-copy.
    pub fn rest(&self) -> &'s [u8] {
        &self.src[self.pos..]
    }

    /// The current location, derived by scanning the consumed prefix.
    ///
    /// `\n` starts a new line. `\r` resets the column without starting a new
    /// line. `\t` advances the column to the next multiple of four. Lines and
    /// columns are 1-origin.
    pub fn location(&self) -> Location {
        let mut line = 0u32;
        let mut column = 0u32;
        for &byte in &self.src[..self.pos] {
            match byte {
                b'\r' => column = 0,
                b'\n' => {
                    line += 1;
                    column = 0;
                }
                b'\t' => column = (column / 4 + 1) * 4,
                _ => column += 1,
            }
        }
        Location {
            line: line + 1,
            column: column + 1,
        }
    }

    /// Save the cursor for backtracking.
    pub(crate) fn snapshot(&self) -> usize {
        self.pos
    }

    /// Reinstate a saved cursor. Also used to replay a memoized advance.
    pub(crate) fn restore(&mut self, snapshot: usize) {
        debug_assert!(snapshot <= self.src.len());
        self.pos = snapshot;
    }

    /// Advance the cursor by `n` consumed bytes.
    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.src.len());
        self.pos += n;
    }

    /// Mark `rule` as in progress at the current position. Returns `false`
    /// if it already is, which means the grammar is left-recursive here.
    pub(crate) fn begin(&mut self, rule: RuleId) -> bool {
        self.active.insert((self.pos, rule))
    }

    /// Clear the in-progress mark made by [`begin`](State::begin).
    pub(crate) fn finish(&mut self, pos: usize, rule: RuleId) {
        self.active.remove(&(pos, rule));
    }
}
