//! The recursive-descent interpreter over grammar rules.
//!
//! One entry, [`Engine::parse`], dispatched by rule kind. PEG semantics
//! throughout: ordered choice, greedy repetition, total backtracking. Every
//! attempt is memoized per `(position, rule)`, which both gives linear-time
//! parsing and lets the in-progress set detect left recursion. Commits travel
//! in a dedicated result branch and are never caught by choice, optional or
//! repetition; sequences offer their already-parsed fields a chance to
//! annotate the payload on the way out.

use crate::error::{CommitPayload, Error, Failure, Fatal, ParseResult, Reject};
use crate::grammar::{Alt, Field, Grammar, Kind, LeafId, RuleId};
use crate::state::State;
use crate::value::Value;

impl Grammar {
    /// Parse `source` against `root`.
    ///
    /// Ordinary failures come back as the error that escaped the outermost
    /// rule; commits come back rendered with the location they were raised
    /// at. Trailing unconsumed input is not an error here: a grammar that
    /// wants end-of-input anchors itself with a negative lookahead.
    pub fn parse(&self, root: RuleId, source: &[u8]) -> Result<Value, Error> {
        let mut engine = Engine {
            grammar: self,
            state: State::new(source),
        };
        match engine.parse(root) {
            Ok(value) => Ok(value),
            Err(Failure::Error(error)) => Err(error),
            Err(Failure::Commit(fatal)) => Err(Error::new(fatal.payload.render(), fatal.at)),
        }
    }
}

pub(crate) struct Engine<'g, 's> {
    grammar: &'g Grammar,
    state: State<'s>,
}

impl<'g> Engine<'g, '_> {
    /// Parse one rule at the current position: memo consult, left-recursion
    /// guard, evaluation, memo store. On an ordinary error the cursor is
    /// rewound to where the attempt started; commits leave it where the
    /// commit was raised.
    fn parse(&mut self, rule: RuleId) -> ParseResult<Value> {
        let start = self.state.snapshot();
        if let Some((result, end)) = self.state.memo.lookup(start, rule) {
            return match result {
                Ok(value) => {
                    self.state.restore(end);
                    Ok(value)
                }
                Err(error) => Err(Failure::Error(error)),
            };
        }
        if !self.state.begin(rule) {
            let message = format!(
                "infinite loop parsing {} at offset {}",
                self.grammar.describe(rule),
                start
            );
            return Err(self.commit(Box::new(message)));
        }
        let outcome = self.check(rule);
        self.state.finish(start, rule);
        match outcome {
            Ok(value) => {
                let end = self.state.snapshot();
                self.state.memo.store(start, rule, Ok(value.clone()), end);
                Ok(value)
            }
            Err(Failure::Error(error)) => {
                self.state.restore(start);
                self.state.memo.store(start, rule, Err(error.clone()), start);
                Err(Failure::Error(error))
            }
            Err(fatal) => Err(fatal),
        }
    }

    /// Evaluate a rule and run its hooks: `verify` on success, `on_failed`
    /// on an ordinary failure.
    fn check(&mut self, rule: RuleId) -> ParseResult<Value> {
        match self.eval(rule) {
            Ok(value) => {
                if let Some(verify) = &self.grammar.rule_hooks(rule).verify {
                    match verify(&value) {
                        Ok(()) => Ok(value),
                        Err(Reject::Soft(message)) => {
                            Err(Failure::Error(Error::new(message, self.state.location())))
                        }
                        Err(Reject::Commit(payload)) => Err(self.commit(payload)),
                    }
                } else {
                    Ok(value)
                }
            }
            Err(Failure::Error(error)) => {
                if let Some(on_failed) = &self.grammar.rule_hooks(rule).on_failed {
                    if let Some(payload) = on_failed() {
                        return Err(self.commit(payload));
                    }
                }
                Err(Failure::Error(error))
            }
            fatal => fatal,
        }
    }

    fn eval(&mut self, rule: RuleId) -> ParseResult<Value> {
        let node: &'g Kind = self.grammar.node(rule);
        match node {
            Kind::Unset => panic!(
                "internal error: rule {rule:?} was declared but never defined"
            ),
            Kind::Alias(body) => self.parse(*body),
            Kind::Leaf { leaf, tag } => self.leaf(*leaf, tag.as_deref()),
            Kind::Sequence(fields) => self.sequence(fields),
            Kind::Choice { name, alts } => self.choice(name, alts),
            Kind::Repeat(child) => self.repeat(*child),
            Kind::Optional(child) => self.optional(*child),
            Kind::Ahead(child) => self.ahead(*child),
            Kind::Not { name, rule } => self.not(name, *rule),
        }
    }

    fn leaf(&mut self, leaf: LeafId, tag: Option<&str>) -> ParseResult<Value> {
        match self.grammar.leaf_impl(leaf).consume(&self.state, tag) {
            Ok((value, advance)) => {
                self.state.advance(advance);
                Ok(value)
            }
            Err(Reject::Soft(message)) => {
                Err(Failure::Error(Error::new(message, self.state.location())))
            }
            Err(Reject::Commit(payload)) => Err(self.commit(payload)),
        }
    }

    /// Every field in order. A failing field fails the sequence (the field
    /// has already rewound the cursor past its own consumption). A commit
    /// passes through, offering each already-parsed field (in reverse
    /// order) a chance to annotate the payload.
    fn sequence(&mut self, fields: &[Field]) -> ParseResult<Value> {
        let mut record: Vec<(Option<String>, Value)> = Vec::with_capacity(fields.len());
        for field in fields {
            match self.parse(field.rule) {
                Ok(value) => record.push((field.name.clone(), value)),
                Err(Failure::Error(error)) => return Err(Failure::Error(error)),
                Err(Failure::Commit(mut fatal)) => {
                    for (parsed, field) in record.iter().zip(fields).rev() {
                        let hooks = self.grammar.rule_hooks(self.grammar.resolve(field.rule));
                        if let Some(annotate) = &hooks.annotate {
                            if let Some(payload) = annotate(&parsed.1, fatal.payload.as_any()) {
                                fatal.payload = payload;
                            }
                        }
                    }
                    return Err(Failure::Commit(fatal));
                }
            }
        }
        Ok(Value::Record(record))
    }

    /// First success wins. A commit inside an alternative escapes without
    /// trying the rest.
    fn choice(&mut self, name: &str, alts: &[Alt]) -> ParseResult<Value> {
        for (index, alt) in alts.iter().enumerate() {
            match self.parse(alt.rule) {
                Ok(value) => {
                    return Ok(Value::Variant {
                        index,
                        name: alt.name.clone(),
                        value: Box::new(value),
                    })
                }
                Err(Failure::Error(_)) => continue,
                fatal => return fatal,
            }
        }
        Err(Failure::Error(Error::new(
            format!("Expected {name}"),
            self.state.location(),
        )))
    }

    /// Greedy zero-or-more. The child's failure ends the repetition without
    /// failing it; a child that succeeds without consuming ends it too,
    /// since it would otherwise match identically forever.
    fn repeat(&mut self, child: RuleId) -> ParseResult<Value> {
        let mut items = Vec::new();
        loop {
            let before = self.state.snapshot();
            match self.parse(child) {
                Ok(value) => {
                    items.push(value);
                    if self.state.snapshot() == before {
                        break;
                    }
                }
                Err(Failure::Error(_)) => break,
                fatal => return fatal,
            }
        }
        Ok(Value::List(items))
    }

    fn optional(&mut self, child: RuleId) -> ParseResult<Value> {
        match self.parse(child) {
            Ok(value) => Ok(Value::Maybe(Some(Box::new(value)))),
            Err(Failure::Error(_)) => Ok(Value::Maybe(None)),
            fatal => fatal,
        }
    }

    /// Positive lookahead: the child's value without its consumption.
    fn ahead(&mut self, child: RuleId) -> ParseResult<Value> {
        let saved = self.state.snapshot();
        let outcome = self.parse(child);
        self.state.restore(saved);
        outcome
    }

    /// Negative lookahead: succeeds exactly when the child fails.
    fn not(&mut self, name: &str, child: RuleId) -> ParseResult<Value> {
        let saved = self.state.snapshot();
        let outcome = self.parse(child);
        self.state.restore(saved);
        match outcome {
            Ok(_) => Err(Failure::Error(Error::new(
                format!("expected {name} to fail"),
                self.state.location(),
            ))),
            Err(Failure::Error(_)) => Ok(Value::Unit),
            fatal => fatal,
        }
    }

    /// Stamp a commit with the current location. The location is captured
    /// here, once; annotators only rewrite the payload.
    fn commit(&self, payload: Box<dyn CommitPayload>) -> Failure {
        Failure::Commit(Fatal {
            payload,
            at: self.state.location(),
        })
    }
}
