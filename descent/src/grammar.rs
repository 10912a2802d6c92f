//! The descriptor algebra: grammar rules as data.
//!
//! A [`Grammar`] is an arena of rule nodes. Each constructor returns a
//! [`RuleId`], a stable small integer that doubles as the memo key, so two
//! parses of the same rule at the same position share one memo slot. The
//! registry is fully built by the embedder before parsing and is read-only
//! afterwards.
//!
//! Recursive grammars use [`declare`](Grammar::declare) /
//! [`define`](Grammar::define): reserve a slot up front, refer to it freely,
//! fill it in once the body exists. [`rule_of`](Grammar::rule_of) does this
//! automatically for `#[derive(Syntax)]` types, memoized per type.

use std::any::TypeId;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{CommitPayload, Reject};
use crate::hooks::Hooks;
use crate::leaf::{Leaf, LiteralLeaf, MarkLeaf, NumberLeaf, RegexCache, RegexLeaf};
use crate::value::Value;
use crate::Syntax;

/// Identity of a grammar rule. Assigned at construction, used as the memo
/// key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

impl RuleId {
    #[cfg(test)]
    pub(crate) fn test(raw: u32) -> Self {
        RuleId(raw)
    }
}

/// Identity of a registered leaf parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(u32);

const LITERAL: LeafId = LeafId(0);
const REGEX: LeafId = LeafId(1);
const NUMBER: LeafId = LeafId(2);
const LOCATION: LeafId = LeafId(3);

/// One field of a sequence rule.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: Option<String>,
    pub(crate) rule: RuleId,
}

impl Field {
    pub fn new(name: impl Into<String>, rule: RuleId) -> Self {
        Self {
            name: Some(name.into()),
            rule,
        }
    }

    pub fn anon(rule: RuleId) -> Self {
        Self { name: None, rule }
    }
}

/// One alternative of a choice rule.
#[derive(Debug, Clone)]
pub(crate) struct Alt {
    pub name: String,
    pub rule: RuleId,
}

pub(crate) enum Kind {
    /// Declared but not yet defined.
    Unset,
    /// Indirection filled in by [`Grammar::define`].
    Alias(RuleId),
    Leaf {
        leaf: LeafId,
        tag: Option<String>,
    },
    Sequence(Vec<Field>),
    Choice {
        name: String,
        alts: Vec<Alt>,
    },
    Repeat(RuleId),
    Optional(RuleId),
    Ahead(RuleId),
    Not {
        name: String,
        rule: RuleId,
    },
}

/// A grammar: rule nodes, leaf registry, and per-rule hooks.
pub struct Grammar {
    rules: Vec<Kind>,
    hooks: Vec<Hooks>,
    leaves: Vec<Box<dyn Leaf>>,
    leaf_names: Vec<String>,
    names: FxHashMap<String, LeafId>,
    types: FxHashMap<TypeId, RuleId>,
    // Leaf rules are interned by (leaf, tag): equal leaf descriptors share a
    // rule id, and with it a memo slot and hook slots.
    interned: FxHashMap<(LeafId, Option<String>), RuleId>,
    regexes: Rc<RegexCache>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    /// An empty grammar with the four built-in leaves registered:
    /// `literal`, `regex`, `number` and `location`.
    pub fn new() -> Self {
        let regexes = Rc::new(RegexCache::default());
        let mut grammar = Self {
            rules: Vec::new(),
            hooks: Vec::new(),
            leaves: Vec::new(),
            leaf_names: Vec::new(),
            names: FxHashMap::default(),
            types: FxHashMap::default(),
            interned: FxHashMap::default(),
            regexes: regexes.clone(),
        };
        grammar.register_leaf("literal", LiteralLeaf);
        grammar.register_leaf("regex", RegexLeaf { cache: regexes });
        grammar.register_leaf("number", NumberLeaf::new());
        grammar.register_leaf("location", MarkLeaf);
        grammar
    }

    /// Register a leaf parser under `name`.
    ///
    /// # Panics
    /// Panics if the name is taken.
    pub fn register_leaf(&mut self, name: &str, leaf: impl Leaf + 'static) -> LeafId {
        if self.names.contains_key(name) {
            panic!("leaf parser {name:?} is already registered");
        }
        let id = LeafId(self.leaves.len() as u32);
        self.leaves.push(Box::new(leaf));
        self.leaf_names.push(name.to_string());
        self.names.insert(name.to_string(), id);
        id
    }

    /// A rule matching `text` byte-for-byte.
    pub fn literal(&mut self, text: &str) -> RuleId {
        self.add_leaf(LITERAL, Some(text.to_string()))
    }

    /// A rule matching `pattern` anchored at the cursor. The pattern is
    /// compiled now; an invalid pattern panics.
    pub fn regex(&mut self, pattern: &str) -> RuleId {
        self.regexes.compile(pattern);
        self.add_leaf(REGEX, Some(pattern.to_string()))
    }

    /// A rule matching a numeric lexeme, yielding an `f64`.
    pub fn number(&mut self) -> RuleId {
        self.add_leaf(NUMBER, None)
    }

    /// A rule capturing the current location without consuming input.
    pub fn location(&mut self) -> RuleId {
        self.add_leaf(LOCATION, None)
    }

    /// A rule delegating to the leaf parser registered under `name`.
    ///
    /// # Panics
    /// Panics if no such leaf is registered.
    pub fn leaf(&mut self, name: &str, tag: Option<&str>) -> RuleId {
        let leaf = *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("leaf parser {name:?} is not registered"));
        self.add_leaf(leaf, tag.map(str::to_string))
    }

    /// A sequence: every field must match, in order.
    pub fn sequence(&mut self, fields: Vec<Field>) -> RuleId {
        self.push(Kind::Sequence(fields))
    }

    /// An ordered choice. `name` appears in the error when no alternative
    /// matches.
    pub fn choice<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        alts: Vec<(S, RuleId)>,
    ) -> RuleId {
        self.push(Kind::Choice {
            name: name.into(),
            alts: alts
                .into_iter()
                .map(|(name, rule)| Alt {
                    name: name.into(),
                    rule,
                })
                .collect(),
        })
    }

    /// Greedy zero-or-more repetition of `child`.
    pub fn repeat(&mut self, child: RuleId) -> RuleId {
        self.push(Kind::Repeat(child))
    }

    /// Zero-or-one occurrence of `child`.
    pub fn optional(&mut self, child: RuleId) -> RuleId {
        self.push(Kind::Optional(child))
    }

    /// Positive lookahead: `child` must match here; nothing is consumed.
    pub fn ahead(&mut self, child: RuleId) -> RuleId {
        self.push(Kind::Ahead(child))
    }

    /// Negative lookahead: `child` must fail here; nothing is consumed.
    /// `name` appears in the error when the child unexpectedly matches.
    pub fn not(&mut self, name: impl Into<String>, child: RuleId) -> RuleId {
        self.push(Kind::Not {
            name: name.into(),
            rule: child,
        })
    }

    /// Reserve a rule slot to be filled by [`define`](Grammar::define),
    /// for rules that refer to themselves.
    pub fn declare(&mut self) -> RuleId {
        self.push(Kind::Unset)
    }

    /// Fill a slot reserved by [`declare`](Grammar::declare).
    ///
    /// # Panics
    /// Panics if the slot is already defined.
    pub fn define(&mut self, slot: RuleId, body: RuleId) {
        match self.rules[slot.0 as usize] {
            Kind::Unset => self.rules[slot.0 as usize] = Kind::Alias(body),
            _ => panic!("rule {slot:?} is already defined"),
        }
    }

    /// The rule for a `#[derive(Syntax)]` type, registering it on first use.
    /// Recursive and mutually recursive types work: the slot is declared
    /// before the type's body registers.
    pub fn rule_of<T: Syntax + 'static>(&mut self) -> RuleId {
        if let Some(&id) = self.types.get(&TypeId::of::<T>()) {
            return id;
        }
        let slot = self.declare();
        self.types.insert(TypeId::of::<T>(), slot);
        let body = T::register(self);
        self.define(slot, body);
        slot
    }

    /// Attach a validation hook: run after `rule` produces a value, it can
    /// reject the parse (backtrackable) or commit a fatal error.
    pub fn verify(&mut self, rule: RuleId, hook: impl Fn(&Value) -> Result<(), Reject> + 'static) {
        self.hooks[rule.0 as usize].verify = Some(Box::new(hook));
    }

    /// Attach a failure hook: run when `rule` fails with an ordinary error,
    /// it can upgrade the failure to a commit by returning a payload.
    pub fn on_failed(
        &mut self,
        rule: RuleId,
        hook: impl Fn() -> Option<Box<dyn CommitPayload>> + 'static,
    ) {
        self.hooks[rule.0 as usize].on_failed = Some(Box::new(hook));
    }

    /// Attach an annotator: when a commit unwinds through a sequence that
    /// already parsed `rule` as a field, the hook may replace the payload.
    /// Returning `None` means the payload type is not admitted.
    pub fn annotate(
        &mut self,
        rule: RuleId,
        hook: impl Fn(&Value, &dyn std::any::Any) -> Option<Box<dyn CommitPayload>> + 'static,
    ) {
        self.hooks[rule.0 as usize].annotate = Some(Box::new(hook));
    }

    fn add_leaf(&mut self, leaf: LeafId, tag: Option<String>) -> RuleId {
        if let Some(&id) = self.interned.get(&(leaf, tag.clone())) {
            return id;
        }
        let id = self.push(Kind::Leaf {
            leaf,
            tag: tag.clone(),
        });
        self.interned.insert((leaf, tag), id);
        id
    }

    fn push(&mut self, kind: Kind) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(kind);
        self.hooks.push(Hooks::default());
        id
    }

    pub(crate) fn node(&self, rule: RuleId) -> &Kind {
        &self.rules[rule.0 as usize]
    }

    /// Follow [`define`](Grammar::define) indirections to the rule that
    /// carries the hooks.
    pub(crate) fn resolve(&self, mut rule: RuleId) -> RuleId {
        while let Kind::Alias(body) = self.node(rule) {
            rule = *body;
        }
        rule
    }

    pub(crate) fn rule_hooks(&self, rule: RuleId) -> &Hooks {
        &self.hooks[rule.0 as usize]
    }

    pub(crate) fn leaf_impl(&self, leaf: LeafId) -> &dyn Leaf {
        &*self.leaves[leaf.0 as usize]
    }

    /// A short description of `rule` for diagnostics.
    pub(crate) fn describe(&self, rule: RuleId) -> String {
        match self.node(rule) {
            Kind::Unset => "undefined rule".to_string(),
            Kind::Alias(_) => "rule".to_string(),
            Kind::Leaf { leaf, tag } => {
                let name = &self.leaf_names[leaf.0 as usize];
                match tag {
                    Some(tag) => format!("{name} {tag:?}"),
                    None => name.clone(),
                }
            }
            Kind::Sequence(_) => "sequence".to_string(),
            Kind::Choice { name, .. } => name.clone(),
            Kind::Repeat(_) => "repetition".to_string(),
            Kind::Optional(_) => "optional".to_string(),
            Kind::Ahead(_) => "lookahead".to_string(),
            Kind::Not { name, .. } => format!("not {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_leaf_rules_share_an_id() {
        let mut g = Grammar::new();
        assert_eq!(g.literal("A"), g.literal("A"));
        assert_ne!(g.literal("A"), g.literal("B"));
        assert_ne!(g.literal("A"), g.regex("A"));
        assert_eq!(g.number(), g.number());
    }

    #[test]
    fn composite_rules_are_distinct() {
        let mut g = Grammar::new();
        let a = g.literal("A");
        assert_ne!(g.repeat(a), g.repeat(a));
    }

    #[test]
    #[should_panic(expected = "already defined")]
    fn define_twice_panics() {
        let mut g = Grammar::new();
        let slot = g.declare();
        let body = g.literal("A");
        g.define(slot, body);
        g.define(slot, body);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unknown_leaf_panics() {
        let mut g = Grammar::new();
        g.leaf("widget", None);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_leaf_name_panics() {
        let mut g = Grammar::new();
        g.register_leaf("literal", crate::leaf::LiteralLeaf);
    }

    #[test]
    #[should_panic(expected = "invalid regex pattern")]
    fn invalid_pattern_panics_at_construction() {
        let mut g = Grammar::new();
        g.regex("(unclosed");
    }

    #[test]
    fn describe_names_rules() {
        let mut g = Grammar::new();
        let a = g.literal("A");
        assert_eq!(g.describe(a), "literal \"A\"");
        let c = g.choice("either", vec![("a", a)]);
        assert_eq!(g.describe(c), "either");
        let n = g.number();
        assert_eq!(g.describe(n), "number");
    }
}
