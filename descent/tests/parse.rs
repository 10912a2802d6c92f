//! End-to-end tests of the builder API.

use std::any::Any;

use descent::{
    CommitPayload, Field, Grammar, Leaf, Location, Reject, RuleId, State, Value,
};

fn at(line: u32, column: u32) -> Location {
    Location { line, column }
}

fn token(contents: &str, line: u32, column: u32) -> Value {
    Value::Token {
        contents: contents.as_bytes().to_vec(),
        at: at(line, column),
    }
}

#[test]
fn sequence_of_literals() {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let root = g.sequence(vec![Field::new("a", a), Field::new("b", b)]);
    let value = g.parse(root, b"AB").unwrap();
    assert_eq!(
        value,
        Value::Record(vec![
            (Some("a".into()), token("A", 1, 1)),
            (Some("b".into()), token("B", 1, 2)),
        ])
    );
}

#[test]
fn sequence_reports_the_missing_literal() {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let root = g.sequence(vec![Field::new("a", a), Field::new("b", b)]);
    let error = g.parse(root, b"A").unwrap_err();
    assert_eq!(error.to_string(), "Expected \"B\" at 1:2");
}

#[test]
fn repetition_is_greedy() {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let c = g.literal("C");
    let many_a = g.repeat(a);
    let root = g.sequence(vec![
        Field::new("many", many_a),
        Field::new("b", b),
        Field::new("c", c),
    ]);

    let value = g.parse(root, b"AAAAAABC").unwrap();
    let Some(Value::List(items)) = value.field("many") else {
        panic!("expected a list, got {value:?}");
    };
    assert_eq!(items.len(), 6);

    // A repetition matching zero items is fine.
    assert!(g.parse(root, b"BC").is_ok());
}

#[test]
fn repetition_stops_at_the_first_failure() {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let c = g.literal("C");
    let many_a = g.repeat(a);
    let root = g.sequence(vec![
        Field::new("many", many_a),
        Field::new("b", b),
        Field::new("c", c),
    ]);
    let error = g.parse(root, b"AAAAAACB").unwrap_err();
    assert_eq!(error.to_string(), "Expected \"B\" at 1:7");
}

#[test]
fn choice_tags_the_first_matching_alternative() {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let letter = g.choice("letter", vec![("A", a), ("B", b)]);
    let root = g.repeat(letter);

    let value = g.parse(root, b"ABBBABAB").unwrap();
    let Value::List(items) = value else {
        panic!("expected a list, got {value:?}");
    };
    let indices: Vec<usize> = items
        .iter()
        .map(|item| match item {
            Value::Variant { index, .. } => *index,
            other => panic!("expected a variant, got {other:?}"),
        })
        .collect();
    assert_eq!(indices, [0, 1, 1, 1, 0, 1, 0, 1]);

    let names: Vec<&str> = items
        .iter()
        .map(|item| match item {
            Value::Variant { name, .. } => name.as_str(),
            other => panic!("expected a variant, got {other:?}"),
        })
        .collect();
    assert_eq!(names[..2], ["A", "B"]);
}

#[test]
fn choice_is_ordered_even_when_both_alternatives_match() {
    // "a" and "ab" both match a prefix of "ab"; the listed order decides.
    let mut g = Grammar::new();
    let short = g.literal("a");
    let long = g.literal("ab");
    let first_short = g.choice("token", vec![("short", short), ("long", long)]);
    let value = g.parse(first_short, b"ab").unwrap();
    assert!(matches!(value, Value::Variant { index: 0, .. }));

    let mut g = Grammar::new();
    let short = g.literal("a");
    let long = g.literal("ab");
    let first_long = g.choice("token", vec![("long", long), ("short", short)]);
    let value = g.parse(first_long, b"ab").unwrap();
    assert!(matches!(value, Value::Variant { index: 0, name, .. } if name == "long"));
}

#[test]
fn choice_failure_names_the_choice() {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let letter = g.choice("letter", vec![("A", a), ("B", b)]);
    let error = g.parse(letter, b"x").unwrap_err();
    assert_eq!(error.to_string(), "Expected letter at 1:1");
}

#[test]
fn alternatives_backtrack_completely() {
    // Both alternatives start with "a"; the first consumes it and then
    // fails, and the second must see the cursor back at the start.
    let mut g = Grammar::new();
    let a = g.literal("a");
    let b = g.literal("b");
    let c = g.literal("c");
    let ab = g.sequence(vec![Field::new("a", a), Field::new("b", b)]);
    let ac = g.sequence(vec![Field::new("a", a), Field::new("c", c)]);
    let root = g.choice("pair", vec![("ab", ab), ("ac", ac)]);
    let value = g.parse(root, b"ac").unwrap();
    assert!(matches!(value, Value::Variant { index: 1, .. }));
}

#[test]
fn greedy_repetition_never_gives_back() {
    // a* consumes every "a"; the trailing rule cannot win one back.
    let mut g = Grammar::new();
    let a = g.literal("a");
    let many = g.repeat(a);
    let root = g.sequence(vec![Field::anon(many), Field::anon(a)]);
    assert!(g.parse(root, b"aaa").is_err());
}

#[test]
fn optional_restores_the_cursor_on_failure() {
    let mut g = Grammar::new();
    let minus = g.literal("-");
    let sign = g.optional(minus);
    let num = g.number();
    let root = g.sequence(vec![Field::new("sign", sign), Field::new("num", num)]);

    let value = g.parse(root, b"5").unwrap();
    assert_eq!(value.field("sign"), Some(&Value::Maybe(None)));
    assert!(matches!(
        value.field("num"),
        Some(Value::Number { value, .. }) if *value == 5.0
    ));

    let value = g.parse(root, b"-5").unwrap();
    assert!(matches!(value.field("sign"), Some(Value::Maybe(Some(_)))));
}

#[test]
fn positive_lookahead_consumes_nothing() {
    let mut g = Grammar::new();
    let a = g.literal("a");
    let peek = g.ahead(a);
    let root = g.sequence(vec![Field::new("peek", peek), Field::new("a", a)]);
    let value = g.parse(root, b"a").unwrap();
    // Both fields saw the same "a": the lookahead yielded the value without
    // consuming it.
    assert_eq!(value.field("peek"), Some(&token("a", 1, 1)));
    assert_eq!(value.field("a"), Some(&token("a", 1, 1)));

    let mut g = Grammar::new();
    let a = g.literal("a");
    let peek = g.ahead(a);
    assert!(g.parse(peek, b"b").is_err());
}

#[test]
fn negative_lookahead_gates_without_consuming() {
    let mut g = Grammar::new();
    let a = g.literal("a");
    let any = g.regex("(?s).");
    let end = g.not("any byte", any);
    let root = g.sequence(vec![Field::new("a", a), Field::anon(end)]);

    assert!(g.parse(root, b"a").is_ok());
    let error = g.parse(root, b"ab").unwrap_err();
    assert_eq!(error.to_string(), "expected any byte to fail at 1:2");
}

#[test]
fn direct_left_recursion_is_fatal() {
    let mut g = Grammar::new();
    let expr = g.declare();
    let plus = g.literal("+");
    let num = g.number();
    let sum = g.sequence(vec![
        Field::new("lhs", expr),
        Field::anon(plus),
        Field::new("rhs", num),
    ]);
    g.define(expr, sum);
    let error = g.parse(expr, b"1+2").unwrap_err();
    assert!(error.message.contains("infinite loop"), "{error}");
}

#[test]
fn indirect_left_recursion_is_fatal() {
    let mut g = Grammar::new();
    let a = g.declare();
    let b = g.declare();
    let x = g.literal("x");
    let a_body = g.sequence(vec![Field::anon(b), Field::anon(x)]);
    let b_body = g.sequence(vec![Field::anon(a), Field::anon(x)]);
    g.define(a, a_body);
    g.define(b, b_body);
    let error = g.parse(a, b"xxx").unwrap_err();
    assert!(error.message.contains("infinite loop"), "{error}");
}

fn letters_grammar() -> (Grammar, RuleId) {
    let mut g = Grammar::new();
    let a = g.literal("A");
    let b = g.literal("B");
    let letter = g.choice("letter", vec![("A", a), ("B", b)]);
    let root = g.repeat(letter);
    (g, root)
}

#[test]
fn parses_are_deterministic() {
    let (g, root) = letters_grammar();
    assert_eq!(
        g.parse(root, b"ABAB").unwrap(),
        g.parse(root, b"ABAB").unwrap()
    );

    let (fresh, fresh_root) = letters_grammar();
    assert_eq!(
        g.parse(root, b"ABAB").unwrap(),
        fresh.parse(fresh_root, b"ABAB").unwrap()
    );

    let mut g = Grammar::new();
    let a = g.literal("A");
    let root = g.sequence(vec![Field::new("a", a), Field::new("b", a)]);
    assert_eq!(
        g.parse(root, b"AX").unwrap_err(),
        g.parse(root, b"AX").unwrap_err()
    );
}

#[test]
fn verify_rejection_backtracks() {
    let mut g = Grammar::new();
    let num = g.number();
    g.verify(num, |value| match value {
        Value::Number { value, .. } if *value < 100.0 => Ok(()),
        _ => Err(Reject::soft("number too large")),
    });
    let digits = g.regex("[0-9]+");
    let root = g.choice("value", vec![("small", num), ("raw", digits)]);

    let value = g.parse(root, b"42").unwrap();
    assert!(matches!(value, Value::Variant { index: 0, .. }));

    // The rejected alternative rewinds; the raw alternative sees the whole
    // input.
    let value = g.parse(root, b"250").unwrap();
    match value {
        Value::Variant { index, value, .. } => {
            assert_eq!(index, 1);
            assert_eq!(*value, token("250", 1, 1));
        }
        other => panic!("expected a variant, got {other:?}"),
    }
}

#[test]
fn verify_commit_skips_remaining_alternatives() {
    let mut g = Grammar::new();
    let num = g.number();
    g.verify(num, |_| Err(Reject::commit("number forbidden")));
    let digits = g.regex("[0-9]+");
    let root = g.choice("value", vec![("num", num), ("raw", digits)]);
    let error = g.parse(root, b"42").unwrap_err();
    assert_eq!(error.to_string(), "number forbidden at 1:3");
}

struct Unmatched;

impl CommitPayload for Unmatched {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self) -> String {
        "unmatched delimiter".to_string()
    }
}

#[test]
fn commit_is_annotated_by_the_open_delimiter() {
    let mut g = Grammar::new();
    let open = g.literal("(");
    let expr = g.regex("[a-z]+");
    let close = g.literal(")");
    g.on_failed(close, || Some(Box::new(Unmatched)));
    g.annotate(open, |value, message| {
        message.downcast_ref::<Unmatched>()?;
        let Value::Token { at, .. } = value else {
            return None;
        };
        Some(Box::new(format!("expected `)` to match `(` opened at {at}")))
    });
    let root = g.sequence(vec![
        Field::new("open", open),
        Field::new("expr", expr),
        Field::new("close", close),
    ]);

    assert!(g.parse(root, b"(x)").is_ok());

    let error = g.parse(root, b"(x").unwrap_err();
    assert_eq!(
        error.to_string(),
        "expected `)` to match `(` opened at 1:1 at 1:3"
    );
}

#[test]
fn commit_payload_renders_without_an_annotator() {
    let mut g = Grammar::new();
    let open = g.literal("(");
    let expr = g.regex("[a-z]+");
    let close = g.literal(")");
    g.on_failed(close, || Some(Box::new(Unmatched)));
    // No annotator registered: the payload renders itself.
    let root = g.sequence(vec![
        Field::new("open", open),
        Field::new("expr", expr),
        Field::new("close", close),
    ]);
    let error = g.parse(root, b"(x").unwrap_err();
    assert_eq!(error.to_string(), "unmatched delimiter at 1:3");
}

struct IdentLeaf;

impl Leaf for IdentLeaf {
    fn consume(&self, state: &State<'_>, _tag: Option<&str>) -> Result<(Value, usize), Reject> {
        let rest = state.rest();
        let len = rest
            .iter()
            .take_while(|byte| byte.is_ascii_alphabetic())
            .count();
        if len == 0 {
            return Err(Reject::soft("expected identifier"));
        }
        Ok((
            Value::Token {
                contents: rest[..len].to_vec(),
                at: state.location(),
            },
            len,
        ))
    }
}

#[test]
fn embedder_leaves_participate_like_builtins() {
    let mut g = Grammar::new();
    g.register_leaf("ident", IdentLeaf);
    let name = g.leaf("ident", None);
    let eq = g.literal("=");
    let num = g.number();
    let root = g.sequence(vec![
        Field::new("name", name),
        Field::anon(eq),
        Field::new("value", num),
    ]);

    let value = g.parse(root, b"answer=42").unwrap();
    assert_eq!(value.field("name"), Some(&token("answer", 1, 1)));
    assert!(matches!(
        value.field("value"),
        Some(Value::Number { value, .. }) if *value == 42.0
    ));

    let error = g.parse(root, b"=42").unwrap_err();
    assert_eq!(error.to_string(), "expected identifier at 1:1");
}

#[test]
fn errors_locate_across_lines() {
    let mut g = Grammar::new();
    let word = g.regex("[a-z]*");
    let newline = g.literal("\n");
    let x = g.literal("x");
    let root = g.sequence(vec![
        Field::new("word", word),
        Field::anon(newline),
        Field::anon(x),
    ]);
    let error = g.parse(root, b"abc\ny").unwrap_err();
    assert_eq!(error.to_string(), "Expected \"x\" at 2:1");
}

#[test]
fn trailing_input_is_not_an_error_by_default() {
    let mut g = Grammar::new();
    let a = g.literal("a");
    assert!(g.parse(a, b"abc").is_ok());
}
