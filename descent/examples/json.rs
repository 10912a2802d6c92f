//! A JSON grammar, authored as types. Whitespace is woven through the rules
//! the PEG way: every token eats the whitespace that follows it.

use descent::{Never, Num, Parser, Syntax, Text};

#[derive(Syntax, Debug)]
struct Document {
    leading: Ws,
    value: JsonValue,
    #[syntax(name = "trailing input")]
    end: Never<AnyByte>,
}

#[derive(Syntax, Debug)]
struct AnyByte {
    #[syntax(regex = "(?s).")]
    byte: Text,
}

#[derive(Syntax, Debug)]
struct Ws {
    #[syntax(regex = r"[ \t\r\n]*")]
    text: Text,
}

// Keyword alternatives come before Number: the number leaf scans ahead for a
// numeric lexeme, so it must only be consulted once everything else failed.
#[derive(Syntax, Debug)]
#[syntax(name = "value")]
enum JsonValue {
    Object(Object),
    Array(Array),
    String(StringLit),
    True(TrueLit),
    False(FalseLit),
    Null(NullLit),
    Number(NumberLit),
}

#[derive(Syntax, Debug)]
struct Object {
    #[syntax(literal = "{")]
    open: Text,
    ws: Ws,
    members: Option<Members>,
    #[syntax(literal = "}")]
    close: Text,
    trailing: Ws,
}

#[derive(Syntax, Debug)]
struct Members {
    first: Member,
    rest: Vec<MemberTail>,
}

#[derive(Syntax, Debug)]
struct MemberTail {
    #[syntax(literal = ",")]
    comma: Text,
    ws: Ws,
    member: Member,
}

#[derive(Syntax, Debug)]
struct Member {
    key: StringLit,
    #[syntax(literal = ":")]
    colon: Text,
    ws: Ws,
    value: Box<JsonValue>,
}

#[derive(Syntax, Debug)]
struct Array {
    #[syntax(literal = "[")]
    open: Text,
    ws: Ws,
    items: Option<Items>,
    #[syntax(literal = "]")]
    close: Text,
    trailing: Ws,
}

#[derive(Syntax, Debug)]
struct Items {
    first: Box<JsonValue>,
    rest: Vec<ItemTail>,
}

#[derive(Syntax, Debug)]
struct ItemTail {
    #[syntax(literal = ",")]
    comma: Text,
    ws: Ws,
    value: Box<JsonValue>,
}

#[derive(Syntax, Debug)]
struct StringLit {
    #[syntax(regex = r#""(?:[^"\\]|\\.)*""#)]
    token: Text,
    ws: Ws,
}

#[derive(Syntax, Debug)]
struct NumberLit {
    value: Num,
    ws: Ws,
}

#[derive(Syntax, Debug)]
struct TrueLit {
    #[syntax(literal = "true")]
    token: Text,
    ws: Ws,
}

#[derive(Syntax, Debug)]
struct FalseLit {
    #[syntax(literal = "false")]
    token: Text,
    ws: Ws,
}

#[derive(Syntax, Debug)]
struct NullLit {
    #[syntax(literal = "null")]
    token: Text,
    ws: Ws,
}

/// Re-render compactly, proving the tree survived the round trip.
fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(object) => {
            let mut out = String::from("{");
            if let Some(members) = &object.members {
                render_member(&mut out, &members.first);
                for tail in &members.rest {
                    out.push(',');
                    render_member(&mut out, &tail.member);
                }
            }
            out.push('}');
            out
        }
        JsonValue::Array(array) => {
            let mut out = String::from("[");
            if let Some(items) = &array.items {
                out.push_str(&render(&items.first));
                for tail in &items.rest {
                    out.push(',');
                    out.push_str(&render(&tail.value));
                }
            }
            out.push(']');
            out
        }
        JsonValue::String(string) => string.token.text.clone(),
        JsonValue::True(_) => "true".to_string(),
        JsonValue::False(_) => "false".to_string(),
        JsonValue::Null(_) => "null".to_string(),
        JsonValue::Number(number) => number.value.value.to_string(),
    }
}

fn render_member(out: &mut String, member: &Member) {
    out.push_str(&member.key.token.text);
    out.push(':');
    out.push_str(&render(&member.value));
}

fn main() {
    let parser = Parser::<Document>::new();

    let input =
        r#"{ "name": "descent", "versions": [1, 2.5, -3e2], "stable": true, "extra": null }"#;
    let document = parser.parse(input).unwrap();
    let compact = render(&document.value);
    println!("{compact}");
    assert_eq!(
        compact,
        r#"{"name":"descent","versions":[1,2.5,-300],"stable":true,"extra":null}"#
    );

    let error = parser.parse(r#"{ "name": }"#).unwrap_err();
    println!("error: {error}");
}
