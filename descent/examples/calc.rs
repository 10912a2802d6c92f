//! A calculator: arithmetic with precedence, authored as types.

use descent::{Never, Num, Parser, Syntax, Text};

#[derive(Syntax, Debug)]
struct Program {
    expr: Expr,
    #[syntax(name = "trailing input")]
    end: Never<AnyByte>,
}

#[derive(Syntax, Debug)]
struct AnyByte {
    #[syntax(regex = "(?s).")]
    byte: Text,
}

#[derive(Syntax, Debug)]
struct Expr {
    term: Term,
    rest: Vec<TermOp>,
}

#[derive(Syntax, Debug)]
struct TermOp {
    #[syntax(regex = r"[+\-]")]
    op: Text,
    term: Term,
}

#[derive(Syntax, Debug)]
struct Term {
    factor: Factor,
    rest: Vec<FactorOp>,
}

#[derive(Syntax, Debug)]
struct FactorOp {
    #[syntax(regex = r"[*/]")]
    op: Text,
    factor: Factor,
}

#[derive(Syntax, Debug)]
enum Factor {
    Number(Num),
    Group(Group),
}

#[derive(Syntax, Debug)]
struct Group {
    #[syntax(literal = "(")]
    open: Text,
    expr: Box<Expr>,
    #[syntax(literal = ")")]
    close: Text,
}

impl Expr {
    fn eval(&self) -> f64 {
        let mut acc = self.term.eval();
        for tail in &self.rest {
            match tail.op.text.as_str() {
                "+" => acc += tail.term.eval(),
                _ => acc -= tail.term.eval(),
            }
        }
        acc
    }
}

impl Term {
    fn eval(&self) -> f64 {
        let mut acc = self.factor.eval();
        for tail in &self.rest {
            match tail.op.text.as_str() {
                "*" => acc *= tail.factor.eval(),
                _ => acc /= tail.factor.eval(),
            }
        }
        acc
    }
}

impl Factor {
    fn eval(&self) -> f64 {
        match self {
            Factor::Number(num) => num.value,
            Factor::Group(group) => group.expr.eval(),
        }
    }
}

fn main() {
    let parser = Parser::<Program>::new();

    let input = "11+2*(3+4)/7";
    let program = parser.parse(input).unwrap();
    println!("{input} = {}", program.expr.eval());
    assert_eq!(program.expr.eval(), 13.0);

    let error = parser.parse("11+2*").unwrap_err();
    println!("11+2* -> {error}");
}
