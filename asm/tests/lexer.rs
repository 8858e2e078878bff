use arch::reg::Reg;
use mipsasm::classify::Classifier;
use mipsasm::error::Diagnostics;
use mipsasm::lexer::LineLexer;
use mipsasm::token::TokenKind;
use std::sync::Arc;

fn case(code: &str, expects: Vec<TokenKind>) {
    let file: Arc<str> = Arc::from("case.s");
    let classifier = Classifier::default();
    let mut diags = Diagnostics::default();
    let tokens = LineLexer::new(code, &file, 1, &classifier)
        .parse(&mut diags)
        .unwrap();

    println!(" {code}");
    for token in &tokens {
        print!("\r\x1b[{}C^", token.pos.col);
    }
    println!();
    for (idx, token) in tokens.iter().enumerate() {
        println!("{:>2}: {:?}", idx, token.kind);
    }

    assert_eq!(tokens.len(), expects.len());
    for (idx, expect) in expects.iter().enumerate() {
        assert_eq!(tokens[idx].kind, *expect);
    }
}

#[test]
fn instructions() {
    use TokenKind::*;
    case(
        "main: lw $t0, -8($sp) # load",
        vec![
            Identifier("main".into()),
            Colon,
            Operator("lw".into()),
            Register(Reg::T0),
            Integer(-8),
            LeftParen,
            Register(Reg::SP),
            RightParen,
        ],
    );
    case(
        "beq $8,$9,loop",
        vec![
            Operator("beq".into()),
            Register(Reg::T0),
            Register(Reg::T1),
            Identifier("loop".into()),
        ],
    );
}

#[test]
fn data() {
    use TokenKind::*;
    case(
        "msg: .asciiz \"a, b # c\\n\"",
        vec![
            Identifier("msg".into()),
            Colon,
            Directive(mipsasm::token::Directive::Asciiz),
            String("a, b # c\n".into()),
        ],
    );
    case(
        ".byte 'a', '\\n', 0x7f, 0b101, 017",
        vec![
            Directive(mipsasm::token::Directive::Byte),
            Integer(97),
            Integer(10),
            Integer(127),
            Integer(5),
            Integer(15),
        ],
    );
}

#[test]
fn macro_lines() {
    use TokenKind::*;
    case(
        ".macro swap(%a, %b)",
        vec![
            Directive(mipsasm::token::Directive::Macro),
            Identifier("swap".into()),
            LeftParen,
            MacroParameter("a".into()),
            MacroParameter("b".into()),
            RightParen,
        ],
    );
    case(
        ".eqv SIZE 16",
        vec![
            Directive(mipsasm::token::Directive::Eqv),
            Identifier("SIZE".into()),
            Integer(16),
        ],
    );
}

#[test]
fn comment_only() {
    case("   # nothing here", vec![]);
    case("", vec![]);
}
