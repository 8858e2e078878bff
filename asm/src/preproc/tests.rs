use super::*;
use crate::classify::Classifier;
use crate::lexer::Lexer;
use arch::reg::Reg;

fn run_with(src: &str, diags: &mut Diagnostics) -> Result<Program> {
    let layout = MemoryLayout::default();
    let lines = Lexer::new("t.s", src, Classifier::default()).parse(diags)?;
    Preprocessor::new(&layout).run(lines, diags)
}

fn run(src: &str) -> Program {
    let mut diags = Diagnostics::default();
    run_with(src, &mut diags).unwrap()
}

fn fail(src: &str) -> ErrorKind {
    let mut diags = Diagnostics::default();
    run_with(src, &mut diags).unwrap_err().kind
}

fn addr(program: &Program, name: &str) -> u32 {
    program.labels.get_val(name).unwrap()
}

#[test]
fn labels_follow_the_cursor() {
    let program = run(".text\nmain: nop\nnext: nop\n");
    assert_eq!(addr(&program, "main"), 0x0040_0000);
    assert_eq!(addr(&program, "next"), 0x0040_0004);
    assert_eq!(program.text.len(), 2);
}

#[test]
fn label_before_segment_switch_stays_behind() {
    let program = run("nop\nx: .data\n.word 1\n");
    assert_eq!(addr(&program, "x"), 0x0040_0004);
    assert!(program.data.contains_key(&0x1001_0000));
}

#[test]
fn several_labels_on_one_line() {
    let program = run("a: b: nop\n");
    assert_eq!(addr(&program, "a"), addr(&program, "b"));
}

#[test]
fn eqv_is_substituted() {
    let program = run(".eqv N 5\n.eqv M N\n.data\n.word N, M\n");
    let word = &program.data[&0x1001_0000];
    assert_eq!(word.values[0].kind, TokenKind::Integer(5));
    assert_eq!(word.values[1].kind, TokenKind::Integer(5));
    assert_eq!(program.eqvs["M"][0].kind, TokenKind::Integer(5));
}

#[test]
fn eqv_can_introduce_a_label() {
    let program = run(".eqv START here:\nSTART nop\n");
    assert_eq!(addr(&program, "here"), 0x0040_0000);
    assert_eq!(program.text.len(), 1);
}

#[test]
fn eqv_namespace() {
    assert_eq!(
        fail(".eqv N 1\n.eqv N 2\n"),
        ErrorKind::EqvRedefinition("N".into())
    );
    assert_eq!(
        fail("N: nop\n.eqv N 2\n"),
        ErrorKind::NamespaceClash("N".into())
    );
    assert_eq!(
        fail(".eqv N 1\n.globl N\n"),
        ErrorKind::Expected {
            expected: "a label name".into(),
            found: "1".into()
        }
    );
    assert_eq!(
        fail(".eqv N .macro\n"),
        ErrorKind::DirectiveInBody(Directive::Macro, Directive::Eqv)
    );
}

#[test]
fn macro_is_expanded_in_place() {
    let program = run(".macro inc(%r)\naddi %r, %r, 1\n.end_macro\ninc($t0)\ninc($t1)\n");
    assert_eq!(program.text.len(), 2);
    let first = &program.text[&0x0040_0000];
    assert_eq!(first.tokens[1].kind, TokenKind::Register(Reg::T0));
    let second = &program.text[&0x0040_0004];
    assert_eq!(second.tokens[2].kind, TokenKind::Register(Reg::T1));
    // body provenance is kept
    assert_eq!(first.line, 2);
    assert_eq!(program.macros.len(), 1);
}

#[test]
fn macro_labels_are_local() {
    let src = ".macro loop(%n)\nL: beq %n, %n, L\n.end_macro\nloop($t0)\nloop($t1)\n";
    let program = run(src);
    assert_eq!(addr(&program, "loop:1@1_L"), 0x0040_0000);
    assert_eq!(addr(&program, "loop:1@2_L"), 0x0040_0004);
    assert!(program.labels.get("L").is_none());
}

#[test]
fn nested_invocation_is_recorded_expanded() {
    let src = "\
.macro a(%x)
L: addi %x, %x, 1
.end_macro
.macro b(%y)
a(%y)
.end_macro
b($t0)
b($t1)
";
    let program = run(src);
    assert!(program.labels.contains("b:1@1_a:1@1_L"));
    assert!(program.labels.contains("b:1@2_a:1@1_L"));
    assert_eq!(
        program.text[&0x0040_0004].tokens[1].kind,
        TokenKind::Register(Reg::T1)
    );
}

#[test]
fn macro_errors() {
    assert_eq!(
        fail(".macro m()\nnop\n"),
        ErrorKind::UnterminatedMacro("m".into())
    );
    assert_eq!(fail("foo(1)\n"), ErrorKind::UnknownMacro("foo".into(), 1));
    assert_eq!(
        fail(".macro m()\n.eqv X 1\n.end_macro\n"),
        ErrorKind::DirectiveInBody(Directive::Eqv, Directive::Macro)
    );
    assert_eq!(
        fail(".macro m(%a)\nadd %a, %a, %b\n.end_macro\n"),
        ErrorKind::UndefinedParameter("b".into())
    );
    assert_eq!(
        fail(".macro m(%a, %a)\n.end_macro\n"),
        ErrorKind::DuplicateParameter("a".into())
    );
    assert!(matches!(
        fail(".macro m\nnop\n.end_macro\n"),
        ErrorKind::MacroSignature(_)
    ));
    assert_eq!(
        fail(".macro m()\n.end_macro\n.macro m()\n.end_macro\n"),
        ErrorKind::MacroRedefinition("m".into(), 0)
    );
    assert_eq!(fail(".end_macro\n"), ErrorKind::StrayEndMacro);
}

#[test]
fn stray_source_directive() {
    assert_eq!(
        fail("nop .eqv\n"),
        ErrorKind::StrayDirective(Directive::Eqv)
    );
}

#[test]
fn align_pads_with_zeros() {
    let program = run(".data\n.byte 1\n.align 2\n.byte 2\n");
    let pad = &program.data[&0x1001_0001];
    assert_eq!(pad.directive, Directive::Space);
    assert_eq!(pad.size(), 3);
    assert!(program.data.contains_key(&0x1001_0004));
}

#[test]
fn align_when_aligned_is_a_no_op() {
    let program = run(".data\n.align 2\n.word 7\n");
    assert_eq!(program.data.len(), 1);
    assert!(program.data.contains_key(&0x1001_0000));
}

#[test]
fn data_is_aligned_to_its_width() {
    let program = run(".data\n.byte 1\nw: .word 2\n");
    assert_eq!(addr(&program, "w"), 0x1001_0004);
    assert!(program.data.contains_key(&0x1001_0004));

    let packed = run(".data\n.align 0\n.byte 1\nw: .word 2\n");
    assert_eq!(addr(&packed, "w"), 0x1001_0001);
}

#[test]
fn data_continues_on_following_lines() {
    let program = run(".data\n.word 1, 2\n3\nnext: 4\n.byte 5\n");
    let words = &program.data[&0x1001_0000];
    assert_eq!(words.values.len(), 4);
    assert_eq!(addr(&program, "next"), 0x1001_000c);
    assert!(program.data.contains_key(&0x1001_0010));
}

#[test]
fn strings_advance_by_length() {
    let program = run(".data\n.asciiz \"ab\"\nafter: .ascii \"x\"\n");
    assert_eq!(addr(&program, "after"), 0x1001_0003);
}

#[test]
fn space_reserves_zeros() {
    let program = run(".data\nbuf: .space 8\nend: .byte 0\n");
    assert_eq!(program.data[&0x1001_0000].size(), 8);
    assert_eq!(addr(&program, "end"), 0x1001_0008);
}

#[test]
fn segment_rules() {
    assert_eq!(
        fail(".text\n.word 1\n"),
        ErrorKind::DataSegmentOnly(Directive::Word)
    );
    assert_eq!(
        fail(".align 2\n"),
        ErrorKind::DataSegmentOnly(Directive::Align)
    );
    assert_eq!(fail(".data\n.align 4\n"), ErrorKind::AlignRange(4));
    assert_eq!(
        fail(".data 0x00400000\n"),
        ErrorKind::AddressOutOfSegment(0x0040_0000, Segment::Data)
    );
    assert_eq!(fail(".text 0x00400002\n"), ErrorKind::Misaligned(0x0040_0002));
    assert_eq!(
        fail(".data\n.word\n"),
        ErrorKind::EmptyDirective(Directive::Word)
    );
}

#[test]
fn explicit_segment_address() {
    let program = run(".ktext 0x80000180\nhandler: eret\n.kdata\nk: .word 1\n");
    assert_eq!(addr(&program, "handler"), 0x8000_0180);
    assert_eq!(addr(&program, "k"), 0x9000_0000);
    assert_eq!(program.ktext.len(), 1);
    assert_eq!(program.kdata.len(), 1);
}

#[test]
fn instruction_overwrite_is_fatal() {
    assert_eq!(
        fail("nop\n.text 0x00400000\nnop\n"),
        ErrorKind::InstructionOverwrite(0x0040_0000)
    );
}

#[test]
fn instruction_in_data_segment_warns() {
    let mut diags = Diagnostics::default();
    let program = run_with(".data\nnop\n", &mut diags).unwrap();
    assert_eq!(diags.warnings().count(), 1);
    assert!(program.text.contains_key(&0x1001_0000));
}

#[test]
fn instruction_in_data_segment_is_word_aligned() {
    let mut diags = Diagnostics::default();
    let program = run_with(".data\n.byte 1\nx: nop\n", &mut diags).unwrap();
    assert_eq!(diags.warnings().count(), 1);
    assert_eq!(addr(&program, "x"), 0x1001_0004);
    assert!(program.text.contains_key(&0x1001_0004));
    assert_eq!(program.data[&0x1001_0001].directive, Directive::Space);
}

#[test]
fn cursor_stays_inside_its_segment() {
    assert_eq!(
        fail(".kdata 0xfffefff0\n.space 32\n"),
        ErrorKind::AddressOutOfSegment(0xffff_000f, Segment::KData)
    );
    assert_eq!(
        fail(".data\n.space 0x7fff0000\n"),
        ErrorKind::AddressOutOfSegment(0x8fff_ffff, Segment::Data)
    );
    let program = run(".kdata 0xfffefff0\n.space 16\n");
    assert_eq!(program.kdata[&0xfffe_fff0].size(), 16);
}

#[test]
fn recursive_macro_is_cut_off() {
    assert_eq!(
        fail(".macro f(%g)\n%g(%g)\n.end_macro\nf(f)\n"),
        ErrorKind::ExpansionDepth("f".into(), MAX_EXPANSION_DEPTH)
    );
}

#[test]
fn unparsable_line_is_dropped() {
    let mut diags = Diagnostics::default();
    let program = run_with("foo bar\n", &mut diags).unwrap();
    assert!(program.text.is_empty());
    assert_eq!(
        diags.warnings().next().unwrap().kind,
        ErrorKind::UnparsableLine
    );
}

#[test]
fn globl_and_extern() {
    let program = run(".globl main\n.extern buf 16\n.extern n 4\nmain: nop\n");
    let main = program.labels.get("main").unwrap();
    assert!(main.valid && main.global);
    assert_eq!(addr(&program, "buf"), 0x1000_0000);
    assert_eq!(addr(&program, "n"), 0x1000_0010);
    assert!(program.labels.get("n").unwrap().global);

    assert_eq!(
        fail(".extern big 65537\n"),
        ErrorKind::ExternExhausted(65537, "big".into())
    );
    assert_eq!(
        fail(".extern all 65536\n.extern more 1\n"),
        ErrorKind::ExternExhausted(1, "more".into())
    );
    assert_eq!(addr(&run(".extern all 65536\n"), "all"), 0x1000_0000);
}

#[test]
fn redefinition_is_fatal() {
    assert_eq!(
        fail("x: nop\nx: nop\n"),
        ErrorKind::LabelRedefinition("x".into())
    );
}

#[test]
fn include_is_not_supported() {
    assert!(matches!(
        fail(".include \"no/such/file.s\"\n"),
        ErrorKind::FileRead(..)
    ));

    let path = std::env::temp_dir().join("mipsasm_include_test.s");
    std::fs::write(&path, "nop\n").unwrap();
    let src = format!(".include \"{}\"\n", path.display());
    assert_eq!(fail(&src), ErrorKind::NotImplemented(".include".into()));
    std::fs::remove_file(&path).ok();
}
