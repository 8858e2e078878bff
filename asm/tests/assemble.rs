use arch::mem::{MemoryImage, MemoryLayout, Segment};
use mipsasm::classify::{is_identifier, Classifier};
use mipsasm::error::{Category, ErrorKind};
use mipsasm::token::{Directive, TokenKind};
use mipsasm::{Assembler, Assembly, Diagnostics, Settings, Source};

fn case(src: &str) -> (Assembly, MemoryImage) {
    let mut mem = MemoryImage::new(MemoryLayout::default());
    let assembly = Assembler::default()
        .assemble(&[Source::new("case.s", src)], &mut mem)
        .unwrap_or_else(|diags| panic!("{}", diags));
    (assembly, mem)
}

fn fail(settings: Settings, src: &str) -> Diagnostics {
    let mut mem = MemoryImage::new(settings.layout.clone());
    match Assembler::new(settings).assemble(&[Source::new("case.s", src)], &mut mem) {
        Ok(_) => panic!("assembled without error:\n{}", src),
        Err(diags) => diags,
    }
}

fn fatal(diags: &Diagnostics) -> &ErrorKind {
    &diags.errors().next().unwrap().kind
}

#[test]
fn words_land_little_endian() {
    let (_, mem) = case(".data\n.word 1, 2, 3\n");
    assert_eq!(
        mem.read_bytes(0x1001_0000, 12),
        vec![1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]
    );
}

#[test]
fn program_and_data() {
    let src = "\
.data
count: .word 3
msg:   .asciiz \"ok\"
.text
.globl main
main:  lw   $t0, 0($gp)
loop:  addi $t0, $t0, -1
       bne  $t0, $zero, loop
       j    main
";
    let (assembly, mem) = case(src);
    let labels = &assembly.program.labels;
    assert_eq!(labels.get_val("count"), Some(0x1001_0000));
    assert_eq!(labels.get_val("msg"), Some(0x1001_0004));
    assert_eq!(labels.get_val("loop"), Some(0x0040_0004));
    assert!(labels.get("main").unwrap().global);

    assert_eq!(mem.read_word(0x0040_0000), 0x8f88_0000);
    assert_eq!(mem.read_word(0x0040_0004), 0x2108_ffff);
    assert_eq!(mem.read_word(0x0040_0008), 0x1500_fffe);
    assert_eq!(mem.read_word(0x0040_000c), 0x0810_0000);
    assert_eq!(mem.read_bytes(0x1001_0004, 3), b"ok\0".to_vec());
    assert_eq!(assembly.words.len(), 4);
    assert!(assembly.diagnostics.is_empty());
}

#[test]
fn assembling_twice_gives_the_same_result() {
    let src = ".macro m(%r)\nL: addi %r, %r, 1\nbne %r, $zero, L\n.end_macro\nm($t0)\nm($t1)\n";
    let (first, _) = case(src);
    let (second, _) = case(src);
    assert_eq!(first.program, second.program);
    assert_eq!(first.words, second.words);
}

#[test]
fn aligned_cursor_is_left_alone() {
    let (plain, plain_mem) = case(".data\n.word 5\n");
    let (aligned, aligned_mem) = case(".data\n.align 2\n.word 5\n");
    assert!(plain.program.data.keys().eq(aligned.program.data.keys()));
    assert_eq!(
        plain_mem.read_bytes(0x1001_0000, 8),
        aligned_mem.read_bytes(0x1001_0000, 8)
    );
}

#[test]
fn macro_labels_do_not_collide() {
    let src = ".macro spin()\nL: j L\n.end_macro\nspin()\nspin()\n";
    let (assembly, mem) = case(src);
    let labels = &assembly.program.labels;
    assert_eq!(labels.get_val("spin:0@1_L"), Some(0x0040_0000));
    assert_eq!(labels.get_val("spin:0@2_L"), Some(0x0040_0004));
    assert_eq!(mem.read_word(0x0040_0004), 0x0810_0001);
}

#[test]
fn instruction_after_byte_data_only_warns() {
    let (assembly, _) = case(".data\n.byte 1\nnop\n");
    assert_eq!(assembly.diagnostics.warnings().count(), 1);
    assert_eq!(
        assembly.diagnostics.iter().next().unwrap().kind,
        ErrorKind::InstructionInData(Segment::Data)
    );
    assert_eq!(assembly.words.get(&0x1001_0004), Some(&0));
}

#[test]
fn label_redefinition_is_fatal() {
    let diags = fail(Settings::default(), "x: nop\nx: nop\n");
    assert_eq!(fatal(&diags), &ErrorKind::LabelRedefinition("x".into()));
    assert_eq!(fatal(&diags).category(), Category::Semantic);
}

#[test]
fn immediate_overflow_is_a_warning() {
    let (assembly, mem) = case("addi $t0, $t1, 100000\n");
    assert_eq!(mem.read_word(0x0040_0000), 0x2128_86a0);
    assert_eq!(assembly.diagnostics.warnings().count(), 1);
}

#[test]
fn store_offset_warns_but_byte_data_is_fatal() {
    let (assembly, mem) = case("sb $t0, 999999($t1)\n");
    assert_eq!(mem.read_word(0x0040_0000), 0xa128_423f);
    assert_eq!(assembly.diagnostics.warnings().count(), 1);

    let diags = fail(Settings::default(), ".data\n.byte 999999\n");
    assert_eq!(
        fatal(&diags),
        &ErrorKind::DataRange(999999, Directive::Byte)
    );
}

#[test]
fn warnings_can_be_promoted() {
    let settings = Settings {
        warnings_are_errors: true,
        ..Settings::default()
    };
    let diags = fail(settings, "addi $t0, $t1, 100000\n");
    assert_eq!(diags.errors().count(), 1);
    assert_eq!(diags.warnings().count(), 0);
}

#[test]
fn warnings_precede_the_fatal_error() {
    let diags = fail(Settings::default(), "addi $t0, $t1, 100000\nj nowhere\n");
    let all: Vec<_> = diags.iter().collect();
    assert_eq!(all.len(), 2);
    assert!(!all[0].is_error());
    assert_eq!(all[1].kind, ErrorKind::UndefinedLabel("nowhere".into()));
}

#[test]
fn files_share_one_program() {
    let sources = [
        Source::new("a.s", ".globl helper\nmain: jal helper\n"),
        Source::new("b.s", "helper: jr $ra\n"),
    ];
    let mut mem = MemoryImage::default();
    let assembly = Assembler::default().assemble(&sources, &mut mem).unwrap();
    assert_eq!(assembly.program.labels.get_val("helper"), Some(0x0040_0004));
    assert_eq!(mem.read_word(0x0040_0000), 0x0c10_0001);
    let helper = &assembly.program.text[&0x0040_0004];
    assert_eq!(&*helper.file, "b.s");
    assert_eq!(helper.line, 1);
}

#[test]
fn strict_mode_rejects_register_names() {
    let settings = Settings {
        extended: false,
        ..Settings::default()
    };
    let diags = fail(settings.clone(), "add $t0, $t1, $t2\n");
    assert_eq!(
        fatal(&diags),
        &ErrorKind::Expected {
            expected: "a register".into(),
            found: "$t0".into()
        }
    );

    let mut mem = MemoryImage::default();
    Assembler::new(settings)
        .assemble(&[Source::new("n.s", "add $8, $9, $10\n")], &mut mem)
        .unwrap();
    assert_eq!(mem.read_word(0x0040_0000), 0x012a_4020);
}

#[test]
fn identifiers_classify_as_identifiers() {
    let classifier = Classifier::default();
    for name in ["foo", "_x1", "a.b", "$L0", "loop_end", "Main"] {
        assert!(is_identifier(name), "{}", name);
        let mut diags = Diagnostics::default();
        let token = mipsasm::lexer::Lexer::new("p.s", name, classifier)
            .parse(&mut diags)
            .unwrap()
            .remove(0)
            .tokens
            .remove(0);
        assert_eq!(token.kind, TokenKind::Identifier(name.into()), "{}", name);
    }
}
