use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::Display;

/// One expected position in an operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Reg,
    FReg,
    /// Immediate with the given field width in bits.
    Imm(u8),
    /// Branch target, packed as a 16-bit word offset from `pc + 4`.
    Branch,
    /// Jump target, packed as a 26-bit word address.
    Jump,
    LParen,
    RParen,
}

impl Slot {
    /// Whether this slot yields a value in the resolved operand array.
    pub fn is_operand(&self) -> bool {
        !matches!(self, Slot::LParen | Slot::RParen)
    }
}

/// The closed set of operand shapes an instruction's syntax may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Shape {
    /// `syscall`
    None,
    /// `break [code]`
    Code20,
    /// `add $rd, $rs, $rt`
    RRR,
    /// `sll $rd, $rt, shamt`
    RRShamt,
    /// `addi $rt, $rs, imm`
    RRImm,
    /// `lui $rt, imm`
    RImm,
    /// `lw $rt, offset($base)`
    RMem,
    /// `mult $rs, $rt`
    RR,
    /// `jr $rs`
    R,
    /// `teq $rs, $rt [, code]`
    RRCode,
    /// `movf $rd, $rs, cc`
    RRCc,
    /// `j target`
    Jump,
    /// `beq $rs, $rt, target`
    RRBranch,
    /// `bgez $rs, target`
    RBranch,
    /// `bc1t target`
    Branch,
    /// `add.s $fd, $fs, $ft`
    FFF,
    /// `mov.s $fd, $fs`
    FF,
    /// `mfc1 $rt, $fs`
    RF,
    /// `lwc1 $ft, offset($base)`
    FMem,
}

impl Shape {
    pub fn slots(&self) -> &'static [Slot] {
        use Slot::*;
        match self {
            Shape::None => &[],
            Shape::Code20 => &[Imm(20)],
            Shape::RRR => &[Reg, Reg, Reg],
            Shape::RRShamt => &[Reg, Reg, Imm(5)],
            Shape::RRImm => &[Reg, Reg, Imm(16)],
            Shape::RImm => &[Reg, Imm(16)],
            Shape::RMem => &[Reg, Imm(16), LParen, Reg, RParen],
            Shape::RR => &[Reg, Reg],
            Shape::R => &[Reg],
            Shape::RRCode => &[Reg, Reg, Imm(10)],
            Shape::RRCc => &[Reg, Reg, Imm(3)],
            Shape::Jump => &[Jump],
            Shape::RRBranch => &[Reg, Reg, Branch],
            Shape::RBranch => &[Reg, Branch],
            Shape::Branch => &[Branch],
            Shape::FFF => &[FReg, FReg, FReg],
            Shape::FF => &[FReg, FReg],
            Shape::RF => &[Reg, FReg],
            Shape::FMem => &[FReg, Imm(16), LParen, Reg, RParen],
        }
    }

    /// Trap family: the trailing code operand may be omitted and defaults to 0.
    pub fn optional_code(&self) -> bool {
        matches!(self, Shape::Code20 | Shape::RRCode)
    }
}

/// Bit-packing function: resolved operands in slot order to a 32-bit word.
pub type Encode = fn(&[i32]) -> u32;

#[derive(Debug, Clone, Copy)]
pub struct InstDef {
    pub mnemonic: &'static str,
    pub shape: Shape,
    pub encode: Encode,
    pub description: &'static str,
}

// ----------------------------------------------------------------------------
// Field packing

fn field(value: i32, bits: u32, shift: u32) -> u32 {
    ((value as u32) & ((1u32 << bits) - 1)) << shift
}

fn rtype(rs: i32, rt: i32, rd: i32, shamt: i32, funct: u32) -> u32 {
    field(rs, 5, 21) | field(rt, 5, 16) | field(rd, 5, 11) | field(shamt, 5, 6) | funct
}

fn special2(rs: i32, rt: i32, rd: i32, funct: u32) -> u32 {
    0x1c << 26 | rtype(rs, rt, rd, 0, funct)
}

fn itype(op: u32, rs: i32, rt: i32, imm: i32) -> u32 {
    op << 26 | field(rs, 5, 21) | field(rt, 5, 16) | field(imm, 16, 0)
}

fn cop1(fmt: u32, ft: i32, fs: i32, fd: i32, funct: u32) -> u32 {
    0x11 << 26 | fmt << 21 | field(ft, 5, 16) | field(fs, 5, 11) | field(fd, 5, 6) | funct
}

const FMT_S: u32 = 0x10;

macro_rules! catalog {
    ($($mnemonic:literal => $shape:ident, $desc:literal, |$ops:ident| $body:expr;)*) => {
        vec![
            $(
                InstDef {
                    mnemonic: $mnemonic,
                    shape: Shape::$shape,
                    encode: {
                        fn encode($ops: &[i32]) -> u32 {
                            $body
                        }
                        encode
                    },
                    description: $desc,
                },
            )*
        ]
    };
}

fn definitions() -> Vec<InstDef> {
    catalog! {
        // Three register ALU
        "add" => RRR, "rd = rs + rt, trap on overflow", |o| rtype(o[1], o[2], o[0], 0, 0x20);
        "addu" => RRR, "rd = rs + rt", |o| rtype(o[1], o[2], o[0], 0, 0x21);
        "sub" => RRR, "rd = rs - rt, trap on overflow", |o| rtype(o[1], o[2], o[0], 0, 0x22);
        "subu" => RRR, "rd = rs - rt", |o| rtype(o[1], o[2], o[0], 0, 0x23);
        "and" => RRR, "rd = rs & rt", |o| rtype(o[1], o[2], o[0], 0, 0x24);
        "or" => RRR, "rd = rs | rt", |o| rtype(o[1], o[2], o[0], 0, 0x25);
        "xor" => RRR, "rd = rs ^ rt", |o| rtype(o[1], o[2], o[0], 0, 0x26);
        "nor" => RRR, "rd = !(rs | rt)", |o| rtype(o[1], o[2], o[0], 0, 0x27);
        "slt" => RRR, "rd = rs < rt (signed)", |o| rtype(o[1], o[2], o[0], 0, 0x2a);
        "sltu" => RRR, "rd = rs < rt (unsigned)", |o| rtype(o[1], o[2], o[0], 0, 0x2b);
        "movz" => RRR, "rd = rs if rt == 0", |o| rtype(o[1], o[2], o[0], 0, 0x0a);
        "movn" => RRR, "rd = rs if rt != 0", |o| rtype(o[1], o[2], o[0], 0, 0x0b);
        "sllv" => RRR, "rd = rt << rs", |o| rtype(o[2], o[1], o[0], 0, 0x04);
        "srlv" => RRR, "rd = rt >> rs (logical)", |o| rtype(o[2], o[1], o[0], 0, 0x06);
        "srav" => RRR, "rd = rt >> rs (arithmetic)", |o| rtype(o[2], o[1], o[0], 0, 0x07);
        "mul" => RRR, "rd = low word of rs * rt", |o| special2(o[1], o[2], o[0], 0x02);

        // Shifts by constant
        "sll" => RRShamt, "rd = rt << shamt", |o| rtype(0, o[1], o[0], o[2], 0x00);
        "srl" => RRShamt, "rd = rt >> shamt (logical)", |o| rtype(0, o[1], o[0], o[2], 0x02);
        "sra" => RRShamt, "rd = rt >> shamt (arithmetic)", |o| rtype(0, o[1], o[0], o[2], 0x03);

        // Immediate ALU
        "addi" => RRImm, "rt = rs + imm, trap on overflow", |o| itype(0x08, o[1], o[0], o[2]);
        "addiu" => RRImm, "rt = rs + imm", |o| itype(0x09, o[1], o[0], o[2]);
        "slti" => RRImm, "rt = rs < imm (signed)", |o| itype(0x0a, o[1], o[0], o[2]);
        "sltiu" => RRImm, "rt = rs < imm (unsigned)", |o| itype(0x0b, o[1], o[0], o[2]);
        "andi" => RRImm, "rt = rs & imm", |o| itype(0x0c, o[1], o[0], o[2]);
        "ori" => RRImm, "rt = rs | imm", |o| itype(0x0d, o[1], o[0], o[2]);
        "xori" => RRImm, "rt = rs ^ imm", |o| itype(0x0e, o[1], o[0], o[2]);
        "lui" => RImm, "rt = imm << 16", |o| itype(0x0f, 0, o[0], o[1]);

        // Loads and stores
        "lb" => RMem, "load byte", |o| itype(0x20, o[2], o[0], o[1]);
        "lh" => RMem, "load halfword", |o| itype(0x21, o[2], o[0], o[1]);
        "lw" => RMem, "load word", |o| itype(0x23, o[2], o[0], o[1]);
        "lbu" => RMem, "load byte unsigned", |o| itype(0x24, o[2], o[0], o[1]);
        "lhu" => RMem, "load halfword unsigned", |o| itype(0x25, o[2], o[0], o[1]);
        "sb" => RMem, "store byte", |o| itype(0x28, o[2], o[0], o[1]);
        "sh" => RMem, "store halfword", |o| itype(0x29, o[2], o[0], o[1]);
        "sw" => RMem, "store word", |o| itype(0x2b, o[2], o[0], o[1]);
        "ll" => RMem, "load linked", |o| itype(0x30, o[2], o[0], o[1]);
        "sc" => RMem, "store conditional", |o| itype(0x38, o[2], o[0], o[1]);

        // HI/LO
        "mult" => RR, "hi:lo = rs * rt (signed)", |o| rtype(o[0], o[1], 0, 0, 0x18);
        "multu" => RR, "hi:lo = rs * rt (unsigned)", |o| rtype(o[0], o[1], 0, 0, 0x19);
        "div" => RR, "lo = rs / rt, hi = rs % rt (signed)", |o| rtype(o[0], o[1], 0, 0, 0x1a);
        "divu" => RR, "lo = rs / rt, hi = rs % rt (unsigned)", |o| rtype(o[0], o[1], 0, 0, 0x1b);
        "madd" => RR, "hi:lo += rs * rt (signed)", |o| special2(o[0], o[1], 0, 0x00);
        "maddu" => RR, "hi:lo += rs * rt (unsigned)", |o| special2(o[0], o[1], 0, 0x01);
        "msub" => RR, "hi:lo -= rs * rt (signed)", |o| special2(o[0], o[1], 0, 0x04);
        "msubu" => RR, "hi:lo -= rs * rt (unsigned)", |o| special2(o[0], o[1], 0, 0x05);
        "clz" => RR, "rd = leading zeros of rs", |o| special2(o[1], o[0], o[0], 0x20);
        "clo" => RR, "rd = leading ones of rs", |o| special2(o[1], o[0], o[0], 0x21);
        "mfhi" => R, "rd = hi", |o| rtype(0, 0, o[0], 0, 0x10);
        "mthi" => R, "hi = rs", |o| rtype(o[0], 0, 0, 0, 0x11);
        "mflo" => R, "rd = lo", |o| rtype(0, 0, o[0], 0, 0x12);
        "mtlo" => R, "lo = rs", |o| rtype(o[0], 0, 0, 0, 0x13);

        // Conditional moves on FP condition flags
        "movf" => RRCc, "rd = rs if fp flag cc is false", |o| rtype(o[1], o[2] << 2, o[0], 0, 0x01);
        "movt" => RRCc, "rd = rs if fp flag cc is true", |o| rtype(o[1], o[2] << 2 | 1, o[0], 0, 0x01);

        // Jumps
        "j" => Jump, "jump to target", |o| 0x02 << 26 | field(o[0], 26, 0);
        "jal" => Jump, "jump to target and link in $ra", |o| 0x03 << 26 | field(o[0], 26, 0);
        "jr" => R, "jump to rs", |o| rtype(o[0], 0, 0, 0, 0x08);
        "jalr" => RR, "jump to rs and link in rd", |o| rtype(o[1], 0, o[0], 0, 0x09);

        // Branches
        "beq" => RRBranch, "branch if rs == rt", |o| itype(0x04, o[0], o[1], o[2]);
        "bne" => RRBranch, "branch if rs != rt", |o| itype(0x05, o[0], o[1], o[2]);
        "blez" => RBranch, "branch if rs <= 0", |o| itype(0x06, o[0], 0, o[1]);
        "bgtz" => RBranch, "branch if rs > 0", |o| itype(0x07, o[0], 0, o[1]);
        "bltz" => RBranch, "branch if rs < 0", |o| itype(0x01, o[0], 0x00, o[1]);
        "bgez" => RBranch, "branch if rs >= 0", |o| itype(0x01, o[0], 0x01, o[1]);
        "bltzal" => RBranch, "branch and link if rs < 0", |o| itype(0x01, o[0], 0x10, o[1]);
        "bgezal" => RBranch, "branch and link if rs >= 0", |o| itype(0x01, o[0], 0x11, o[1]);
        "bc1f" => Branch, "branch if fp flag 0 is false", |o| itype(0x11, 0x08, 0x00, o[0]);
        "bc1t" => Branch, "branch if fp flag 0 is true", |o| itype(0x11, 0x08, 0x01, o[0]);

        // Traps
        "teq" => RRCode, "trap if rs == rt", |o| rtype(o[0], o[1], 0, 0, 0x34) | field(o[2], 10, 6);
        "tne" => RRCode, "trap if rs != rt", |o| rtype(o[0], o[1], 0, 0, 0x36) | field(o[2], 10, 6);
        "tge" => RRCode, "trap if rs >= rt (signed)", |o| rtype(o[0], o[1], 0, 0, 0x30) | field(o[2], 10, 6);
        "tgeu" => RRCode, "trap if rs >= rt (unsigned)", |o| rtype(o[0], o[1], 0, 0, 0x31) | field(o[2], 10, 6);
        "tlt" => RRCode, "trap if rs < rt (signed)", |o| rtype(o[0], o[1], 0, 0, 0x32) | field(o[2], 10, 6);
        "tltu" => RRCode, "trap if rs < rt (unsigned)", |o| rtype(o[0], o[1], 0, 0, 0x33) | field(o[2], 10, 6);
        "teqi" => RImm, "trap if rs == imm", |o| itype(0x01, o[0], 0x0c, o[1]);
        "tnei" => RImm, "trap if rs != imm", |o| itype(0x01, o[0], 0x0e, o[1]);
        "tgei" => RImm, "trap if rs >= imm (signed)", |o| itype(0x01, o[0], 0x08, o[1]);
        "tgeiu" => RImm, "trap if rs >= imm (unsigned)", |o| itype(0x01, o[0], 0x09, o[1]);
        "tlti" => RImm, "trap if rs < imm (signed)", |o| itype(0x01, o[0], 0x0a, o[1]);
        "tltiu" => RImm, "trap if rs < imm (unsigned)", |o| itype(0x01, o[0], 0x0b, o[1]);

        // System
        "syscall" => None, "system call", |_o| 0x0000_000c;
        "break" => Code20, "breakpoint exception", |o| field(o[0], 20, 6) | 0x0d;
        "eret" => None, "return from exception", |_o| 0x4200_0018;
        "nop" => None, "no operation", |_o| 0x0000_0000;

        // Coprocessor 1, single precision
        "add.s" => FFF, "fd = fs + ft", |o| cop1(FMT_S, o[2], o[1], o[0], 0x00);
        "sub.s" => FFF, "fd = fs - ft", |o| cop1(FMT_S, o[2], o[1], o[0], 0x01);
        "mul.s" => FFF, "fd = fs * ft", |o| cop1(FMT_S, o[2], o[1], o[0], 0x02);
        "div.s" => FFF, "fd = fs / ft", |o| cop1(FMT_S, o[2], o[1], o[0], 0x03);
        "sqrt.s" => FF, "fd = sqrt(fs)", |o| cop1(FMT_S, 0, o[1], o[0], 0x04);
        "abs.s" => FF, "fd = |fs|", |o| cop1(FMT_S, 0, o[1], o[0], 0x05);
        "mov.s" => FF, "fd = fs", |o| cop1(FMT_S, 0, o[1], o[0], 0x06);
        "neg.s" => FF, "fd = -fs", |o| cop1(FMT_S, 0, o[1], o[0], 0x07);
        "c.eq.s" => FF, "fp flag 0 = fs == ft", |o| cop1(FMT_S, o[1], o[0], 0, 0x32);
        "c.lt.s" => FF, "fp flag 0 = fs < ft", |o| cop1(FMT_S, o[1], o[0], 0, 0x3c);
        "c.le.s" => FF, "fp flag 0 = fs <= ft", |o| cop1(FMT_S, o[1], o[0], 0, 0x3e);
        "mfc1" => RF, "rt = fs", |o| cop1(0x00, o[0], o[1], 0, 0);
        "mtc1" => RF, "fs = rt", |o| cop1(0x04, o[0], o[1], 0, 0);
        "lwc1" => FMem, "load word into fp register", |o| itype(0x31, o[2], o[0], o[1]);
        "swc1" => FMem, "store word from fp register", |o| itype(0x39, o[2], o[0], o[1]);
    }
}

static CATALOG: Lazy<HashMap<&'static str, InstDef>> = Lazy::new(|| {
    definitions()
        .into_iter()
        .map(|def| (def.mnemonic, def))
        .collect()
});

pub fn lookup(mnemonic: &str) -> Option<&'static InstDef> {
    CATALOG.get(mnemonic)
}

pub fn is_mnemonic(s: &str) -> bool {
    CATALOG.contains_key(s)
}

pub fn mnemonics() -> impl Iterator<Item = &'static str> {
    CATALOG.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_encode {
        ($($name:ident: $mnemonic:literal $ops:expr => $word:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let def = lookup($mnemonic).unwrap();
                    let word = (def.encode)(&$ops);
                    assert_eq!(word, $word, "{} encoded as {:#010x}", $mnemonic, word);
                }
            )*
        }
    }

    test_encode! {
        test_add: "add" [8, 9, 10] => 0x012a_4020,
        test_addi: "addi" [8, 9, 100] => 0x2128_0064,
        test_addi_negative: "addi" [8, 9, -1] => 0x2128_ffff,
        test_lui: "lui" [1, 0x1001] => 0x3c01_1001,
        test_lw: "lw" [8, 4, 29] => 0x8fa8_0004,
        test_sw: "sw" [31, -4, 29] => 0xafbf_fffc,
        test_sll: "sll" [8, 9, 2] => 0x0009_4080,
        test_sllv: "sllv" [8, 9, 10] => 0x0149_4004,
        test_mult: "mult" [8, 9] => 0x0109_0018,
        test_mfhi: "mfhi" [8] => 0x0000_4010,
        test_jr: "jr" [31] => 0x03e0_0008,
        test_jalr: "jalr" [31, 8] => 0x0100_f809,
        test_j: "j" [0x0010_0000] => 0x0810_0000,
        test_jal: "jal" [0x0010_0003] => 0x0c10_0003,
        test_beq: "beq" [8, 9, -1] => 0x1109_ffff,
        test_bgez: "bgez" [8, 2] => 0x0501_0002,
        test_syscall: "syscall" [] => 0x0000_000c,
        test_break: "break" [1] => 0x0000_004d,
        test_teq: "teq" [8, 9, 0] => 0x0109_0034,
        test_mul: "mul" [8, 9, 10] => 0x712a_4002,
        test_add_s: "add.s" [0, 1, 2] => 0x4602_0800,
        test_lwc1: "lwc1" [0, 8, 29] => 0xc7a0_0008,
        test_mtc1: "mtc1" [8, 0] => 0x4488_0000,
    }

    #[test]
    fn every_mnemonic_has_a_shape() {
        for name in mnemonics() {
            let def = lookup(name).unwrap();
            assert_eq!(def.mnemonic, name);
            let operands = def.shape.slots().iter().filter(|s| s.is_operand()).count();
            // indexes past the shape's operand count would panic here
            (def.encode)(&vec![0; operands]);
        }
    }

    #[test]
    fn trap_family_has_optional_code() {
        assert!(lookup("teq").unwrap().shape.optional_code());
        assert!(lookup("break").unwrap().shape.optional_code());
        assert!(!lookup("add").unwrap().shape.optional_code());
        assert!(!is_mnemonic("hoge"));
    }
}
