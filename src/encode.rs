//! Instruction-word builders
//!
//! Assemble RV32I and Zicsr instruction words from register numbers
//! and immediates. Only produces valid encodings when the arguments
//! are in range; out-of-range immediates are truncated to their
//! field width. Used throughout the test suites to write programs
//! into simulated memory.

use crate::opcodes::*;
use crate::utils::{extract_field, interpret_i32_as_unsigned};

/// Pack an I-type instruction
pub fn itype(imm: u32, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    extract_field(imm, 11, 0) << 20
        | u32::from(rs1) << 15
        | funct3 << 12
        | u32::from(rd) << 7
        | opcode
}

/// Pack a U- or J-type instruction (for J-type, build the 20-bit
/// field with jtype_imm_field first)
pub fn ujtype(imm: u32, rd: u8, opcode: u32) -> u32 {
    imm << 12 | u32::from(rd) << 7 | opcode
}

/// Pack an R- or S-type instruction; both split the same way. The
/// meaning of a and b is:
///
/// R-type: a = funct7, b = rd
/// S-type: a = imm[11:5], b = imm[4:0]
pub fn rstype(a: u32, rs2: u8, rs1: u8, funct3: u32, b: u32, opcode: u32) -> u32 {
    a << 25
        | u32::from(rs2) << 20
        | u32::from(rs1) << 15
        | funct3 << 12
        | b << 7
        | opcode
}

/// Shuffle a byte offset into the 20-bit J-type immediate field
pub fn jtype_imm_field(offset: i32) -> u32 {
    let imm = interpret_i32_as_unsigned(offset);
    let imm20 = extract_field(imm, 20, 20);
    let imm19_12 = extract_field(imm, 19, 12);
    let imm11 = extract_field(imm, 11, 11);
    let imm10_1 = extract_field(imm, 10, 1);
    (imm20 << 19) | (imm10_1 << 9) | (imm11 << 8) | imm19_12
}

/// Returns (a, b) for rstype for the conditional branches
pub fn btype_imm_fields(offset: i32) -> (u32, u32) {
    let imm = interpret_i32_as_unsigned(offset);
    let imm12 = extract_field(imm, 12, 12);
    let imm11 = extract_field(imm, 11, 11);
    let imm10_5 = extract_field(imm, 10, 5);
    let imm4_1 = extract_field(imm, 4, 1);
    let a = (imm12 << 6) | imm10_5;
    let b = (imm4_1 << 1) | imm11;
    (a, b)
}

macro_rules! utype_instr {
    ($name:ident, $opcode:expr) => {
        /// The immediate is the value for the upper 20 bits, not a
        /// pre-shifted 32-bit value.
        pub fn $name(rd: u8, imm: u32) -> u32 {
            ujtype(extract_field(imm, 19, 0), rd, $opcode)
        }
    };
}

macro_rules! itype_instr {
    ($name:ident, $funct3:expr, $opcode:expr) => {
        pub fn $name(rd: u8, rs1: u8, imm: i32) -> u32 {
            itype(interpret_i32_as_unsigned(imm), rs1, $funct3, rd, $opcode)
        }
    };
}

macro_rules! shift_instr {
    ($name:ident, $funct7:expr, $funct3:expr) => {
        pub fn $name(rd: u8, rs1: u8, shamt: u32) -> u32 {
            let imm = ($funct7 << 5) | extract_field(shamt, 4, 0);
            itype(imm, rs1, $funct3, rd, OP_IMM)
        }
    };
}

macro_rules! rtype_instr {
    ($name:ident, $funct7:expr, $funct3:expr) => {
        pub fn $name(rd: u8, rs1: u8, rs2: u8) -> u32 {
            rstype($funct7, rs2, rs1, $funct3, rd.into(), OP)
        }
    };
}

macro_rules! stype_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(rs2: u8, rs1: u8, offset: i32) -> u32 {
            let imm = interpret_i32_as_unsigned(offset);
            let imm11_5 = extract_field(imm, 11, 5);
            let imm4_0 = extract_field(imm, 4, 0);
            rstype(imm11_5, rs2, rs1, $funct3, imm4_0, OP_STORE)
        }
    };
}

macro_rules! btype_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(rs1: u8, rs2: u8, offset: i32) -> u32 {
            let (a, b) = btype_imm_fields(offset);
            rstype(a, rs2, rs1, $funct3, b, OP_BRANCH)
        }
    };
}

macro_rules! csr_reg_instr {
    ($name:ident, $funct3:expr) => {
        pub fn $name(rd: u8, csr: u16, rs1: u8) -> u32 {
            itype(u32::from(csr), rs1, $funct3, rd, OP_SYSTEM)
        }
    };
}

macro_rules! csr_imm_instr {
    ($name:ident, $funct3:expr) => {
        /// uimm is the five-bit immediate carried in the rs1 field
        pub fn $name(rd: u8, csr: u16, uimm: u8) -> u32 {
            itype(u32::from(csr), uimm, $funct3, rd, OP_SYSTEM)
        }
    };
}

utype_instr!(lui, OP_LUI);
utype_instr!(auipc, OP_AUIPC);

pub fn jal(rd: u8, offset: i32) -> u32 {
    ujtype(jtype_imm_field(offset), rd, OP_JAL)
}

itype_instr!(jalr, 0b000, OP_JALR);

btype_instr!(beq, FUNCT3_BEQ);
btype_instr!(bne, FUNCT3_BNE);
btype_instr!(blt, FUNCT3_BLT);
btype_instr!(bge, FUNCT3_BGE);
btype_instr!(bltu, FUNCT3_BLTU);
btype_instr!(bgeu, FUNCT3_BGEU);

itype_instr!(lb, 0b000, OP_LOAD);
itype_instr!(lh, 0b001, OP_LOAD);
itype_instr!(lw, 0b010, OP_LOAD);
itype_instr!(lbu, 0b100, OP_LOAD);
itype_instr!(lhu, 0b101, OP_LOAD);

stype_instr!(sb, 0b000);
stype_instr!(sh, 0b001);
stype_instr!(sw, 0b010);

itype_instr!(addi, 0b000, OP_IMM);
itype_instr!(slti, 0b010, OP_IMM);
itype_instr!(sltiu, 0b011, OP_IMM);
itype_instr!(xori, 0b100, OP_IMM);
itype_instr!(ori, 0b110, OP_IMM);
itype_instr!(andi, 0b111, OP_IMM);

shift_instr!(slli, 0b0000000, 0b001);
shift_instr!(srli, 0b0000000, 0b101);
shift_instr!(srai, FUNCT7_ALT, 0b101);

rtype_instr!(add, 0b0000000, 0b000);
rtype_instr!(sub, FUNCT7_ALT, 0b000);
rtype_instr!(sll, 0b0000000, 0b001);
rtype_instr!(slt, 0b0000000, 0b010);
rtype_instr!(sltu, 0b0000000, 0b011);
rtype_instr!(xor, 0b0000000, 0b100);
rtype_instr!(srl, 0b0000000, 0b101);
rtype_instr!(sra, FUNCT7_ALT, 0b101);
rtype_instr!(or, 0b0000000, 0b110);
rtype_instr!(and, 0b0000000, 0b111);

pub fn fence() -> u32 {
    itype(0, 0, 0b000, 0, OP_MISC_MEM)
}

pub fn fence_i() -> u32 {
    itype(0, 0, 0b001, 0, OP_MISC_MEM)
}

pub fn ecall() -> u32 {
    itype(0x000, 0, 0b000, 0, OP_SYSTEM)
}

pub fn ebreak() -> u32 {
    itype(0x001, 0, 0b000, 0, OP_SYSTEM)
}

pub fn mret() -> u32 {
    itype(0x302, 0, 0b000, 0, OP_SYSTEM)
}

csr_reg_instr!(csrrw, FUNCT3_CSRRW);
csr_reg_instr!(csrrs, FUNCT3_CSRRS);
csr_reg_instr!(csrrc, FUNCT3_CSRRC);
csr_imm_instr!(csrrwi, FUNCT3_CSRRWI);
csr_imm_instr!(csrrsi, FUNCT3_CSRRSI);
csr_imm_instr!(csrrci, FUNCT3_CSRRCI);
