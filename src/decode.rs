//! Instruction decoder
//!
//! Maps a 32-bit instruction word to an operation descriptor: a tag
//! from [`Op`] plus every field slot the executor might read. Decoding
//! is a pure function of the instruction word; anything that does not
//! match a defined encoding decodes to [`Op::Illegal`], which the
//! executor turns into an illegal-instruction trap.

use crate::opcodes::*;
use crate::utils::{extract_field, sign_extend};

/// Operations of the RV32I base set and the Zicsr extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Sb,
    Sh,
    Sw,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Fence,
    FenceI,
    Ecall,
    Ebreak,
    Mret,
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
    Illegal,
}

impl Op {
    /// Canonical assembly mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Lui => "lui",
            Op::Auipc => "auipc",
            Op::Jal => "jal",
            Op::Jalr => "jalr",
            Op::Beq => "beq",
            Op::Bne => "bne",
            Op::Blt => "blt",
            Op::Bge => "bge",
            Op::Bltu => "bltu",
            Op::Bgeu => "bgeu",
            Op::Lb => "lb",
            Op::Lh => "lh",
            Op::Lw => "lw",
            Op::Lbu => "lbu",
            Op::Lhu => "lhu",
            Op::Sb => "sb",
            Op::Sh => "sh",
            Op::Sw => "sw",
            Op::Addi => "addi",
            Op::Slti => "slti",
            Op::Sltiu => "sltiu",
            Op::Xori => "xori",
            Op::Ori => "ori",
            Op::Andi => "andi",
            Op::Slli => "slli",
            Op::Srli => "srli",
            Op::Srai => "srai",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Sll => "sll",
            Op::Slt => "slt",
            Op::Sltu => "sltu",
            Op::Xor => "xor",
            Op::Srl => "srl",
            Op::Sra => "sra",
            Op::Or => "or",
            Op::And => "and",
            Op::Fence => "fence",
            Op::FenceI => "fence.i",
            Op::Ecall => "ecall",
            Op::Ebreak => "ebreak",
            Op::Mret => "mret",
            Op::Csrrw => "csrrw",
            Op::Csrrs => "csrrs",
            Op::Csrrc => "csrrc",
            Op::Csrrwi => "csrrwi",
            Op::Csrrsi => "csrrsi",
            Op::Csrrci => "csrrci",
            Op::Illegal => "illegal_instruction",
        }
    }
}

/// Decoded form of one instruction word
///
/// Every field slot is populated whether or not the operation uses
/// it, so executors always read a uniform record. The immediate is
/// already sign-extended where the format calls for it; R-type
/// operations carry imm = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDescriptor {
    pub op: Op,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub funct7: u8,
    /// Shift amount for the immediate shifts (the five-bit rs2 field)
    pub shamt: u8,
    pub csr: u16,
    pub imm: u32,
}

/// Decode a 32-bit instruction word. Pure: the same word always
/// yields the same descriptor.
pub fn decode(inst: u32) -> OpDescriptor {
    let opcode = extract_field(inst, 6, 0);
    let rd = extract_field(inst, 11, 7) as u8;
    let funct3 = extract_field(inst, 14, 12) as u8;
    let rs1 = extract_field(inst, 19, 15) as u8;
    let rs2 = extract_field(inst, 24, 20) as u8;
    let funct7 = extract_field(inst, 31, 25) as u8;
    let shamt = rs2;
    let csr = extract_field(inst, 31, 20) as u16;

    let imm_i = sign_extend(extract_field(inst, 31, 20), 11);
    let imm_s = sign_extend(
        extract_field(inst, 31, 25) << 5 | extract_field(inst, 11, 7),
        11,
    );
    let imm_b = sign_extend(
        extract_field(inst, 31, 31) << 12
            | extract_field(inst, 7, 7) << 11
            | extract_field(inst, 30, 25) << 5
            | extract_field(inst, 11, 8) << 1,
        12,
    );
    let imm_u = extract_field(inst, 31, 12) << 12;
    let imm_j = sign_extend(
        extract_field(inst, 31, 31) << 20
            | extract_field(inst, 19, 12) << 12
            | extract_field(inst, 20, 20) << 11
            | extract_field(inst, 30, 21) << 1,
        20,
    );

    let (op, imm) = match opcode {
        OP_LUI => (Op::Lui, imm_u),
        OP_AUIPC => (Op::Auipc, imm_u),
        OP_JAL => (Op::Jal, imm_j),
        OP_JALR => (Op::Jalr, imm_i),
        OP_BRANCH => {
            let op = match u32::from(funct3) {
                FUNCT3_BEQ => Op::Beq,
                FUNCT3_BNE => Op::Bne,
                FUNCT3_BLT => Op::Blt,
                FUNCT3_BGE => Op::Bge,
                FUNCT3_BLTU => Op::Bltu,
                FUNCT3_BGEU => Op::Bgeu,
                _ => Op::Illegal,
            };
            (op, imm_b)
        }
        OP_LOAD => {
            let op = match funct3 {
                0 => Op::Lb,
                1 => Op::Lh,
                2 => Op::Lw,
                4 => Op::Lbu,
                5 => Op::Lhu,
                _ => Op::Illegal,
            };
            (op, imm_i)
        }
        OP_STORE => {
            let op = match funct3 {
                0 => Op::Sb,
                1 => Op::Sh,
                2 => Op::Sw,
                _ => Op::Illegal,
            };
            (op, imm_s)
        }
        OP_IMM => match funct3 {
            0 => (Op::Addi, imm_i),
            2 => (Op::Slti, imm_i),
            3 => (Op::Sltiu, imm_i),
            4 => (Op::Xori, imm_i),
            6 => (Op::Ori, imm_i),
            7 => (Op::Andi, imm_i),
            // The shifts take their immediate from the shamt field;
            // funct7 must be one of the two defined values
            1 => match u32::from(funct7) {
                0 => (Op::Slli, shamt.into()),
                _ => (Op::Illegal, 0),
            },
            5 => match u32::from(funct7) {
                0 => (Op::Srli, shamt.into()),
                FUNCT7_ALT => (Op::Srai, shamt.into()),
                _ => (Op::Illegal, 0),
            },
            _ => (Op::Illegal, 0),
        },
        OP => {
            let op = match (u32::from(funct3), u32::from(funct7)) {
                (0, 0) => Op::Add,
                (0, FUNCT7_ALT) => Op::Sub,
                (1, 0) => Op::Sll,
                (2, 0) => Op::Slt,
                (3, 0) => Op::Sltu,
                (4, 0) => Op::Xor,
                (5, 0) => Op::Srl,
                (5, FUNCT7_ALT) => Op::Sra,
                (6, 0) => Op::Or,
                (7, 0) => Op::And,
                _ => Op::Illegal,
            };
            (op, 0)
        }
        OP_MISC_MEM => {
            let op = match funct3 {
                0 => Op::Fence,
                1 => Op::FenceI,
                _ => Op::Illegal,
            };
            (op, imm_i)
        }
        OP_SYSTEM => {
            let op = match u32::from(funct3) {
                0 => match csr {
                    0x000 => Op::Ecall,
                    0x001 => Op::Ebreak,
                    0x302 => Op::Mret,
                    _ => Op::Illegal,
                },
                FUNCT3_CSRRW => Op::Csrrw,
                FUNCT3_CSRRS => Op::Csrrs,
                FUNCT3_CSRRC => Op::Csrrc,
                FUNCT3_CSRRWI => Op::Csrrwi,
                FUNCT3_CSRRSI => Op::Csrrsi,
                FUNCT3_CSRRCI => Op::Csrrci,
                _ => Op::Illegal,
            };
            (op, imm_i)
        }
        _ => (Op::Illegal, 0),
    };

    OpDescriptor {
        op,
        rd,
        rs1,
        rs2,
        funct3,
        funct7,
        shamt,
        csr,
        imm,
    }
}
