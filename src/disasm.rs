//! Disassembler
//!
//! Renders a decoded instruction in canonical assembly, using the
//! standard ABI register aliases and the short names of the machine
//! CSRs. Common pseudo-instructions are recognised and rewritten the
//! way an assembler listing would show them (nop, li, j, jr, the
//! zero-comparison branches, and the csr shorthands).

use crate::csr::{
    CSR_MARCHID, CSR_MCAUSE, CSR_MCOUNTEREN, CSR_MEDELEG, CSR_MEPC,
    CSR_MHARTID, CSR_MIDELEG, CSR_MIE, CSR_MIMPID, CSR_MIP, CSR_MISA,
    CSR_MSTATUS, CSR_MTVAL, CSR_MTVEC, CSR_MVENDORID,
};
use crate::decode::{Op, OpDescriptor};
use crate::utils::interpret_u32_as_signed;

/// ABI names of the general-purpose registers, indexed by register
/// number
pub const REG_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1",
    "a2", "a3", "a4", "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

fn reg(which: u8) -> &'static str {
    REG_NAMES[usize::from(which & 0x1f)]
}

/// Short name of a CSR address; unrecognised addresses render as
/// csr_0xNNN
fn csr_name(addr: u16) -> String {
    let name = match addr {
        CSR_MVENDORID => "mvendorid",
        CSR_MARCHID => "marchid",
        CSR_MIMPID => "mimpid",
        CSR_MHARTID => "mhartid",
        CSR_MSTATUS => "mstatus",
        CSR_MISA => "misa",
        CSR_MEDELEG => "medeleg",
        CSR_MIDELEG => "mideleg",
        CSR_MIE => "mie",
        CSR_MTVEC => "mtvec",
        CSR_MCOUNTEREN => "mcounteren",
        CSR_MEPC => "mepc",
        CSR_MCAUSE => "mcause",
        CSR_MTVAL => "mtval",
        CSR_MIP => "mip",
        _ => return format!("csr_0x{addr:x}"),
    };
    name.to_string()
}

fn branch(op: &OpDescriptor, pc: u32) -> String {
    let target = pc.wrapping_add(op.imm);
    let name = op.op.mnemonic();
    format!("{name}\t{},{},{target:x}", reg(op.rs1), reg(op.rs2))
}

fn load(op: &OpDescriptor) -> String {
    let name = op.op.mnemonic();
    let offset = interpret_u32_as_signed(op.imm);
    format!("{name}\t{},{offset}({})", reg(op.rd), reg(op.rs1))
}

fn reg_imm(op: &OpDescriptor) -> String {
    let name = op.op.mnemonic();
    let imm = interpret_u32_as_signed(op.imm);
    format!("{name}\t{},{},{imm}", reg(op.rd), reg(op.rs1))
}

fn shift_imm(op: &OpDescriptor) -> String {
    let name = op.op.mnemonic();
    format!("{name}\t{},{},0x{:x}", reg(op.rd), reg(op.rs1), op.shamt)
}

fn reg_reg(op: &OpDescriptor) -> String {
    let name = op.op.mnemonic();
    format!("{name}\t{},{},{}", reg(op.rd), reg(op.rs1), reg(op.rs2))
}

fn csr_reg(op: &OpDescriptor) -> String {
    let name = op.op.mnemonic();
    format!("{name}\t{},{},{}", reg(op.rd), csr_name(op.csr), reg(op.rs1))
}

fn csr_imm(op: &OpDescriptor) -> String {
    let name = op.op.mnemonic();
    format!("{name}\t{},{},{}", reg(op.rd), csr_name(op.csr), op.rs1)
}

/// Render one decoded instruction. The pc is needed because branch
/// and jump targets are shown as absolute addresses.
pub fn disassemble(pc: u32, op: &OpDescriptor) -> String {
    match op.op {
        Op::Lui | Op::Auipc => format!(
            "{}\t{},0x{:x}",
            op.op.mnemonic(),
            reg(op.rd),
            op.imm >> 12
        ),
        Op::Jal => {
            let target = pc.wrapping_add(op.imm);
            if op.rd == 0 {
                format!("j\t{target:08x}")
            } else {
                format!("jal\t{},{target:08x}", reg(op.rd))
            }
        }
        Op::Jalr => {
            if op.rd == 0 && op.imm == 0 {
                format!("jr\t{}", reg(op.rs1))
            } else {
                let offset = interpret_u32_as_signed(op.imm);
                format!("jalr\t{},{offset}({})", reg(op.rd), reg(op.rs1))
            }
        }
        Op::Beq if op.rs2 == 0 => {
            format!("beqz\t{},{:x}", reg(op.rs1), pc.wrapping_add(op.imm))
        }
        Op::Bne if op.rs2 == 0 => {
            format!("bnez\t{},{:x}", reg(op.rs1), pc.wrapping_add(op.imm))
        }
        Op::Blt if op.rs2 == 0 => {
            format!("bltz\t{},{:x}", reg(op.rs1), pc.wrapping_add(op.imm))
        }
        Op::Bge if op.rs1 == 0 => {
            format!("blez\t{},{:x}", reg(op.rs2), pc.wrapping_add(op.imm))
        }
        Op::Bge if op.rs2 == 0 => {
            format!("bgez\t{},{:x}", reg(op.rs1), pc.wrapping_add(op.imm))
        }
        Op::Beq | Op::Bne | Op::Blt | Op::Bge | Op::Bltu | Op::Bgeu => {
            branch(op, pc)
        }
        Op::Lb | Op::Lh | Op::Lw | Op::Lbu | Op::Lhu => load(op),
        Op::Sb | Op::Sh | Op::Sw => {
            let offset = interpret_u32_as_signed(op.imm);
            format!(
                "{}\t{},{offset}({})",
                op.op.mnemonic(),
                reg(op.rs2),
                reg(op.rs1)
            )
        }
        Op::Addi if op.rs1 == 0 => {
            if op.rd == 0 && op.imm == 0 {
                "nop".to_string()
            } else {
                format!("li\t{},{}", reg(op.rd), interpret_u32_as_signed(op.imm))
            }
        }
        Op::Addi | Op::Slti | Op::Xori | Op::Ori | Op::Andi => reg_imm(op),
        Op::Sltiu => {
            format!("sltiu\t{},{},{}", reg(op.rd), reg(op.rs1), op.imm)
        }
        Op::Slli | Op::Srli | Op::Srai => shift_imm(op),
        Op::Slt if op.rs2 == 0 => {
            format!("sltz\t{},{}", reg(op.rd), reg(op.rs1))
        }
        Op::Add
        | Op::Sub
        | Op::Sll
        | Op::Slt
        | Op::Sltu
        | Op::Xor
        | Op::Srl
        | Op::Sra
        | Op::Or
        | Op::And => reg_reg(op),
        Op::Fence | Op::FenceI | Op::Ecall | Op::Ebreak | Op::Mret => {
            op.op.mnemonic().to_string()
        }
        Op::Csrrw if op.rd == 0 => {
            format!("csrw\t{},{}", csr_name(op.csr), reg(op.rs1))
        }
        Op::Csrrs if op.rs1 == 0 => {
            format!("csrr\t{},{}", reg(op.rd), csr_name(op.csr))
        }
        Op::Csrrs if op.rd == 0 => {
            format!("csrs\t{},{}", csr_name(op.csr), reg(op.rs1))
        }
        Op::Csrrc if op.rd == 0 => {
            format!("csrc\t{},{}", csr_name(op.csr), reg(op.rs1))
        }
        Op::Csrrw | Op::Csrrs | Op::Csrrc => csr_reg(op),
        Op::Csrrwi if op.rd == 0 => {
            format!("csrwi\t{},{}", csr_name(op.csr), op.rs1)
        }
        Op::Csrrsi if op.rd == 0 => {
            format!("csrsi\t{},{}", csr_name(op.csr), op.rs1)
        }
        Op::Csrrci if op.rd == 0 => {
            format!("csrci\t{},{}", csr_name(op.csr), op.rs1)
        }
        Op::Csrrwi | Op::Csrrsi | Op::Csrrci => csr_imm(op),
        Op::Illegal => op.op.mnemonic().to_string(),
    }
}

/// One line of the step trace: pc, raw word, disassembly
pub fn trace_line(pc: u32, inst: u32, op: &OpDescriptor) -> String {
    format!("{pc:8x}:\t{inst:08x}\t{}", disassemble(pc, op))
}
