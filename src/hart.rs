//! Simulated hart
//!
//! Owns the architectural state (program counter, general registers,
//! CSR file) and the bus, and advances it one instruction at a time:
//! fetch the word at pc, decode it, execute the descriptor. Execution
//! is a total match over the operation tag; every path leaves pc at
//! pc + 4, a computed branch or jump target, or the trap vector.

use crate::bus::{Bus, MemoryMap};
use crate::csr::{CsrFile, Exception, CSR_MCAUSE, CSR_MEPC, CSR_MTVEC};
use crate::decode::{decode, Op, OpDescriptor};
use crate::memory::Wordsize;
use crate::registers::Registers;
use crate::utils::{interpret_i32_as_unsigned, interpret_u32_as_signed, sign_extend};

#[derive(Debug)]
pub struct Hart {
    pc: u32,
    registers: Registers,
    csrs: CsrFile,
    bus: Bus,
}

impl Hart {
    pub fn new(map: MemoryMap) -> Self {
        Self {
            pc: map.reset_vector,
            registers: Registers::new(),
            csrs: CsrFile::new(),
            bus: Bus::new(map),
        }
    }

    /// Point the pc back at the reset vector. Registers, CSRs and
    /// memory are left as they are.
    pub fn reset(&mut self) {
        self.pc = self.bus.map().reset_vector;
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn x(&self, which: u8) -> u32 {
        self.registers.read(which)
    }

    pub fn set_x(&mut self, which: u8, value: u32) {
        self.registers.write(which, value);
    }

    pub fn csr(&self, addr: u16) -> u32 {
        self.csrs.read(addr)
    }

    pub fn set_csr(&mut self, addr: u16, value: u32) {
        self.csrs.write(addr, value);
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Drain the serial device's transmit buffer
    pub fn flush_serial_output(&mut self) -> String {
        self.bus.flush_serial_output()
    }

    /// Read the instruction word at the current pc
    pub fn fetch(&self) -> u32 {
        self.bus.read(self.pc, Wordsize::Word)
    }

    /// Fetch, decode and execute one instruction
    pub fn step(&mut self) {
        let op = decode(self.fetch());
        self.execute(&op);
    }

    fn increment_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Enter the trap handler: save the faulting pc and the cause,
    /// then resume at the trap vector
    fn trap(&mut self, ex: Exception) {
        self.csrs.write(CSR_MEPC, self.pc);
        self.csrs.write(CSR_MCAUSE, ex.mcause());
        self.pc = self.csrs.read(CSR_MTVEC);
    }

    fn branch(&mut self, op: &OpDescriptor, taken: bool) {
        if taken {
            self.pc = self.pc.wrapping_add(op.imm);
        } else {
            self.increment_pc();
        }
    }

    fn effective_address(&self, op: &OpDescriptor) -> u32 {
        self.x(op.rs1).wrapping_add(op.imm)
    }

    fn load(&self, op: &OpDescriptor, size: Wordsize) -> u32 {
        self.bus.read(self.effective_address(op), size)
    }

    fn store(&mut self, op: &OpDescriptor, size: Wordsize) {
        self.bus.write(self.effective_address(op), self.x(op.rs2), size);
    }

    /// Mutate the architectural state according to one decoded
    /// instruction
    pub fn execute(&mut self, op: &OpDescriptor) {
        match op.op {
            Op::Lui => {
                self.registers.write(op.rd, op.imm);
                self.increment_pc();
            }
            Op::Auipc => {
                self.registers.write(op.rd, self.pc.wrapping_add(op.imm));
                self.increment_pc();
            }
            Op::Jal => {
                let return_address = self.pc.wrapping_add(4);
                self.pc = self.pc.wrapping_add(op.imm);
                self.registers.write(op.rd, return_address);
            }
            Op::Jalr => {
                // The target must be computed before rd is written,
                // since rd may be the same register as rs1
                let return_address = self.pc.wrapping_add(4);
                let target = self.x(op.rs1).wrapping_add(op.imm) & 0xffff_fffe;
                self.registers.write(op.rd, return_address);
                self.pc = target;
            }
            Op::Beq => self.branch(op, self.x(op.rs1) == self.x(op.rs2)),
            Op::Bne => self.branch(op, self.x(op.rs1) != self.x(op.rs2)),
            Op::Blt => {
                let taken = interpret_u32_as_signed(self.x(op.rs1))
                    < interpret_u32_as_signed(self.x(op.rs2));
                self.branch(op, taken);
            }
            Op::Bge => {
                let taken = interpret_u32_as_signed(self.x(op.rs1))
                    >= interpret_u32_as_signed(self.x(op.rs2));
                self.branch(op, taken);
            }
            Op::Bltu => self.branch(op, self.x(op.rs1) < self.x(op.rs2)),
            Op::Bgeu => self.branch(op, self.x(op.rs1) >= self.x(op.rs2)),
            Op::Lb => {
                let value = sign_extend(self.load(op, Wordsize::Byte), 7);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Lh => {
                let value = sign_extend(self.load(op, Wordsize::Halfword), 15);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Lw => {
                let value = self.load(op, Wordsize::Word);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Lbu => {
                let value = self.load(op, Wordsize::Byte);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Lhu => {
                let value = self.load(op, Wordsize::Halfword);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Sb => {
                self.store(op, Wordsize::Byte);
                self.increment_pc();
            }
            Op::Sh => {
                self.store(op, Wordsize::Halfword);
                self.increment_pc();
            }
            Op::Sw => {
                self.store(op, Wordsize::Word);
                self.increment_pc();
            }
            Op::Addi => {
                self.registers
                    .write(op.rd, self.x(op.rs1).wrapping_add(op.imm));
                self.increment_pc();
            }
            Op::Slti => {
                let value = interpret_u32_as_signed(self.x(op.rs1))
                    < interpret_u32_as_signed(op.imm);
                self.registers.write(op.rd, value.into());
                self.increment_pc();
            }
            Op::Sltiu => {
                let value = self.x(op.rs1) < op.imm;
                self.registers.write(op.rd, value.into());
                self.increment_pc();
            }
            Op::Xori => {
                self.registers.write(op.rd, self.x(op.rs1) ^ op.imm);
                self.increment_pc();
            }
            Op::Ori => {
                self.registers.write(op.rd, self.x(op.rs1) | op.imm);
                self.increment_pc();
            }
            Op::Andi => {
                self.registers.write(op.rd, self.x(op.rs1) & op.imm);
                self.increment_pc();
            }
            Op::Slli => {
                self.registers.write(op.rd, self.x(op.rs1) << op.shamt);
                self.increment_pc();
            }
            Op::Srli => {
                self.registers.write(op.rd, self.x(op.rs1) >> op.shamt);
                self.increment_pc();
            }
            Op::Srai => {
                let value = interpret_u32_as_signed(self.x(op.rs1)) >> op.shamt;
                self.registers.write(op.rd, interpret_i32_as_unsigned(value));
                self.increment_pc();
            }
            Op::Add => {
                let value = self.x(op.rs1).wrapping_add(self.x(op.rs2));
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Sub => {
                let value = self.x(op.rs1).wrapping_sub(self.x(op.rs2));
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Sll => {
                let value = self.x(op.rs1) << (self.x(op.rs2) & 0x1f);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Slt => {
                let value = interpret_u32_as_signed(self.x(op.rs1))
                    < interpret_u32_as_signed(self.x(op.rs2));
                self.registers.write(op.rd, value.into());
                self.increment_pc();
            }
            Op::Sltu => {
                let value = self.x(op.rs1) < self.x(op.rs2);
                self.registers.write(op.rd, value.into());
                self.increment_pc();
            }
            Op::Xor => {
                self.registers.write(op.rd, self.x(op.rs1) ^ self.x(op.rs2));
                self.increment_pc();
            }
            Op::Srl => {
                let value = self.x(op.rs1) >> (self.x(op.rs2) & 0x1f);
                self.registers.write(op.rd, value);
                self.increment_pc();
            }
            Op::Sra => {
                let value = interpret_u32_as_signed(self.x(op.rs1))
                    >> (self.x(op.rs2) & 0x1f);
                self.registers.write(op.rd, interpret_i32_as_unsigned(value));
                self.increment_pc();
            }
            Op::Or => {
                self.registers.write(op.rd, self.x(op.rs1) | self.x(op.rs2));
                self.increment_pc();
            }
            Op::And => {
                self.registers.write(op.rd, self.x(op.rs1) & self.x(op.rs2));
                self.increment_pc();
            }
            Op::Fence | Op::FenceI => {
                // Memory ordering is trivial on a single in-order hart
                self.increment_pc();
            }
            Op::Ecall => self.trap(Exception::MachineEcall),
            Op::Ebreak => self.trap(Exception::Breakpoint),
            Op::Illegal => self.trap(Exception::IllegalInstruction),
            Op::Mret => {
                self.pc = self.csrs.read(CSR_MEPC);
            }
            Op::Csrrw => {
                let t = self.csrs.read(op.csr);
                self.csrs.write(op.csr, self.x(op.rs1));
                self.registers.write(op.rd, t);
                self.increment_pc();
            }
            Op::Csrrs => {
                let t = self.csrs.read(op.csr);
                if op.rs1 != 0 {
                    self.csrs.write(op.csr, t | self.x(op.rs1));
                }
                self.registers.write(op.rd, t);
                self.increment_pc();
            }
            Op::Csrrc => {
                let t = self.csrs.read(op.csr);
                if op.rs1 != 0 {
                    self.csrs.write(op.csr, t & !self.x(op.rs1));
                }
                self.registers.write(op.rd, t);
                self.increment_pc();
            }
            Op::Csrrwi => {
                let t = self.csrs.read(op.csr);
                self.csrs.write(op.csr, op.rs1.into());
                self.registers.write(op.rd, t);
                self.increment_pc();
            }
            Op::Csrrsi => {
                let t = self.csrs.read(op.csr);
                if op.rs1 != 0 {
                    self.csrs.write(op.csr, t | u32::from(op.rs1));
                }
                self.registers.write(op.rd, t);
                self.increment_pc();
            }
            Op::Csrrci => {
                let t = self.csrs.read(op.csr);
                if op.rs1 != 0 {
                    self.csrs.write(op.csr, t & !u32::from(op.rs1));
                }
                self.registers.write(op.rd, t);
                self.increment_pc();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::iproduct;

    use super::*;
    use crate::csr::CSR_MSTATUS;
    use crate::encode;
    use crate::utils::interpret_i32_as_unsigned;

    /// A hart with RAM at address zero, pc at zero
    fn bare_hart() -> Hart {
        let mut hart = Hart::new(MemoryMap::bare());
        hart.reset();
        hart
    }

    fn write_instr(hart: &mut Hart, addr: u32, instr: u32) {
        hart.bus_mut().write(addr, instr, Wordsize::Word);
    }

    #[test]
    fn check_reset_vectors() {
        assert_eq!(Hart::new(MemoryMap::bare()).pc(), 0);
        assert_eq!(Hart::new(MemoryMap::hosted()).pc(), 0x8000_0000);
    }

    #[test]
    fn check_addi_negative_immediate() {
        let mut hart = bare_hart();
        write_instr(&mut hart, 0, 0xfff0_0093); // addi x1, x0, -1
        hart.step();
        assert_eq!(hart.x(1), 0xffff_ffff);
        assert_eq!(hart.pc(), 4);
    }

    #[test]
    fn check_lui_addi_sequence() {
        let mut hart = bare_hart();
        write_instr(&mut hart, 0, 0xabcd_e0b7); // lui x1, 0xabcde
        write_instr(&mut hart, 4, 0x0010_8093); // addi x1, x1, 1
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0xabcd_e001);
        assert_eq!(hart.pc(), 8);
    }

    #[test]
    fn check_auipc() {
        let mut hart = bare_hart();
        hart.set_pc(8);
        write_instr(&mut hart, 8, encode::auipc(4, 53));
        hart.step();
        assert_eq!(hart.x(4), 8 + (53 << 12));
        assert_eq!(hart.pc(), 12);
    }

    #[test]
    fn check_jal() {
        let mut hart = bare_hart();
        write_instr(&mut hart, 0, 0x0080_00ef); // jal x1, +8
        hart.step();
        assert_eq!(hart.x(1), 4);
        assert_eq!(hart.pc(), 8);
    }

    #[test]
    fn check_jalr_clears_bit_zero() {
        let mut hart = bare_hart();
        hart.set_pc(12);
        hart.set_x(6, 21);
        write_instr(&mut hart, 12, encode::jalr(4, 6, -4));
        hart.step();
        assert_eq!(hart.x(4), 16);
        // 21 - 4 = 17, with the low bit cleared
        assert_eq!(hart.pc(), 16);
    }

    #[test]
    fn check_jalr_link_register_is_base() {
        // When rd = rs1, the target is computed from the old value
        let mut hart = bare_hart();
        hart.set_x(1, 0x100);
        write_instr(&mut hart, 0, encode::jalr(1, 1, 8));
        hart.step();
        assert_eq!(hart.pc(), 0x108);
        assert_eq!(hart.x(1), 4);
    }

    #[test]
    fn check_store_load_round_trip() {
        let mut hart = bare_hart();
        hart.set_x(2, 0xdead_beef);
        write_instr(&mut hart, 0, encode::sw(2, 0, 0x100));
        write_instr(&mut hart, 4, encode::lw(3, 0, 0x100));
        hart.step();
        hart.step();
        assert_eq!(hart.x(3), 0xdead_beef);
        assert_eq!(hart.pc(), 8);
    }

    #[test]
    fn check_byte_loads_sign_and_zero_extend() {
        let mut hart = bare_hart();
        hart.set_x(2, 0x200);
        hart.bus_mut().write(0x210, 0xff, Wordsize::Byte);
        write_instr(&mut hart, 0, encode::lb(1, 2, 0x10));
        write_instr(&mut hart, 4, encode::lbu(3, 2, 0x10));
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0xffff_ffff);
        assert_eq!(hart.x(3), 0x0000_00ff);
    }

    #[test]
    fn check_halfword_loads_sign_and_zero_extend() {
        let mut hart = bare_hart();
        hart.set_x(2, 0x200);
        hart.bus_mut().write(0x210, 0xff92, Wordsize::Halfword);
        write_instr(&mut hart, 0, encode::lh(1, 2, 0x10));
        write_instr(&mut hart, 4, encode::lhu(3, 2, 0x10));
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0xffff_ff92);
        assert_eq!(hart.x(3), 0x0000_ff92);
    }

    #[test]
    fn check_sb_sh_write_low_bits() {
        let mut hart = bare_hart();
        hart.set_x(1, 0x1234_5678);
        write_instr(&mut hart, 0, encode::sb(1, 0, 0x100));
        write_instr(&mut hart, 4, encode::sh(1, 0, 0x104));
        hart.step();
        hart.step();
        assert_eq!(hart.bus().read(0x100, Wordsize::Word), 0x78);
        assert_eq!(hart.bus().read(0x104, Wordsize::Word), 0x5678);
    }

    #[test]
    fn check_negative_store_offset() {
        let mut hart = bare_hart();
        hart.set_x(1, 0xabcd_ef12);
        hart.set_x(2, 0x110);
        write_instr(&mut hart, 0, encode::sw(1, 2, -16));
        hart.step();
        assert_eq!(hart.bus().read(0x100, Wordsize::Word), 0xabcd_ef12);
    }

    #[test]
    fn check_x0_stays_zero() {
        let mut hart = bare_hart();
        write_instr(&mut hart, 0, encode::addi(0, 0, 123));
        hart.step();
        assert_eq!(hart.x(0), 0);
        assert_eq!(hart.pc(), 4);
    }

    #[test]
    fn check_branches_taken_and_not_taken() {
        // (encoded word, x1, x2, taken)
        let cases = [
            (encode::beq(1, 2, 16), 2, 2, true),
            (encode::beq(1, 2, 16), 1, 2, false),
            (encode::bne(1, 2, 16), 1, 2, true),
            (encode::bne(1, 2, 16), 2, 2, false),
            (encode::bltu(1, 2, 16), 1, 10, true),
            (encode::bltu(1, 2, 16), 10, 1, false),
            (encode::bgeu(1, 2, 16), 10, 1, true),
            (encode::bgeu(1, 2, 16), 1, 10, false),
        ];
        for (instr, x1, x2, taken) in cases {
            let mut hart = bare_hart();
            hart.set_x(1, x1);
            hart.set_x(2, x2);
            write_instr(&mut hart, 0, instr);
            hart.step();
            assert_eq!(hart.pc(), if taken { 16 } else { 4 });
        }
    }

    #[test]
    fn check_signed_branches() {
        let values = [-24i32, -5, 0, 5, 124];
        for (a, b) in iproduct!(values, values) {
            let mut hart = bare_hart();
            hart.set_x(1, interpret_i32_as_unsigned(a));
            hart.set_x(2, interpret_i32_as_unsigned(b));
            write_instr(&mut hart, 0, encode::blt(1, 2, 16));
            hart.step();
            assert_eq!(hart.pc(), if a < b { 16 } else { 4 });

            let mut hart = bare_hart();
            hart.set_x(1, interpret_i32_as_unsigned(a));
            hart.set_x(2, interpret_i32_as_unsigned(b));
            write_instr(&mut hart, 0, encode::bge(1, 2, 16));
            hart.step();
            assert_eq!(hart.pc(), if a >= b { 16 } else { 4 });
        }
    }

    #[test]
    fn check_backward_branch() {
        let mut hart = bare_hart();
        hart.set_pc(0x20);
        hart.set_x(1, 7);
        hart.set_x(2, 7);
        write_instr(&mut hart, 0x20, encode::beq(1, 2, -16));
        hart.step();
        assert_eq!(hart.pc(), 0x10);
    }

    #[test]
    fn check_slt_slti_signed_comparison() {
        let values = [-24i32, -5, 0, 5, 124];
        for (a, b) in iproduct!(values, values) {
            let mut hart = bare_hart();
            hart.set_x(2, interpret_i32_as_unsigned(a));
            hart.set_x(3, interpret_i32_as_unsigned(b));
            write_instr(&mut hart, 0, encode::slt(1, 2, 3));
            hart.step();
            assert_eq!(hart.x(1), u32::from(a < b));
        }
        for (a, imm) in iproduct!(values, values) {
            let mut hart = bare_hart();
            hart.set_x(2, interpret_i32_as_unsigned(a));
            write_instr(&mut hart, 0, encode::slti(1, 2, imm));
            hart.step();
            assert_eq!(hart.x(1), u32::from(a < imm));
        }
    }

    #[test]
    fn check_sltu_sltiu_unsigned_comparison() {
        let mut hart = bare_hart();
        hart.set_x(2, 1);
        hart.set_x(3, 0xffff_ffff);
        write_instr(&mut hart, 0, encode::sltu(1, 2, 3));
        hart.step();
        assert_eq!(hart.x(1), 1);

        let mut hart = bare_hart();
        hart.set_x(2, 0xffff_ffff);
        write_instr(&mut hart, 0, encode::sltiu(1, 2, 1));
        hart.step();
        assert_eq!(hart.x(1), 0);
    }

    #[test]
    fn check_bitwise_immediates() {
        let mut hart = bare_hart();
        hart.set_x(2, 0x00ff_ff00);
        write_instr(&mut hart, 0, encode::andi(1, 2, 0x0f0));
        write_instr(&mut hart, 4, encode::ori(3, 2, 0x0f0));
        write_instr(&mut hart, 8, encode::xori(4, 2, 0x0f0));
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0);
        assert_eq!(hart.x(3), 0x00ff_fff0);
        assert_eq!(hart.x(4), 0x00ff_fff0);
    }

    #[test]
    fn check_add_sub_wrap() {
        let mut hart = bare_hart();
        hart.set_x(2, 0xffff_fffe);
        hart.set_x(3, 5);
        write_instr(&mut hart, 0, encode::add(1, 2, 3));
        write_instr(&mut hart, 4, encode::sub(4, 3, 2));
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 3);
        assert_eq!(hart.x(4), 7);
    }

    #[test]
    fn check_shift_immediates() {
        let mut hart = bare_hart();
        hart.set_x(2, 0xf000_0f00);
        write_instr(&mut hart, 0, encode::slli(1, 2, 4));
        write_instr(&mut hart, 4, encode::srli(3, 2, 4));
        write_instr(&mut hart, 8, encode::srai(4, 2, 4));
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0x0000_f000);
        assert_eq!(hart.x(3), 0x0f00_00f0);
        // The sign bit is replicated into the vacated positions
        assert_eq!(hart.x(4), 0xff00_00f0);
    }

    #[test]
    fn check_register_shifts_use_low_five_bits() {
        let mut hart = bare_hart();
        hart.set_x(2, 0xf000_0f00);
        hart.set_x(3, 36); // shift count 36 & 0x1f = 4
        write_instr(&mut hart, 0, encode::sll(1, 2, 3));
        write_instr(&mut hart, 4, encode::srl(4, 2, 3));
        write_instr(&mut hart, 8, encode::sra(5, 2, 3));
        hart.step();
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0x0000_f000);
        assert_eq!(hart.x(4), 0x0f00_00f0);
        assert_eq!(hart.x(5), 0xff00_00f0);
    }

    #[test]
    fn check_fence_only_advances_pc() {
        let mut hart = bare_hart();
        write_instr(&mut hart, 0, encode::fence());
        write_instr(&mut hart, 4, encode::fence_i());
        hart.step();
        hart.step();
        assert_eq!(hart.pc(), 8);
    }

    #[test]
    fn check_csrrw() {
        let mut hart = bare_hart();
        hart.set_csr(CSR_MTVEC, 0x1000);
        hart.set_x(2, 0x2000);
        write_instr(&mut hart, 0, encode::csrrw(1, CSR_MTVEC, 2));
        hart.step();
        assert_eq!(hart.x(1), 0x1000);
        assert_eq!(hart.csr(CSR_MTVEC), 0x2000);
        assert_eq!(hart.pc(), 4);
    }

    #[test]
    fn check_csrrs_sets_bits() {
        let mut hart = bare_hart();
        hart.set_csr(CSR_MSTATUS, 0xabcd_0123);
        hart.set_x(2, 0x0000_f000);
        write_instr(&mut hart, 0, encode::csrrs(1, CSR_MSTATUS, 2));
        hart.step();
        assert_eq!(hart.x(1), 0xabcd_0123);
        assert_eq!(hart.csr(CSR_MSTATUS), 0xabcd_f123);
    }

    #[test]
    fn check_csrrc_clears_bits() {
        let mut hart = bare_hart();
        hart.set_csr(CSR_MSTATUS, 0xabcd_0123);
        hart.set_x(2, 0x0000_0103);
        write_instr(&mut hart, 0, encode::csrrc(1, CSR_MSTATUS, 2));
        hart.step();
        assert_eq!(hart.x(1), 0xabcd_0123);
        assert_eq!(hart.csr(CSR_MSTATUS), 0xabcd_0020);
    }

    #[test]
    fn check_csrrs_with_x0_is_a_pure_read() {
        let mut hart = bare_hart();
        hart.set_csr(CSR_MSTATUS, 0x1800);
        write_instr(&mut hart, 0, encode::csrrs(1, CSR_MSTATUS, 0));
        write_instr(&mut hart, 4, encode::csrrc(2, CSR_MSTATUS, 0));
        hart.step();
        hart.step();
        assert_eq!(hart.x(1), 0x1800);
        assert_eq!(hart.x(2), 0x1800);
        assert_eq!(hart.csr(CSR_MSTATUS), 0x1800);
    }

    #[test]
    fn check_csr_immediate_forms() {
        let mut hart = bare_hart();
        hart.set_csr(CSR_MSTATUS, 0x60);
        write_instr(&mut hart, 0, encode::csrrwi(1, CSR_MSTATUS, 0x14));
        write_instr(&mut hart, 4, encode::csrrsi(2, CSR_MSTATUS, 0x03));
        write_instr(&mut hart, 8, encode::csrrci(3, CSR_MSTATUS, 0x06));
        hart.step();
        assert_eq!(hart.x(1), 0x60);
        assert_eq!(hart.csr(CSR_MSTATUS), 0x14);
        hart.step();
        assert_eq!(hart.x(2), 0x14);
        assert_eq!(hart.csr(CSR_MSTATUS), 0x17);
        hart.step();
        assert_eq!(hart.x(3), 0x17);
        assert_eq!(hart.csr(CSR_MSTATUS), 0x11);
    }

    #[test]
    fn check_illegal_instruction_trap() {
        let mut hart = bare_hart();
        hart.set_pc(0x100);
        hart.set_csr(CSR_MTVEC, 0x200);
        write_instr(&mut hart, 0x100, 0x0000_007f);
        hart.step();
        assert_eq!(hart.csr(CSR_MEPC), 0x100);
        assert_eq!(hart.csr(CSR_MCAUSE), 2);
        assert_eq!(hart.pc(), 0x200);
    }

    #[test]
    fn check_ecall_and_ebreak_traps() {
        let mut hart = bare_hart();
        hart.set_pc(0x40);
        hart.set_csr(CSR_MTVEC, 0x80);
        write_instr(&mut hart, 0x40, encode::ecall());
        hart.step();
        assert_eq!(hart.csr(CSR_MEPC), 0x40);
        assert_eq!(hart.csr(CSR_MCAUSE), 0x0b);
        assert_eq!(hart.pc(), 0x80);

        let mut hart = bare_hart();
        hart.set_pc(0x40);
        hart.set_csr(CSR_MTVEC, 0x80);
        write_instr(&mut hart, 0x40, encode::ebreak());
        hart.step();
        assert_eq!(hart.csr(CSR_MEPC), 0x40);
        assert_eq!(hart.csr(CSR_MCAUSE), 0x03);
        assert_eq!(hart.pc(), 0x80);
    }

    #[test]
    fn check_trap_with_uninitialised_mtvec_goes_to_zero() {
        let mut hart = bare_hart();
        hart.set_pc(0x40);
        write_instr(&mut hart, 0x40, encode::ecall());
        hart.step();
        assert_eq!(hart.pc(), 0);
    }

    #[test]
    fn check_mret_returns_to_mepc() {
        let mut hart = bare_hart();
        hart.set_csr(CSR_MTVEC, 0x80);
        write_instr(&mut hart, 0x10, encode::ecall());
        write_instr(&mut hart, 0x80, encode::mret());
        hart.set_pc(0x10);
        hart.step();
        assert_eq!(hart.pc(), 0x80);
        hart.step();
        assert_eq!(hart.pc(), 0x10);
    }

    #[test]
    fn check_countdown_loop_program() {
        // Sum 5..=1 into x2, then flag success in x3
        let mut hart = bare_hart();
        write_instr(&mut hart, 0x00, encode::addi(1, 0, 5));
        write_instr(&mut hart, 0x04, encode::addi(2, 0, 0));
        write_instr(&mut hart, 0x08, encode::add(2, 2, 1));
        write_instr(&mut hart, 0x0c, encode::addi(1, 1, -1));
        write_instr(&mut hart, 0x10, encode::bne(1, 0, -8));
        write_instr(&mut hart, 0x14, encode::addi(3, 0, 1));
        for _ in 0..18 {
            hart.step();
        }
        assert_eq!(hart.x(1), 0);
        assert_eq!(hart.x(2), 15);
        assert_eq!(hart.x(3), 1);
        assert_eq!(hart.pc(), 0x18);
    }

    #[test]
    fn check_serial_output_from_guest_store() {
        let mut hart = Hart::new(MemoryMap::hosted());
        hart.reset();
        let base = 0x8000_0000;
        hart.set_x(1, 0x2000_0000);
        hart.set_x(2, 1);
        hart.set_x(3, u32::from(b'A'));
        // Enable the transmitter, then store one character
        write_instr(&mut hart, base, encode::sw(2, 1, 8));
        write_instr(&mut hart, base + 4, encode::sb(3, 1, 0));
        hart.step();
        hart.step();
        assert_eq!(hart.flush_serial_output(), "A");
        assert_eq!(hart.pc(), base + 8);
    }
}
