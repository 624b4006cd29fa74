//! System bus
//!
//! The bus owns the RAM and serial devices and routes each physical
//! access by address. The aperture table is data: the hosted and bare
//! memory maps are two values of [`MemoryMap`] dispatched by one
//! router. Reads outside every aperture return zero and writes are
//! silently dropped; the bus is the only memory-fault policy in the
//! core.

use crate::memory::{Ram, Wordsize};
use crate::uart::Uart;

/// Half-open physical address range [base, base + size) claimed by a
/// device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aperture {
    pub base: u32,
    pub size: u32,
}

impl Aperture {
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr.wrapping_sub(self.base) < self.size
    }

    /// Device-relative offset of an address inside the aperture
    pub fn offset(&self, addr: u32) -> u32 {
        addr.wrapping_sub(self.base)
    }
}

/// Physical memory layout the simulator boots with
#[derive(Debug, Clone, Copy)]
pub struct MemoryMap {
    pub ram: Aperture,
    pub serial: Option<Aperture>,
    pub reset_vector: u32,
}

impl MemoryMap {
    /// 1 MiB of RAM at 0x8000_0000, serial at 0x2000_0000, reset into
    /// the bottom of RAM
    pub const fn hosted() -> Self {
        Self {
            ram: Aperture::new(0x8000_0000, 0x0010_0000),
            serial: Some(Aperture::new(0x2000_0000, 0x1000)),
            reset_vector: 0x8000_0000,
        }
    }

    /// 256 KiB of RAM at address zero and no serial device
    pub const fn bare() -> Self {
        Self {
            ram: Aperture::new(0x0000_0000, 0x0004_0000),
            serial: None,
            reset_vector: 0x0000_0000,
        }
    }
}

#[derive(Debug)]
pub struct Bus {
    map: MemoryMap,
    ram: Ram,
    uart: Uart,
}

impl Bus {
    pub fn new(map: MemoryMap) -> Self {
        Self {
            ram: Ram::new(map.ram.size),
            uart: Uart::new(),
            map,
        }
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Drain the serial device's transmit buffer
    pub fn flush_serial_output(&mut self) -> String {
        self.uart.flush_output()
    }

    pub fn read(&self, addr: u32, size: Wordsize) -> u32 {
        if self.map.ram.contains(addr) {
            return self.ram.read(self.map.ram.offset(addr), size);
        }
        if let Some(serial) = self.map.serial {
            if serial.contains(addr) {
                return self.uart.read(serial.offset(addr), size);
            }
        }
        0
    }

    pub fn write(&mut self, addr: u32, value: u32, size: Wordsize) {
        if self.map.ram.contains(addr) {
            self.ram.write(self.map.ram.offset(addr), value, size);
            return;
        }
        if let Some(serial) = self.map.serial {
            if serial.contains(addr) {
                self.uart.write(serial.offset(addr), value, size);
            }
        }
    }
}
