use crate::addr::{Addr, BLOCK_BYTE_SIZE, MEMORY_BYTE_SIZE};

#[cfg(feature = "stat")]
use std::cell::RefCell;

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

use thiserror::Error;

/// One block's worth of bytes, as moved between memory and a slot.
pub type Block = [u8; BLOCK_BYTE_SIZE];

#[derive(Error, Debug)]
pub enum MemoryAccessError {
    #[error("address {accessed_address} out of range for memory")]
    OutOfBounds { accessed_address: Addr },
}

pub type Result<T> = std::result::Result<T, MemoryAccessError>;

/// Flat byte-addressable main memory. Always authoritative: every write
/// issued through the controller lands here before the call returns.
pub struct MainMemory {
    inner: Vec<u8>,
    #[cfg(feature = "stat")]
    stat: RefCell<stat::MemoryStat>,
}

impl MainMemory {
    /// Every byte starts out as its address modulo 256.
    pub fn new() -> Self {
        Self {
            inner: (0..MEMORY_BYTE_SIZE).map(|i| i as u8).collect(),
            #[cfg(feature = "stat")]
            stat: RefCell::default(),
        }
    }
    pub fn check(&self, addr: Addr) -> Result<()> {
        if addr.index() >= self.inner.len() {
            return Err(MemoryAccessError::OutOfBounds {
                accessed_address: addr,
            });
        }
        Ok(())
    }
    pub fn read_byte(&self, addr: Addr) -> Result<u8> {
        self.check(addr)?;
        Ok(self.inner[addr.index()])
    }
    /// The 16 contiguous bytes starting at `base`; what a miss brings in.
    pub fn read_block(&self, base: Addr) -> Result<Block> {
        self.check(base.disp(BLOCK_BYTE_SIZE as u32 - 1))?;
        #[cfg(feature = "stat")]
        self.stat.borrow_mut().on_block_read();
        let mut block: Block = [0; BLOCK_BYTE_SIZE];
        block.copy_from_slice(&self.inner[base.index()..base.index() + BLOCK_BYTE_SIZE]);
        Ok(block)
    }
    pub fn write_byte(&mut self, addr: Addr, value: u8) -> Result<()> {
        self.check(addr)?;
        #[cfg(feature = "stat")]
        self.stat.borrow_mut().on_byte_write();
        self.inner[addr.index()] = value;
        Ok(())
    }
}

impl Default for MainMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "stat")]
impl AddStats for MainMemory {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat.borrow().to_owned()));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    #[derive(Clone, Copy, Default)]
    pub struct MemoryStat {
        block_reads: usize,
        byte_writes: usize,
    }

    impl MemoryStat {
        pub fn on_block_read(&mut self) {
            self.block_reads += 1;
        }
        pub fn on_byte_write(&mut self) {
            self.byte_writes += 1;
        }
    }

    impl Stat for MemoryStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(MemoryStatView::new(self))
        }
    }

    pub struct MemoryStatView<'a> {
        stat: &'a MemoryStat,
    }

    impl<'a> MemoryStatView<'a> {
        pub fn new(stat: &'a MemoryStat) -> Self {
            Self { stat }
        }
    }

    impl StatView for MemoryStatView<'_> {
        fn header(&self) -> &'static str {
            "main memory traffic"
        }
        fn width(&self) -> usize {
            28
        }
    }

    impl fmt::Display for MemoryStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  block fills: {:>11}", self.stat.block_reads)?;
            writeln!(f, "  write-throughs: {:>8}", self.stat.byte_writes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_pattern_is_address_mod_256() {
        let m = MainMemory::new();
        assert_eq!(m.read_byte(Addr::new(0)).unwrap(), 0);
        assert_eq!(m.read_byte(Addr::new(0xFF)).unwrap(), 0xFF);
        assert_eq!(m.read_byte(Addr::new(0x100)).unwrap(), 0);
        assert_eq!(m.read_byte(Addr::new(0x123)).unwrap(), 0x23);
        assert_eq!(m.read_byte(Addr::new(0x7FF)).unwrap(), 0xFF);
    }

    #[test]
    fn block_read_is_contiguous() {
        let m = MainMemory::new();
        let block = m.read_block(Addr::new(0x7F0)).unwrap();
        for (i, b) in block.iter().enumerate() {
            assert_eq!(*b, 0xF0 + i as u8);
        }
    }

    #[test]
    fn write_is_visible_to_read() {
        let mut m = MainMemory::new();
        m.write_byte(Addr::new(0x3A), 0xEE).unwrap();
        assert_eq!(m.read_byte(Addr::new(0x3A)).unwrap(), 0xEE);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut m = MainMemory::new();
        assert!(m.read_byte(Addr::new(0x800)).is_err());
        assert!(m.write_byte(Addr::new(0x800), 0).is_err());
        assert!(m.read_block(Addr::new(0x800)).is_err());
        assert!(m.read_byte(Addr::new(0x7FF)).is_ok());
    }
}
