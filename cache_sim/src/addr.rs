use std::fmt;

/// Size of the simulated main memory in bytes.
pub const MEMORY_BYTE_SIZE: usize = 2048;
/// Bytes per block, the unit of transfer between memory and a slot.
pub const BLOCK_BYTE_SIZE: usize = 16;
/// Number of direct-mapped slots in the cache.
pub const NUM_SLOTS: usize = 16;

const OFFSET_BITS: u32 = 4;
const SLOT_BITS: u32 = 4;
const TAG_SHIFT: u32 = OFFSET_BITS + SLOT_BITS;

/// A byte address in the simulated space. Only the low 11 bits are
/// meaningful; anything wider is rejected at the memory boundary rather
/// than truncated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(u32);

impl Addr {
    pub fn new(v: u32) -> Self {
        Self(v)
    }
    pub fn inner(self) -> u32 {
        self.0
    }
    pub fn index(self) -> usize {
        self.0 as usize
    }
    pub fn disp(self, amount: u32) -> Self {
        Self(self.0 + amount)
    }
    /// Position of the byte within its block; low 4 bits.
    pub fn block_offset(self) -> usize {
        self.index() & (BLOCK_BYTE_SIZE - 1)
    }
    /// The one slot that may hold this address; next 4 bits.
    pub fn slot_index(self) -> usize {
        (self.index() >> OFFSET_BITS) & (NUM_SLOTS - 1)
    }
    /// Identifies which block occupies a slot; everything above the
    /// slot bits.
    pub fn tag(self) -> u32 {
        self.0 >> TAG_SHIFT
    }
    /// First address of the block containing `self`.
    pub fn block_base(self) -> Self {
        Self(self.0 - self.block_offset() as u32)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_spot_values() {
        let a = Addr::new(0x123);
        assert_eq!(a.block_offset(), 0x3);
        assert_eq!(a.slot_index(), 0x2);
        assert_eq!(a.tag(), 0x1);
        assert_eq!(a.block_base(), Addr::new(0x120));
    }

    #[test]
    fn fields_reassemble_to_address() {
        for raw in 0..MEMORY_BYTE_SIZE as u32 {
            let a = Addr::new(raw);
            let reassembled =
                (a.tag() << TAG_SHIFT) | ((a.slot_index() as u32) << OFFSET_BITS) | a.block_offset() as u32;
            assert_eq!(reassembled, raw);
            assert_eq!(a.block_base().inner() + a.block_offset() as u32, raw);
        }
    }

    #[test]
    fn block_base_is_aligned() {
        for raw in (0..MEMORY_BYTE_SIZE as u32).step_by(7) {
            let base = Addr::new(raw).block_base();
            assert_eq!(base.block_offset(), 0);
            assert_eq!(base.slot_index(), Addr::new(raw).slot_index());
        }
    }
}
