use std::fmt;

use serde::Serialize;

use crate::{
    addr::{Addr, BLOCK_BYTE_SIZE, NUM_SLOTS},
    memory::Block,
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Clone, Copy)]
pub enum AccessKind {
    Read,
    Write,
}

/// One direct-mapped line: the cached copy of a block-aligned region of
/// main memory, identified by its tag while `valid` holds.
pub struct Slot {
    index: u8,
    valid: bool,
    tag: u32,
    block: Block,
}

impl Slot {
    fn empty(index: u8) -> Self {
        Self {
            index,
            valid: false,
            tag: 0,
            block: [0; BLOCK_BYTE_SIZE],
        }
    }
    fn matches(&self, tag: u32) -> bool {
        self.valid && self.tag == tag
    }
}

/// Fixed set of 16 slots in front of main memory. Placement is decided
/// solely by the address's slot-index bits.
pub struct Cache {
    slots: Vec<Slot>,
    #[cfg(feature = "stat")]
    stat: stat::CacheStat,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            slots: (0..NUM_SLOTS).map(|i| Slot::empty(i as u8)).collect(),
            #[cfg(feature = "stat")]
            stat: Default::default(),
        }
    }
    /// Hit path of a lookup: the cached byte, when the slot currently
    /// holds the block containing `addr`. No mutation.
    pub fn lookup(&self, addr: Addr) -> Option<u8> {
        let slot = &self.slots[addr.slot_index()];
        slot.matches(addr.tag())
            .then(|| slot.block[addr.block_offset()])
    }
    /// Miss path: install the block containing `addr`, evicting whatever
    /// occupied the slot. Nothing is lost on eviction; write-through
    /// keeps memory current at all times.
    pub fn fill(&mut self, addr: Addr, block: Block) {
        let slot = &mut self.slots[addr.slot_index()];
        if slot.valid {
            log::debug!(
                "slot {:x}: evicting tag {:#x} for tag {:#x}",
                slot.index,
                slot.tag,
                addr.tag()
            );
        }
        slot.tag = addr.tag();
        slot.block = block;
        slot.valid = true;
        #[cfg(feature = "stat")]
        self.stat.on_fill(addr.slot_index());
    }
    /// Overwrite one cached byte. The caller establishes residency first,
    /// via `lookup` or `fill`.
    pub fn update(&mut self, addr: Addr, value: u8) {
        self.slots[addr.slot_index()].block[addr.block_offset()] = value;
    }
    #[cfg(feature = "stat")]
    pub(crate) fn note_access(&mut self, kind: AccessKind, hit: bool) {
        self.stat.note(kind, hit);
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of one slot, for display and serialization.
#[derive(Clone, Serialize)]
pub struct SlotSnapshot {
    pub slot_index: u8,
    pub valid: bool,
    pub tag: u32,
    pub block: Block,
}

impl Cache {
    pub fn dump(&self) -> Vec<SlotSnapshot> {
        self.slots
            .iter()
            .map(|s| SlotSnapshot {
                slot_index: s.index,
                valid: s.valid,
                tag: s.tag,
                block: s.block,
            })
            .collect()
    }
    pub fn get_view(&self) -> CacheView<'_> {
        CacheView { c: self }
    }
}

pub struct CacheView<'a> {
    c: &'a Cache,
}

impl fmt::Display for CacheView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "slot | valid | tag | data")?;
        for slot in &self.c.slots {
            let bytes = slot
                .block
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                f,
                "   {:x} |     {} | {:3x} | {bytes}",
                slot.index,
                u8::from(slot.valid),
                slot.tag
            )?;
        }
        Ok(())
    }
}

#[cfg(feature = "stat")]
impl AddStats for Cache {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::AccessKind;
    use crate::{addr::NUM_SLOTS, stat::*};

    #[derive(Clone, Copy, Default)]
    pub struct CacheStat {
        read: HitMissCount,
        write: HitMissCount,
        fills: [usize; NUM_SLOTS],
    }

    impl CacheStat {
        pub fn note(&mut self, kind: AccessKind, hit: bool) {
            match kind {
                AccessKind::Read => self.read.incr(hit),
                AccessKind::Write => self.write.incr(hit),
            }
        }
        pub fn on_fill(&mut self, slot: usize) {
            self.fills[slot] += 1;
        }
    }

    #[derive(Clone, Copy, Default)]
    struct HitMissCount {
        hit: usize,
        miss: usize,
    }

    impl HitMissCount {
        fn incr(&mut self, hit: bool) {
            if hit {
                self.hit += 1;
            } else {
                self.miss += 1;
            }
        }
    }

    impl Stat for CacheStat {
        fn view(&self, max_width: usize) -> Box<dyn StatView + '_> {
            Box::new(CacheStatView::new(self, max_width))
        }
    }

    pub struct CacheStatView<'a> {
        stat: &'a CacheStat,
        chunk_size: usize,
    }

    impl<'a> CacheStatView<'a> {
        pub fn new(stat: &'a CacheStat, max_width: usize) -> Self {
            Self {
                stat,
                chunk_size: Self::chunk_size(max_width),
            }
        }
    }

    impl Width for CacheStatView<'_> {
        fn width_by_chunk_size(chunk_size: usize) -> usize {
            chunk_size * 13 + (chunk_size - 1) * 2 + 2
        }
    }

    impl StatView for CacheStatView<'_> {
        fn header(&self) -> &'static str {
            "cache accesses (format: `# of hit / # of miss`)"
        }
        fn width(&self) -> usize {
            Self::width_by_chunk_size(self.chunk_size)
        }
    }

    impl fmt::Display for CacheStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            macro_rules! output {
                ($kind:ident => $name:expr) => {{
                    let h = self.stat.$kind.hit;
                    let m = self.stat.$kind.miss;
                    writeln!(f, "  {:>5}:{h:>10} /{m:>10}", $name)
                }};
            }
            output!(read => "read")?;
            output!(write => "write")?;
            writeln!(f, "  block fills by slot:")?;
            let map: Vec<_> = self
                .stat
                .fills
                .iter()
                .enumerate()
                .map(|(i, n)| format!("{i:>4x}:{n:>8}"))
                .collect();
            for chunk in map.chunks(self.chunk_size) {
                let s = chunk.join(", ");
                writeln!(f, "  {s}")?;
            }
            Ok(())
        }
    }
}
