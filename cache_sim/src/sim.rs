use crate::{
    addr::Addr,
    cache::{Cache, CacheView, SlotSnapshot},
    memory::{MainMemory, Result},
};

#[cfg(feature = "stat")]
use crate::cache::AccessKind;

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// One simulated machine: a main memory and the direct-mapped
/// write-through cache in front of it. All memory mutation goes through
/// `write`, so a valid slot's block always mirrors memory.
pub struct Simulator {
    mem: MainMemory,
    cache: Cache,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

pub struct ReadOutcome {
    pub value: u8,
    pub hit: bool,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            mem: MainMemory::new(),
            cache: Cache::new(),
            #[cfg(feature = "stat")]
            stat_builder: stat::SimStatBuilder::new(),
        }
    }

    /// Cache read. A miss brings the containing block into its slot
    /// before the byte is returned; main memory is never written.
    pub fn read(&mut self, addr: Addr) -> Result<ReadOutcome> {
        self.mem.check(addr)?;
        #[cfg(feature = "stat")]
        self.stat_builder.on_op();
        let (value, hit) = match self.cache.lookup(addr) {
            Some(value) => {
                log::trace!("read {addr}: hit");
                (value, true)
            }
            None => {
                let block = self.mem.read_block(addr.block_base())?;
                let value = block[addr.block_offset()];
                log::trace!(
                    "read {addr}: miss, filling slot {:x} from {}",
                    addr.slot_index(),
                    addr.block_base()
                );
                self.cache.fill(addr, block);
                (value, false)
            }
        };
        #[cfg(feature = "stat")]
        self.cache.note_access(AccessKind::Read, hit);
        Ok(ReadOutcome { value, hit })
    }

    /// Cache write. Fills the slot on a miss, overwrites the cached byte,
    /// and writes through to main memory on every path. The returned flag
    /// is the pre-write hit state of the slot.
    pub fn write(&mut self, addr: Addr, value: u8) -> Result<bool> {
        self.mem.check(addr)?;
        #[cfg(feature = "stat")]
        self.stat_builder.on_op();
        let hit = self.cache.lookup(addr).is_some();
        if !hit {
            let block = self.mem.read_block(addr.block_base())?;
            self.cache.fill(addr, block);
        }
        self.cache.update(addr, value);
        self.mem.write_byte(addr, value)?;
        log::trace!(
            "write {addr} <- {value:#04x}: {}",
            if hit { "hit" } else { "miss" }
        );
        #[cfg(feature = "stat")]
        self.cache.note_access(AccessKind::Write, hit);
        Ok(hit)
    }

    /// Direct main-memory byte, bypassing the cache. Inspection only.
    pub fn get_mem(&self, addr: Addr) -> Result<u8> {
        self.mem.read_byte(addr)
    }

    pub fn dump(&self) -> Vec<SlotSnapshot> {
        self.cache.dump()
    }

    pub fn cache_view(&self) -> CacheView<'_> {
        self.cache.get_view()
    }

    #[cfg(feature = "stat")]
    pub fn exit_sim(&mut self) {
        self.stat_builder.stop_timer();
    }

    #[cfg(not(feature = "stat"))]
    pub fn exit_sim(&mut self) {}

    #[cfg(feature = "stat")]
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish()));
        self.cache.add_stats(buf);
        self.mem.add_stats(buf);
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::{fmt, time};

    use crate::stat::*;

    pub struct SimStatBuilder {
        begin: time::Instant,
        ops: usize,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                ops: 0,
                elapsed: None,
            }
        }
        pub fn on_op(&mut self) {
            self.ops += 1;
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(time::Instant::now() - self.begin)
        }
        pub fn finish(&self) -> SimStat {
            SimStat {
                ops: self.ops,
                elapsed: self.elapsed.unwrap_or_else(|| self.begin.elapsed()),
            }
        }
    }

    impl Default for SimStatBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct SimStat {
        ops: usize,
        elapsed: time::Duration,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ SimStat {
        fn header(&self) -> &'static str {
            "simulator stat"
        }
        fn width(&self) -> usize {
            30
        }
    }

    impl fmt::Display for &'_ SimStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let ms = format!("{} ms", self.elapsed.as_millis());
            writeln!(f, "  elapsed total: {ms:>9}")?;
            let ops = format!("#{}", self.ops);
            writeln!(f, "  operations total: {ops:>6}")
        }
    }
}
