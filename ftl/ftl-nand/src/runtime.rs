use ftl_geometry::{BlockAddr, Geometry};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// DRAM-side per-block state shared between the driver and the translation
/// core.
///
/// The driver increments the erase and program counters; the core reads them
/// for wear-aware selection and both sides read and write the bad block
/// table. Counters are atomics so the structure can be shared behind an
/// `Arc` without a lock.
pub struct NandRuntime {
    geometry: Geometry,
    erase_count: Vec<AtomicU32>,
    program_count: Vec<AtomicU32>,
    bad_block: Vec<AtomicBool>,
    injected_fail: Mutex<HashSet<BlockAddr>>,
}

impl NandRuntime {
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        let blocks = geometry.total_blocks() as usize;
        Self {
            geometry,
            erase_count: (0..blocks).map(|_| AtomicU32::new(0)).collect(),
            program_count: (0..blocks).map(|_| AtomicU32::new(0)).collect(),
            bad_block: (0..blocks).map(|_| AtomicBool::new(false)).collect(),
            injected_fail: Mutex::new(HashSet::new()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub fn erase_count(&self, addr: BlockAddr) -> u32 {
        self.erase_count[self.geometry.block_index(addr)].load(Ordering::Relaxed)
    }

    pub fn record_erase(&self, addr: BlockAddr) {
        self.erase_count[self.geometry.block_index(addr)].fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn program_count(&self, addr: BlockAddr) -> u32 {
        self.program_count[self.geometry.block_index(addr)].load(Ordering::Relaxed)
    }

    pub fn record_program(&self, addr: BlockAddr) {
        self.program_count[self.geometry.block_index(addr)].fetch_add(1, Ordering::Relaxed);
    }

    /// In-memory bad block table lookup.
    #[must_use]
    pub fn is_bad(&self, addr: BlockAddr) -> bool {
        self.bad_block[self.geometry.block_index(addr)].load(Ordering::Relaxed)
    }

    /// Flag a block bad in the in-memory table.
    pub fn set_bad(&self, addr: BlockAddr) {
        self.bad_block[self.geometry.block_index(addr)].store(true, Ordering::Relaxed);
    }

    /// Seed one table entry, e.g. from an OOB scan at boot.
    pub fn seed_bad(&self, addr: BlockAddr, bad: bool) {
        self.bad_block[self.geometry.block_index(addr)].store(bad, Ordering::Relaxed);
    }

    /// Arm a block so that any command touching it fails. Test hook.
    pub fn inject_fail(&self, addr: BlockAddr) {
        self.fail_set().insert(addr);
    }

    pub fn clear_fail(&self, addr: BlockAddr) {
        self.fail_set().remove(&addr);
    }

    #[must_use]
    pub fn should_fail(&self, addr: BlockAddr) -> bool {
        self.fail_set().contains(&addr)
    }

    fn fail_set(&self) -> MutexGuard<'_, HashSet<BlockAddr>> {
        // Poisoning carries no meaning for a plain set; keep going.
        self.injected_fail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
