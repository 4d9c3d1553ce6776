use crate::model::NandModel;
use crate::runtime::NandRuntime;
use ftl_geometry::{BlockAddr, Geometry, Lba, PageAddr};
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// NAND command set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NandCmd {
    ReadPage,
    ProgramPage,
    EraseBlock,
}

/// Per-operation completion status reported by the driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NandStatus {
    Success,
    Failed,
    BadBlock,
    EccError,
    Timeout,
}

impl NandStatus {
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A NAND operation: command, targets, and parameter arrays aligned by index
/// with `targets`. `READ_PAGE` repopulates `data`/`oob_lba`/`oob_seq` on
/// return; `PROGRAM_PAGE` consumes them.
#[derive(Debug)]
pub struct NandOp {
    pub cmd: NandCmd,
    pub targets: Vec<PageAddr>,
    pub data: Vec<Vec<u8>>,
    pub oob_lba: Vec<Option<Lba>>,
    pub oob_seq: Vec<u64>,
}

impl NandOp {
    #[must_use]
    pub fn read_page(addr: PageAddr) -> Self {
        Self {
            cmd: NandCmd::ReadPage,
            targets: vec![addr],
            data: Vec::new(),
            oob_lba: Vec::new(),
            oob_seq: Vec::new(),
        }
    }

    #[must_use]
    pub fn program_page(addr: PageAddr, data: Vec<u8>, lba: Option<Lba>, seq: u64) -> Self {
        Self {
            cmd: NandCmd::ProgramPage,
            targets: vec![addr],
            data: vec![data],
            oob_lba: vec![lba],
            oob_seq: vec![seq],
        }
    }

    #[must_use]
    pub fn erase_block(addr: BlockAddr) -> Self {
        Self {
            cmd: NandCmd::EraseBlock,
            targets: vec![addr.page(0)],
            data: Vec::new(),
            oob_lba: Vec::new(),
            oob_seq: Vec::new(),
        }
    }
}

/// Cumulative driver statistics.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NandStats {
    pub reads: u64,
    pub programs: u64,
    pub erases: u64,
    pub failures: u64,
    pub bad_blocks_detected: u64,
}

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    programs: AtomicU64,
    erases: AtomicU64,
    failures: AtomicU64,
    bad_blocks_detected: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> NandStats {
        NandStats {
            reads: self.reads.load(Ordering::Relaxed),
            programs: self.programs.load(Ordering::Relaxed),
            erases: self.erases.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bad_blocks_detected: self.bad_blocks_detected.load(Ordering::Relaxed),
        }
    }
}

/// Command façade over the physical model.
///
/// All entry points take `&self`: the model sits behind a mutex and the
/// shared runtime state is atomic, so the driver may be called from multiple
/// threads. Operations complete synchronously.
pub struct NandDriver {
    model: Mutex<NandModel>,
    runtime: Arc<NandRuntime>,
    stats: Counters,
}

impl NandDriver {
    #[must_use]
    pub fn new(model: NandModel, runtime: Arc<NandRuntime>) -> Self {
        Self {
            model: Mutex::new(model),
            runtime,
            stats: Counters::default(),
        }
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.model().geometry()
    }

    /// Handle to the shared DRAM-side state.
    #[must_use]
    pub const fn runtime(&self) -> &Arc<NandRuntime> {
        &self.runtime
    }

    #[must_use]
    pub fn stats(&self) -> NandStats {
        self.stats.snapshot()
    }

    /// Execute one operation. Parameter arrays are validated against the
    /// target list before anything touches the array.
    pub fn submit(&self, op: &mut NandOp) -> NandStatus {
        if let Some(status) = self.validate(op) {
            Counters::bump(&self.stats.failures);
            return status;
        }
        match op.cmd {
            NandCmd::ReadPage => {
                Counters::bump(&self.stats.reads);
                self.execute_read(op)
            }
            NandCmd::ProgramPage => {
                Counters::bump(&self.stats.programs);
                self.execute_program(op)
            }
            NandCmd::EraseBlock => {
                Counters::bump(&self.stats.erases);
                self.execute_erase(op)
            }
        }
    }

    /// True iff page 0 or page 1 OOB of the block carries a bad mark. Out of
    /// range addresses count as bad.
    #[must_use]
    pub fn is_block_bad(&self, addr: BlockAddr) -> bool {
        let model = self.model();
        if !model.geometry().contains_block(addr) {
            return true;
        }
        model.block_bad_marked(addr)
    }

    /// Persist a bad-block mark into the block's OOB area.
    pub fn mark_block_bad_oob(&self, addr: BlockAddr) {
        let mut model = self.model();
        if !model.geometry().contains_block(addr) {
            return;
        }
        model.mark_block_bad(addr);
        Counters::bump(&self.stats.bad_blocks_detected);
        info!("marking block {addr:?} bad");
    }

    #[must_use]
    pub fn erase_count(&self, addr: BlockAddr) -> u32 {
        self.runtime.erase_count(addr)
    }

    /// Pre-init bad-block injection: identical to a factory OOB mark.
    pub fn inject_factory_bad(&self, addr: BlockAddr) {
        self.mark_block_bad_oob(addr);
    }

    /// Arm a block so every command touching it reports failure.
    pub fn inject_runtime_fail(&self, addr: BlockAddr) {
        self.runtime.inject_fail(addr);
    }

    pub fn clear_runtime_fail(&self, addr: BlockAddr) {
        self.runtime.clear_fail(addr);
    }

    fn execute_read(&self, op: &mut NandOp) -> NandStatus {
        op.data.clear();
        op.oob_lba.clear();
        op.oob_seq.clear();
        let model = self.model();
        for &addr in &op.targets {
            if self.runtime.should_fail(addr.block) {
                debug!("read {addr:?}: injected failure");
                Counters::bump(&self.stats.failures);
                return NandStatus::Failed;
            }
            if model.block_bad_marked(addr.block) {
                Counters::bump(&self.stats.bad_blocks_detected);
                return NandStatus::BadBlock;
            }
            let page = model.page(addr);
            op.data.push(page.data.clone());
            op.oob_lba.push(page.oob.lba);
            op.oob_seq.push(page.oob.seq);
        }
        NandStatus::Success
    }

    fn execute_program(&self, op: &mut NandOp) -> NandStatus {
        let mut model = self.model();
        for (i, &addr) in op.targets.iter().enumerate() {
            if self.runtime.should_fail(addr.block) {
                debug!("program {addr:?}: injected failure");
                Counters::bump(&self.stats.failures);
                return NandStatus::Failed;
            }
            if model.block_bad_marked(addr.block) {
                Counters::bump(&self.stats.bad_blocks_detected);
                return NandStatus::BadBlock;
            }
            if !model.page(addr).is_erased() {
                debug!("program {addr:?}: page not erased");
                Counters::bump(&self.stats.failures);
                return NandStatus::Failed;
            }
            let page = model.page_mut(addr);
            if let Some(data) = op.data.get(i) {
                page.data.clone_from(data);
            }
            if let Some(&lba) = op.oob_lba.get(i) {
                page.oob.lba = lba;
            }
            if let Some(&seq) = op.oob_seq.get(i) {
                page.oob.seq = seq;
            }
            self.runtime.record_program(addr.block);
        }
        NandStatus::Success
    }

    fn execute_erase(&self, op: &mut NandOp) -> NandStatus {
        let mut model = self.model();
        for &addr in &op.targets {
            if self.runtime.should_fail(addr.block) {
                debug!("erase {:?}: injected failure", addr.block);
                Counters::bump(&self.stats.failures);
                return NandStatus::Failed;
            }
            if model.block_bad_marked(addr.block) {
                Counters::bump(&self.stats.bad_blocks_detected);
                return NandStatus::BadBlock;
            }
            model.erase_block(addr.block, true);
            self.runtime.record_erase(addr.block);
        }
        NandStatus::Success
    }

    /// Address and parameter-shape validation common to all commands.
    fn validate(&self, op: &NandOp) -> Option<NandStatus> {
        if op.targets.is_empty() {
            return Some(NandStatus::Failed);
        }
        let geometry = self.model().geometry();
        for &addr in &op.targets {
            if !geometry.contains_block(addr.block) {
                return Some(NandStatus::Failed);
            }
            if matches!(op.cmd, NandCmd::ReadPage | NandCmd::ProgramPage)
                && addr.page >= geometry.pages_per_block
            {
                return Some(NandStatus::Failed);
            }
        }
        if op.cmd == NandCmd::ProgramPage {
            let n = op.targets.len();
            if !op.data.is_empty() && op.data.len() != n {
                return Some(NandStatus::Failed);
            }
            if !op.oob_lba.is_empty() && op.oob_lba.len() != n {
                return Some(NandStatus::Failed);
            }
            if !op.oob_seq.is_empty() && op.oob_seq.len() != n {
                return Some(NandStatus::Failed);
            }
        }
        None
    }

    fn model(&self) -> MutexGuard<'_, NandModel> {
        // Poisoning is not fatal here; the model state stays consistent.
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
