use crate::error::FtlError;
use ftl_alloc::{BlockAllocator, BlockKey};
use ftl_geometry::{BlockAddr, Geometry, Lba, PageAddr, Pba};
use ftl_nand::{NandDriver, NandOp, NandRuntime, NandStatus};
use log::{debug, warn};
use std::sync::Arc;

/// Construction parameters for the translation layer.
#[derive(Copy, Clone, Debug)]
pub struct FtlConfig {
    /// Blocks per plane set aside for write pressure.
    pub reserved_write_per_plane: u32,
    /// Blocks per plane set aside for bad-block substitution.
    pub reserved_spare_per_plane: u32,
    /// Number of logical addresses exposed to the host.
    pub total_lbas: u32,
}

/// Lifecycle state of one physical page.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PageState {
    #[default]
    Empty,
    Valid,
    Invalid,
}

/// The translation core.
///
/// Owns the L2P/P2L tables, the per-page states and the block allocator;
/// shares the DRAM-side runtime state (bad block table, erase counters) with
/// the driver. Entry points take `&mut self`: one request at a time.
pub struct Ftl {
    pub(crate) driver: Arc<NandDriver>,
    pub(crate) runtime: Arc<NandRuntime>,
    pub(crate) alloc: BlockAllocator,
    pub(crate) geometry: Geometry,
    pub(crate) l2p: Vec<Option<Pba>>,
    pub(crate) p2l: Vec<Option<Lba>>,
    pub(crate) pstate: Vec<PageState>,
    seq: u64,
}

impl Ftl {
    /// Seed the in-memory bad block table from the driver's OOB marks, then
    /// initialise the allocator pools (remapping factory-bad blocks).
    ///
    /// # Panics
    /// When the configuration exposes more logical addresses than physical
    /// pages exist.
    #[must_use]
    pub fn new(driver: Arc<NandDriver>, config: FtlConfig) -> Self {
        let geometry = driver.geometry();
        assert!(
            config.total_lbas <= geometry.total_pages(),
            "more logical addresses than physical pages"
        );
        let runtime = Arc::clone(driver.runtime());

        for addr in geometry.blocks() {
            runtime.seed_bad(addr, driver.is_block_bad(addr));
        }

        let mut alloc = BlockAllocator::new(
            geometry,
            Arc::clone(&runtime),
            config.reserved_write_per_plane,
            config.reserved_spare_per_plane,
        );
        alloc.init_from_bbt(|addr| driver.is_block_bad(addr));

        let total_pages = geometry.total_pages() as usize;
        Self {
            driver,
            runtime,
            alloc,
            geometry,
            l2p: vec![None; config.total_lbas as usize],
            p2l: vec![None; total_pages],
            pstate: vec![PageState::Empty; total_pages],
            seq: 1,
        }
    }

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Number of logical addresses exposed to the host.
    #[inline]
    #[must_use]
    pub fn total_lbas(&self) -> usize {
        self.l2p.len()
    }

    /// Store `data` under `lba`.
    ///
    /// Any previous mapping is invalidated first; on failure the address is
    /// left unmapped. When no page is free, one garbage-collection pass runs
    /// before the allocation is retried.
    pub fn write(&mut self, lba: Lba, data: &[u8]) -> Result<(), FtlError> {
        let slot = lba.as_usize();
        if slot >= self.l2p.len() {
            return Err(FtlError::BadLba(lba));
        }
        if let Some(old) = self.l2p[slot].take() {
            self.pstate[old.as_usize()] = PageState::Invalid;
            self.p2l[old.as_usize()] = None;
        }

        let pba = match self.alloc_any_page() {
            Some(pba) => pba,
            None => {
                if let Err(err) = self.run_gc() {
                    debug!("write {lba:?}: nothing reclaimed: {err}");
                }
                self.alloc_any_page().ok_or(FtlError::NoSpace)?
            }
        };

        let pba = self.program_with_handling(pba, data, lba)?;
        self.l2p[slot] = Some(pba);
        self.p2l[pba.as_usize()] = Some(lba);
        self.pstate[pba.as_usize()] = PageState::Valid;
        Ok(())
    }

    /// Fetch the payload last stored under `lba`.
    pub fn read(&self, lba: Lba) -> Result<Vec<u8>, FtlError> {
        let slot = lba.as_usize();
        if slot >= self.l2p.len() {
            return Err(FtlError::BadLba(lba));
        }
        let Some(pba) = self.l2p[slot] else {
            return Err(FtlError::Unmapped(lba));
        };
        if self.pstate[pba.as_usize()] != PageState::Valid {
            return Err(FtlError::Unmapped(lba));
        }
        let mut op = NandOp::read_page(self.geometry.page_addr(pba));
        let status = self.driver.submit(&mut op);
        if !status.is_success() {
            return Err(FtlError::ReadFailed(status));
        }
        Ok(op.data.swap_remove(0))
    }

    /// Current physical location of a logical address, if mapped.
    #[must_use]
    pub fn mapping(&self, lba: Lba) -> Option<Pba> {
        self.l2p.get(lba.as_usize()).copied().flatten()
    }

    /// Logical address stored on a physical page, if any.
    #[must_use]
    pub fn reverse_mapping(&self, pba: Pba) -> Option<Lba> {
        self.p2l.get(pba.as_usize()).copied().flatten()
    }

    #[must_use]
    pub fn page_state(&self, pba: Pba) -> PageState {
        self.pstate
            .get(pba.as_usize())
            .copied()
            .unwrap_or_default()
    }

    /// Allocator view, e.g. for state inspection in tools and tests.
    #[must_use]
    pub const fn allocator(&self) -> &BlockAllocator {
        &self.alloc
    }

    /// Program `data` at `pba`, treating any failure as a grown-bad block:
    /// the block is marked bad in OOB and the table, all of its pages are
    /// conservatively invalidated, its VBN is remapped onto a spare, a fresh
    /// page is allocated and the program retried exactly once.
    ///
    /// Returns the address the data finally landed on.
    pub(crate) fn program_with_handling(
        &mut self,
        pba: Pba,
        data: &[u8],
        lba: Lba,
    ) -> Result<Pba, FtlError> {
        let addr = self.geometry.page_addr(pba);
        if self.runtime.is_bad(addr.block) {
            return Err(FtlError::ProgramFailed);
        }
        if self.program_once(addr, data, lba).is_success() {
            return Ok(pba);
        }

        self.retire_block(addr.block);
        let block = addr.block;
        self.alloc
            .remap_grown_bad(block.die, block.plane, block.block);
        self.alloc
            .drop_open_if_matches(block.die, block.plane, BlockKey::Phys(block.block));

        let retry = self.alloc_any_page().ok_or(FtlError::ProgramFailed)?;
        let retry_addr = self.geometry.page_addr(retry);
        if self.program_once(retry_addr, data, lba).is_success() {
            Ok(retry)
        } else {
            Err(FtlError::ProgramFailed)
        }
    }

    /// Erase a physical block and return its VBN to the free pool.
    ///
    /// A bad-flagged block is left alone. An erase failure retires the block
    /// (OOB mark, table flag, spare substitution) but the transaction still
    /// completes: page states reset and the backing VBN recycles.
    pub(crate) fn erase_block_txn(&mut self, block: BlockAddr) {
        if self.runtime.is_bad(block) {
            return;
        }
        let mut op = NandOp::erase_block(block);
        let status = self.driver.submit(&mut op);
        if !status.is_success() {
            warn!("erase failed on {block:?} ({status:?}); retiring block");
            self.driver.mark_block_bad_oob(block);
            self.runtime.set_bad(block);
            self.alloc
                .remap_grown_bad(block.die, block.plane, block.block);
        }
        for g in 0..self.geometry.pages_per_block {
            let idx = self.geometry.pba(block.page(g)).as_usize();
            self.pstate[idx] = PageState::Empty;
            self.p2l[idx] = None;
        }
        self.alloc
            .on_erase_complete(block.die, block.plane, block.block);
    }

    /// Scan the planes in fixed order for a free page.
    pub(crate) fn alloc_any_page(&mut self) -> Option<Pba> {
        self.geometry
            .planes()
            .find_map(|(die, plane)| self.alloc.alloc_page(die, plane))
    }

    fn program_once(&mut self, addr: PageAddr, data: &[u8], lba: Lba) -> NandStatus {
        let seq = self.seq;
        self.seq += 1;
        let mut op = NandOp::program_page(addr, data.to_vec(), Some(lba), seq);
        self.driver.submit(&mut op)
    }

    /// Flag a block bad everywhere and invalidate all of its pages, unmapping
    /// any logical address that pointed into it. Conservative: even erased
    /// pages are retired.
    fn retire_block(&mut self, block: BlockAddr) {
        self.driver.mark_block_bad_oob(block);
        self.runtime.set_bad(block);
        for g in 0..self.geometry.pages_per_block {
            let idx = self.geometry.pba(block.page(g)).as_usize();
            if self.pstate[idx] == PageState::Valid
                && let Some(lba) = self.p2l[idx]
            {
                self.l2p[lba.as_usize()] = None;
            }
            self.pstate[idx] = PageState::Invalid;
            self.p2l[idx] = None;
        }
        warn!("program failure: {block:?} presumed bad, pages invalidated");
    }
}
