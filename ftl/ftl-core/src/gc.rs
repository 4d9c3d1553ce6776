use crate::error::FtlError;
use crate::ftl::{Ftl, PageState};
use ftl_geometry::{BlockAddr, Vbn};
use ftl_nand::NandOp;
use log::{debug, warn};

impl Ftl {
    /// Reclaim exactly one block.
    ///
    /// Picks the candidate with the fewest valid pages across all planes
    /// (ties go to scan order), relocates its live pages through the regular
    /// failure-handled program path, then erases it. Aborts without touching
    /// the remaining mappings when a relocation target cannot be allocated.
    pub fn run_gc(&mut self) -> Result<(), FtlError> {
        let victim = self.select_victim().ok_or(FtlError::NoVictim)?;
        debug!("gc: reclaiming {victim:?}");

        for g in 0..self.geometry.pages_per_block {
            let old_addr = victim.page(g);
            let old = self.geometry.pba(old_addr);
            if self.pstate[old.as_usize()] != PageState::Valid {
                continue;
            }
            let Some(lba) = self.p2l[old.as_usize()] else {
                continue;
            };

            let Some(dest) = self.alloc_any_page() else {
                warn!("gc: no relocation target, aborting");
                return Err(FtlError::NoSpace);
            };

            let mut read = NandOp::read_page(old_addr);
            let status = self.driver.submit(&mut read);
            if !status.is_success() {
                warn!("gc: cannot read {old_addr:?} ({status:?}), aborting");
                return Err(FtlError::ReadFailed(status));
            }
            let data = read.data.swap_remove(0);

            match self.program_with_handling(dest, &data, lba) {
                Ok(final_dest) => {
                    self.l2p[lba.as_usize()] = Some(final_dest);
                    self.p2l[final_dest.as_usize()] = Some(lba);
                    self.pstate[final_dest.as_usize()] = PageState::Valid;
                    self.pstate[old.as_usize()] = PageState::Invalid;
                    self.p2l[old.as_usize()] = None;
                }
                Err(err) => {
                    // The copy is gone; unmap so the loss stays observable.
                    warn!("gc: relocating {lba:?} failed: {err}");
                    self.l2p[lba.as_usize()] = None;
                    self.pstate[old.as_usize()] = PageState::Invalid;
                    self.p2l[old.as_usize()] = None;
                }
            }
        }

        self.erase_block_txn(victim);
        Ok(())
    }

    /// Greedy min-valid victim selection over the resolved backing of every
    /// VBN, skipping bad-flagged blocks and each plane's open block.
    fn select_victim(&self) -> Option<BlockAddr> {
        let mut best: Option<(BlockAddr, u32)> = None;
        for (die, plane) in self.geometry.planes() {
            let open = self.alloc.open_block(die, plane);
            for v in 0..self.geometry.blocks_per_plane {
                let vbn = Vbn::new(v);
                if open == Some(vbn) {
                    continue;
                }
                let block = BlockAddr::new(die, plane, self.alloc.resolve_pbn(die, plane, vbn));
                if self.runtime.is_bad(block) {
                    continue;
                }
                let valid = (0..self.geometry.pages_per_block)
                    .filter(|&g| {
                        self.pstate[self.geometry.pba(block.page(g)).as_usize()]
                            == PageState::Valid
                    })
                    .count() as u32;
                if best.is_none_or(|(_, lowest)| valid < lowest) {
                    best = Some((block, valid));
                }
            }
        }
        best.map(|(block, _)| block)
    }
}
