use crate::plane::{Cursor, PlaneState, Pool};
use ftl_geometry::{BlockAddr, Geometry, Pba, Pbn, Vbn};
use ftl_nand::NandRuntime;
use log::{debug, info, warn};
use std::sync::Arc;

/// A block reference handed to [`BlockAllocator::drop_open_if_matches`]:
/// either the physical number itself or a virtual number to resolve first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockKey {
    Phys(Pbn),
    Virt(Vbn),
}

/// Point-in-time view of one plane's allocator state.
#[derive(Clone, Debug)]
pub struct PlaneSnapshot {
    pub free_vbns: Vec<Vbn>,
    pub reserved_write_vbns: Vec<Vbn>,
    pub reserved_spare_pbns: Vec<Pbn>,
    pub cursor: Cursor,
}

/// Block allocator with bad-block substitution.
///
/// Owns the per-plane pools, the remap tables and the write cursors. Reads
/// the shared runtime state for wear-aware selection and bad-block
/// filtering; never talks to the driver itself.
pub struct BlockAllocator {
    geometry: Geometry,
    runtime: Arc<NandRuntime>,
    reserved_write: u32,
    reserved_spare: u32,
    planes: Vec<PlaneState>,
}

impl BlockAllocator {
    /// When the two reservations together exceed the plane size, the spare
    /// reservation takes precedence and the write reservation is truncated.
    #[must_use]
    pub fn new(
        geometry: Geometry,
        runtime: Arc<NandRuntime>,
        reserved_write_per_plane: u32,
        reserved_spare_per_plane: u32,
    ) -> Self {
        let total = geometry.blocks_per_plane;
        let mut reserved_spare = reserved_spare_per_plane;
        let mut reserved_write = reserved_write_per_plane;
        if reserved_spare + reserved_write > total {
            reserved_spare = reserved_spare.min(total);
            reserved_write = total - reserved_spare;
            warn!(
                "reservations exceed plane size; truncated to write={reserved_write} spare={reserved_spare}"
            );
        }
        let plane_count = (geometry.dies * geometry.planes_per_die) as usize;
        Self {
            geometry,
            runtime,
            reserved_write,
            reserved_spare,
            planes: (0..plane_count)
                .map(|_| PlaneState::new(geometry.blocks_per_plane))
                .collect(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Build the pools from a bad-block predicate and remap factory-bad
    /// blocks onto spares.
    ///
    /// The plane's block range is partitioned `[normal | reserved-write |
    /// reserved-spare]` from the tail, skipping bad blocks. Every factory-bad
    /// VBN that can be backed by a spare joins the normal free pool, even
    /// one whose identity block lies in the reserved-write range. A VBN with
    /// no spare left is retired for good. Finally the first free VBN is
    /// consumed to open the plane's write cursor.
    pub fn init_from_bbt(&mut self, is_bad: impl Fn(BlockAddr) -> bool) {
        let total = self.geometry.blocks_per_plane;
        let start_write = total - (self.reserved_write + self.reserved_spare);
        let start_spare = total - self.reserved_spare;

        for (die, plane) in self.geometry.planes() {
            let idx = (die * self.geometry.planes_per_die + plane) as usize;
            let state = &mut self.planes[idx];
            state.reset();

            for b in start_spare..total {
                if !is_bad(BlockAddr::new(die, plane, Pbn::new(b))) {
                    state.reserved_spare_pbns.push_back(Pbn::new(b));
                }
            }
            for b in start_write..start_spare {
                if !is_bad(BlockAddr::new(die, plane, Pbn::new(b))) {
                    state.reserved_write_vbns.push_back(Vbn::new(b));
                }
            }
            for b in 0..start_write {
                if !is_bad(BlockAddr::new(die, plane, Pbn::new(b))) {
                    state.free_vbns.push_back(Vbn::new(b));
                }
            }

            for v in 0..total {
                let vbn = Vbn::new(v);
                if !is_bad(BlockAddr::new(die, plane, vbn.identity_pbn())) {
                    continue;
                }
                if let Some(spare) = state.take_spare() {
                    state.install_remap(vbn, spare, vbn.identity_pbn());
                    state.free_vbns.push_back(vbn);
                    debug!("factory-bad d{die}/p{plane}: {vbn:?} remapped to {spare:?}");
                } else {
                    warn!("factory-bad d{die}/p{plane}: no spare for {vbn:?}, block retired");
                }
            }

            state.cursor = match state.free_vbns.pop_front() {
                Some(vbn) => Cursor::Open { vbn, next_page: 0 },
                None => Cursor::Closed,
            };
        }
    }

    /// Hand out a fresh physical page in this plane, opening a new block if
    /// the cursor has no capacity. Returns `None` when both VBN pools are
    /// exhausted or the plane is out of range.
    pub fn alloc_page(&mut self, die: u32, plane: u32) -> Option<Pba> {
        let idx = self.plane_index(die, plane)?;
        let pages = self.geometry.pages_per_block;
        let state = &mut self.planes[idx];

        let reopen = !matches!(state.cursor, Cursor::Open { next_page, .. } if next_page < pages);
        if reopen {
            let vbn = state
                .pick_wear_aware(Pool::Free, die, plane, &self.runtime)
                .or_else(|| state.pick_wear_aware(Pool::ReservedWrite, die, plane, &self.runtime))?;
            state.cursor = Cursor::Open { vbn, next_page: 0 };
        }
        let Cursor::Open { vbn, next_page } = state.cursor else {
            return None;
        };
        state.cursor = Cursor::Open {
            vbn,
            next_page: next_page + 1,
        };
        let pbn = state.resolve(vbn);
        Some(
            self.geometry
                .pba(BlockAddr::new(die, plane, pbn).page(next_page)),
        )
    }

    /// Same selection policy as [`Self::alloc_page`] but hands out a whole
    /// block and leaves the write cursor alone.
    pub fn alloc_block(&mut self, die: u32, plane: u32) -> Option<Vbn> {
        let idx = self.plane_index(die, plane)?;
        let state = &mut self.planes[idx];
        state
            .pick_wear_aware(Pool::Free, die, plane, &self.runtime)
            .or_else(|| state.pick_wear_aware(Pool::ReservedWrite, die, plane, &self.runtime))
    }

    /// Return the VBN backed by `pbn` to the free pool after its erase
    /// completed. No-op when the reverse mapping is vacant.
    pub fn on_erase_complete(&mut self, die: u32, plane: u32, pbn: Pbn) {
        let Some(idx) = self.plane_index(die, plane) else {
            return;
        };
        if pbn.as_u32() >= self.geometry.blocks_per_plane {
            return;
        }
        let state = &mut self.planes[idx];
        if let Some(vbn) = state.reverse_vbn(pbn) {
            state.free_vbns.push_back(vbn);
        }
    }

    /// Close the write cursor if its resolved backing equals the given block.
    pub fn drop_open_if_matches(&mut self, die: u32, plane: u32, key: BlockKey) {
        let Some(idx) = self.plane_index(die, plane) else {
            return;
        };
        let state = &mut self.planes[idx];
        let Some(open) = state.cursor.open_vbn() else {
            return;
        };
        let key_pbn = match key {
            BlockKey::Phys(pbn) => pbn,
            BlockKey::Virt(vbn) => state.resolve(vbn),
        };
        if state.resolve(open) == key_pbn {
            state.cursor = Cursor::Closed;
        }
    }

    /// Substitute a fresh spare for the VBN currently backed by `bad_pbn`.
    ///
    /// Draws from the spare pool, falling back to promoting the least-worn
    /// free block's backing into it. Clears the write cursor if it pointed at
    /// the remapped VBN. Returns false when no victim VBN exists or no spare
    /// can be produced.
    pub fn remap_grown_bad(&mut self, die: u32, plane: u32, bad_pbn: Pbn) -> bool {
        let Some(idx) = self.plane_index(die, plane) else {
            return false;
        };
        if bad_pbn.as_u32() >= self.geometry.blocks_per_plane {
            return false;
        }
        let Some(vbn) = self.planes[idx].reverse_vbn(bad_pbn) else {
            return false;
        };
        let mut spare = self.planes[idx].take_spare();
        if spare.is_none() && self.promote_spare(die, plane, idx) {
            spare = self.planes[idx].take_spare();
        }
        let Some(spare) = spare else {
            warn!("grown-bad d{die}/p{plane}/{bad_pbn:?}: no spare left, {vbn:?} lost");
            return false;
        };
        self.planes[idx].install_remap(vbn, spare, bad_pbn);
        info!("grown-bad d{die}/p{plane}/{bad_pbn:?}: {vbn:?} remapped to {spare:?}");
        self.drop_open_if_matches(die, plane, BlockKey::Virt(vbn));
        true
    }

    /// Current physical backing of a VBN (identity unless remapped).
    #[must_use]
    pub fn resolve_pbn(&self, die: u32, plane: u32, vbn: Vbn) -> Pbn {
        if vbn.as_u32() >= self.geometry.blocks_per_plane {
            return vbn.identity_pbn();
        }
        self.plane_index(die, plane)
            .map_or_else(|| vbn.identity_pbn(), |idx| self.planes[idx].resolve(vbn))
    }

    /// The VBN currently backed by `pbn`, if any.
    #[must_use]
    pub fn reverse_vbn(&self, die: u32, plane: u32, pbn: Pbn) -> Option<Vbn> {
        if pbn.as_u32() >= self.geometry.blocks_per_plane {
            return None;
        }
        self.plane_index(die, plane)
            .and_then(|idx| self.planes[idx].reverse_vbn(pbn))
    }

    /// The plane's open VBN, saturated or not.
    #[must_use]
    pub fn open_block(&self, die: u32, plane: u32) -> Option<Vbn> {
        self.plane_index(die, plane)
            .and_then(|idx| self.planes[idx].cursor.open_vbn())
    }

    #[must_use]
    pub fn plane_snapshot(&self, die: u32, plane: u32) -> Option<PlaneSnapshot> {
        let idx = self.plane_index(die, plane)?;
        let state = &self.planes[idx];
        Some(PlaneSnapshot {
            free_vbns: state.free_vbns.iter().copied().collect(),
            reserved_write_vbns: state.reserved_write_vbns.iter().copied().collect(),
            reserved_spare_pbns: state.reserved_spare_pbns.iter().copied().collect(),
            cursor: state.cursor,
        })
    }

    /// Move the least-worn free backing into the spare pool. The donating
    /// VBN leaves circulation entirely.
    fn promote_spare(&mut self, die: u32, plane: u32, idx: usize) -> bool {
        let state = &mut self.planes[idx];
        let vbn = state
            .pick_wear_aware(Pool::Free, die, plane, &self.runtime)
            .or_else(|| state.pick_wear_aware(Pool::ReservedWrite, die, plane, &self.runtime));
        let Some(vbn) = vbn else {
            return false;
        };
        let pbn = state.resolve(vbn);
        state.reserved_spare_pbns.push_back(pbn);
        info!("d{die}/p{plane}: promoted {pbn:?} to spare, retiring {vbn:?}");
        true
    }

    fn plane_index(&self, die: u32, plane: u32) -> Option<usize> {
        (die < self.geometry.dies && plane < self.geometry.planes_per_die)
            .then(|| (die * self.geometry.planes_per_die + plane) as usize)
    }
}
