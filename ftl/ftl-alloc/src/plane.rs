use ftl_geometry::{BlockAddr, Pbn, Vbn};
use ftl_nand::NandRuntime;
use std::collections::VecDeque;

/// Write cursor of a plane.
///
/// `Open { vbn, next_page }` means pages `[0, next_page)` of the resolved
/// backing have been handed out; a saturated cursor (`next_page` equal to the
/// pages per block) behaves like a closed one on the next allocation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cursor {
    Closed,
    Open { vbn: Vbn, next_page: u32 },
}

impl Cursor {
    #[must_use]
    pub const fn open_vbn(self) -> Option<Vbn> {
        match self {
            Self::Open { vbn, .. } => Some(vbn),
            Self::Closed => None,
        }
    }
}

/// Which VBN pool to draw from.
#[derive(Copy, Clone)]
pub(crate) enum Pool {
    Free,
    ReservedWrite,
}

/// All allocator state of one (die, plane).
pub(crate) struct PlaneState {
    pub(crate) free_vbns: VecDeque<Vbn>,
    pub(crate) reserved_write_vbns: VecDeque<Vbn>,
    pub(crate) reserved_spare_pbns: VecDeque<Pbn>,
    pub(crate) cursor: Cursor,
    /// VBN → current physical backing; `None` is the identity mapping.
    remap: Vec<Option<Pbn>>,
    /// PBN → the VBN it currently backs.
    reverse: Vec<Option<Vbn>>,
}

impl PlaneState {
    pub(crate) fn new(blocks: u32) -> Self {
        Self {
            free_vbns: VecDeque::new(),
            reserved_write_vbns: VecDeque::new(),
            reserved_spare_pbns: VecDeque::new(),
            cursor: Cursor::Closed,
            remap: vec![None; blocks as usize],
            reverse: (0..blocks).map(|b| Some(Vbn::new(b))).collect(),
        }
    }

    pub(crate) fn reset(&mut self) {
        let blocks = self.remap.len() as u32;
        *self = Self::new(blocks);
    }

    pub(crate) fn resolve(&self, vbn: Vbn) -> Pbn {
        self.remap[vbn.as_usize()].unwrap_or_else(|| vbn.identity_pbn())
    }

    pub(crate) fn reverse_vbn(&self, pbn: Pbn) -> Option<Vbn> {
        self.reverse[pbn.as_usize()]
    }

    /// Point `vbn` at `spare` and retire `old` from the reverse table.
    pub(crate) fn install_remap(&mut self, vbn: Vbn, spare: Pbn, old: Pbn) {
        self.remap[vbn.as_usize()] = Some(spare);
        self.reverse[spare.as_usize()] = Some(vbn);
        self.reverse[old.as_usize()] = None;
    }

    pub(crate) fn take_spare(&mut self) -> Option<Pbn> {
        self.reserved_spare_pbns.pop_front()
    }

    /// Remove and return the pool entry whose backing has the smallest erase
    /// count. Entries whose backing is flagged in the bad block table are
    /// skipped; ties keep the earliest entry.
    pub(crate) fn pick_wear_aware(
        &mut self,
        pool: Pool,
        die: u32,
        plane: u32,
        runtime: &NandRuntime,
    ) -> Option<Vbn> {
        let queue = match pool {
            Pool::Free => &self.free_vbns,
            Pool::ReservedWrite => &self.reserved_write_vbns,
        };
        let mut best: Option<(usize, u32)> = None;
        for (i, &vbn) in queue.iter().enumerate() {
            let addr = BlockAddr::new(die, plane, self.resolve(vbn));
            if runtime.is_bad(addr) {
                continue;
            }
            let ec = runtime.erase_count(addr);
            if best.is_none_or(|(_, lowest)| ec < lowest) {
                best = Some((i, ec));
            }
        }
        let (i, _) = best?;
        match pool {
            Pool::Free => self.free_vbns.remove(i),
            Pool::ReservedWrite => self.reserved_write_vbns.remove(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftl_geometry::Geometry;

    #[test]
    fn resolve_defaults_to_identity() {
        let state = PlaneState::new(4);
        assert_eq!(state.resolve(Vbn::new(3)), Pbn::new(3));
        assert_eq!(state.reverse_vbn(Pbn::new(3)), Some(Vbn::new(3)));
    }

    #[test]
    fn install_remap_updates_both_directions() {
        let mut state = PlaneState::new(4);
        state.install_remap(Vbn::new(1), Pbn::new(3), Pbn::new(1));
        assert_eq!(state.resolve(Vbn::new(1)), Pbn::new(3));
        assert_eq!(state.reverse_vbn(Pbn::new(3)), Some(Vbn::new(1)));
        assert_eq!(state.reverse_vbn(Pbn::new(1)), None);
    }

    #[test]
    fn wear_aware_pick_prefers_low_erase_counts() {
        let geometry = Geometry::new(1, 1, 4, 4);
        let runtime = NandRuntime::new(geometry);
        let mut state = PlaneState::new(4);
        state.free_vbns.extend([Vbn::new(0), Vbn::new(1), Vbn::new(2)]);

        for _ in 0..3 {
            runtime.record_erase(BlockAddr::new(0, 0, Pbn::new(0)));
        }
        runtime.record_erase(BlockAddr::new(0, 0, Pbn::new(1)));

        assert_eq!(
            state.pick_wear_aware(Pool::Free, 0, 0, &runtime),
            Some(Vbn::new(2))
        );
        assert_eq!(
            state.pick_wear_aware(Pool::Free, 0, 0, &runtime),
            Some(Vbn::new(1))
        );
        assert_eq!(
            state.pick_wear_aware(Pool::Free, 0, 0, &runtime),
            Some(Vbn::new(0))
        );
        assert_eq!(state.pick_wear_aware(Pool::Free, 0, 0, &runtime), None);
    }

    #[test]
    fn wear_aware_pick_skips_bbt_bad_backings() {
        let geometry = Geometry::new(1, 1, 4, 4);
        let runtime = NandRuntime::new(geometry);
        let mut state = PlaneState::new(4);
        state.free_vbns.extend([Vbn::new(0), Vbn::new(1)]);

        runtime.set_bad(BlockAddr::new(0, 0, Pbn::new(0)));
        assert_eq!(
            state.pick_wear_aware(Pool::Free, 0, 0, &runtime),
            Some(Vbn::new(1))
        );
        // The bad entry is left in place, not silently dropped.
        assert_eq!(state.free_vbns.len(), 1);
        assert_eq!(state.pick_wear_aware(Pool::Free, 0, 0, &runtime), None);
    }
}
