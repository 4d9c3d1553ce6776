use crate::{BlockAddr, PageAddr, Pba, Pbn};

/// Shape of the physical NAND array. Immutable after construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Geometry {
    pub dies: u32,
    pub planes_per_die: u32,
    pub blocks_per_plane: u32,
    pub pages_per_block: u32,
}

impl Geometry {
    #[must_use]
    pub const fn new(
        dies: u32,
        planes_per_die: u32,
        blocks_per_plane: u32,
        pages_per_block: u32,
    ) -> Self {
        Self {
            dies,
            planes_per_die,
            blocks_per_plane,
            pages_per_block,
        }
    }

    #[inline]
    #[must_use]
    pub const fn pages_per_plane(&self) -> u32 {
        self.pages_per_block * self.blocks_per_plane
    }

    #[inline]
    #[must_use]
    pub const fn pages_per_die(&self) -> u32 {
        self.pages_per_plane() * self.planes_per_die
    }

    #[inline]
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.pages_per_die() * self.dies
    }

    #[inline]
    #[must_use]
    pub const fn total_blocks(&self) -> u32 {
        self.blocks_per_plane * self.planes_per_die * self.dies
    }

    #[inline]
    #[must_use]
    pub const fn contains_block(&self, addr: BlockAddr) -> bool {
        addr.die < self.dies
            && addr.plane < self.planes_per_die
            && addr.block.as_u32() < self.blocks_per_plane
    }

    #[inline]
    #[must_use]
    pub const fn contains_page(&self, addr: PageAddr) -> bool {
        self.contains_block(addr.block) && addr.page < self.pages_per_block
    }

    /// Flat per-block index `((d·P)+p)·B + b`, e.g. for erase-count tables.
    #[inline]
    #[must_use]
    pub const fn block_index(&self, addr: BlockAddr) -> usize {
        (((addr.die * self.planes_per_die) + addr.plane) * self.blocks_per_plane
            + addr.block.as_u32()) as usize
    }

    /// Encode a physical page location into its scalar address.
    #[inline]
    #[must_use]
    pub const fn pba(&self, addr: PageAddr) -> Pba {
        let b = addr.block;
        Pba::new(
            b.die * self.pages_per_die()
                + b.plane * self.pages_per_plane()
                + b.block.as_u32() * self.pages_per_block
                + addr.page,
        )
    }

    /// Decode a scalar page address back into its location.
    ///
    /// Exact inverse of [`Self::pba`] for every in-range address.
    #[inline]
    #[must_use]
    pub const fn page_addr(&self, pba: Pba) -> PageAddr {
        let v = pba.as_u32();
        let die = v / self.pages_per_die();
        let plane = (v % self.pages_per_die()) / self.pages_per_plane();
        let block = (v % self.pages_per_plane()) / self.pages_per_block;
        let page = v % self.pages_per_block;
        PageAddr {
            block: BlockAddr::new(die, plane, Pbn::new(block)),
            page,
        }
    }

    /// All (die, plane) pairs in lexicographic order, which is the fixed
    /// allocation scan order of the write path.
    pub fn planes(&self) -> impl Iterator<Item = (u32, u32)> + use<> {
        let planes = self.planes_per_die;
        (0..self.dies).flat_map(move |d| (0..planes).map(move |p| (d, p)))
    }

    /// All physical blocks in (die, plane, block) order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockAddr> + use<> {
        let blocks = self.blocks_per_plane;
        self.planes().flat_map(move |(d, p)| {
            (0..blocks).map(move |b| BlockAddr::new(d, p, Pbn::new(b)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pba_round_trips_over_whole_array() {
        let geo = Geometry::new(2, 2, 4, 8);
        for raw in 0..geo.total_pages() {
            let pba = Pba::new(raw);
            let addr = geo.page_addr(pba);
            assert!(geo.contains_page(addr));
            assert_eq!(geo.pba(addr), pba);
        }
    }

    #[test]
    fn scalar_encoding_is_lexicographic() {
        let geo = Geometry::new(1, 1, 8, 8);
        assert_eq!(
            geo.pba(BlockAddr::new(0, 0, Pbn::new(0)).page(0)),
            Pba::new(0)
        );
        assert_eq!(
            geo.pba(BlockAddr::new(0, 0, Pbn::new(3)).page(5)),
            Pba::new(3 * 8 + 5)
        );
        let geo = Geometry::new(2, 2, 4, 8);
        assert_eq!(
            geo.pba(BlockAddr::new(1, 1, Pbn::new(3)).page(7)),
            Pba::new(geo.total_pages() - 1)
        );
    }

    #[test]
    fn plane_scan_order_is_fixed() {
        let geo = Geometry::new(2, 3, 1, 1);
        let order: Vec<_> = geo.planes().collect();
        assert_eq!(
            order,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn block_index_is_dense() {
        let geo = Geometry::new(2, 2, 4, 8);
        let mut seen = vec![false; geo.total_blocks() as usize];
        for addr in geo.blocks() {
            let idx = geo.block_index(addr);
            assert!(!seen[idx]);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
