use crate::ftl::{Ftl, PageState};

/// Aggregate page and wear counters, e.g. for periodic reporting.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FtlStats {
    pub valid_pages: usize,
    pub invalid_pages: usize,
    pub empty_pages: usize,
    pub bad_blocks: usize,
    /// Lowest erase count over blocks not flagged bad; 0 when none exist.
    pub min_erase_count: u32,
    /// Highest erase count over blocks not flagged bad; 0 when none exist.
    pub max_erase_count: u32,
}

impl FtlStats {
    /// Wear spread over the non-bad blocks.
    #[must_use]
    pub const fn erase_gap(&self) -> u32 {
        self.max_erase_count - self.min_erase_count
    }
}

impl Ftl {
    #[must_use]
    pub fn stats(&self) -> FtlStats {
        let mut stats = FtlStats::default();
        for state in &self.pstate {
            match state {
                PageState::Valid => stats.valid_pages += 1,
                PageState::Invalid => stats.invalid_pages += 1,
                PageState::Empty => stats.empty_pages += 1,
            }
        }
        let mut min = u32::MAX;
        let mut max = 0;
        let mut any = false;
        for addr in self.geometry.blocks() {
            if self.runtime.is_bad(addr) {
                stats.bad_blocks += 1;
                continue;
            }
            any = true;
            let ec = self.runtime.erase_count(addr);
            min = min.min(ec);
            max = max.max(ec);
        }
        if any {
            stats.min_erase_count = min;
            stats.max_erase_count = max;
        }
        stats
    }
}
