use ftl_geometry::Lba;
use ftl_nand::NandStatus;
use thiserror::Error;

/// Errors surfaced by the translation layer.
///
/// Failures are reported to the direct caller; the only built-in retries are
/// the single post-replacement program retry and the one garbage-collection
/// pass before an allocation gives up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum FtlError {
    /// The logical address lies outside the exposed range.
    #[error("logical address {0} is out of range")]
    BadLba(Lba),
    /// Read of a logical address with no valid mapping.
    #[error("logical address {0} is not mapped")]
    Unmapped(Lba),
    /// Allocation failed even after garbage collection.
    #[error("no free pages left after garbage collection")]
    NoSpace,
    /// Two consecutive programs failed; the write is lost.
    #[error("program failed after bad-block replacement")]
    ProgramFailed,
    /// Garbage collection found no reclaimable block.
    #[error("no garbage-collection victim available")]
    NoVictim,
    /// The driver reported a non-success status for a mapped read.
    #[error("read failed with status {0:?}")]
    ReadFailed(NandStatus),
}
