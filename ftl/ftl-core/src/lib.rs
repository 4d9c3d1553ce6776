//! # Flash Translation Layer
//!
//! The host-facing core: a linear logical block address space mapped onto
//! the physical NAND array, honouring erase-before-program, block-granular
//! erase and bad-block substitution.
//!
//! ## What you get
//! - [`Ftl`] with `write`/`read` entry points over [`Lba`](ftl_geometry::Lba)s.
//! - The logical↔physical page tables (L2P/P2L) and per-page [`PageState`]
//!   tracking, kept in lock-step: a mapped logical address always points at
//!   a `VALID` page whose reverse entry points back.
//! - Program-failure recovery: a failed program condemns the whole block,
//!   invalidates its pages, substitutes a spare backing and retries the
//!   write exactly once on a fresh page.
//! - A greedy min-valid garbage collector that relocates live pages through
//!   the same failure-handled program path and reclaims one block per pass.
//!
//! ## Ordering
//!
//! Within one `write` the old mapping is invalidated before the new page is
//! allocated and programmed, and the tables are committed only after the
//! program succeeded. A failed write therefore leaves the address unmapped,
//! never pointing at stale data.
//!
//! ## Concurrency
//!
//! Entry points take `&mut self`: one request runs to completion before the
//! next. The driver underneath is independently thread-safe.

mod error;
mod ftl;
mod gc;
mod stats;

pub use crate::error::FtlError;
pub use crate::ftl::{Ftl, FtlConfig, PageState};
pub use crate::stats::FtlStats;
