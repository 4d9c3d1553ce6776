//! # Wear-Aware Block Allocator
//!
//! Per-plane block management for the translation layer: free and reserved
//! pools, the write cursor, and virtual-to-physical block substitution for
//! factory and grown bad blocks.
//!
//! ## Block identities
//!
//! Within a (die, plane) every block has a stable **virtual** number
//! ([`Vbn`](ftl_geometry::Vbn)) and a current **physical** backing
//! ([`Pbn`](ftl_geometry::Pbn)). They start out identical; a bad block causes
//! the virtual number to be remapped onto a block drawn from the spare pool.
//! The dense remap table is paired with a reverse table so a grown-bad event
//! resolves its victim without scanning.
//!
//! ## Pools
//!
//! Each plane partitions its block range into `[normal | reserved-write |
//! reserved-spare]` from the tail. The first two hold VBNs handed to the
//! write path (reserved-write only under pressure); the spare pool holds raw
//! PBNs used exclusively for bad-block substitution. When the spare pool
//! runs dry the allocator promotes the least-worn free block's backing into
//! it, so the spare reserve is soft rather than a strict partition.
//!
//! ## Selection policy
//!
//! Opening a block always takes the pool entry whose backing has the lowest
//! erase count, skipping entries whose backing is flagged in the bad block
//! table.

mod allocator;
mod plane;

pub use crate::allocator::{BlockAllocator, BlockKey, PlaneSnapshot};
pub use crate::plane::Cursor;
