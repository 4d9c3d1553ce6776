//! # NAND Address Space
//!
//! Typed addressing for a NAND flash array of `dies × planes × blocks × pages`.
//!
//! ## What you get
//! - Tiny [`Lba`]/[`Pba`] newtypes (u32) to avoid mixing logical and physical page indices.
//! - [`Vbn`]/[`Pbn`] newtypes distinguishing the stable virtual block identity from its
//!   current physical backing within a (die, plane).
//! - [`BlockAddr`]/[`PageAddr`] for fully decomposed physical locations.
//! - A [`Geometry`] describing the array shape, with lossless scalar encoding.
//!
//! ## Scalar Physical Block Address
//!
//! A [`Pba`] is the flattened page index
//!
//! ```text
//! PBA = d·P·B·G + p·B·G + b·G + g
//! ```
//!
//! where `P`, `B`, `G` are planes per die, blocks per plane and pages per block.
//! [`Geometry::pba`] and [`Geometry::page_addr`] are exact inverses for every
//! in-range address.

mod addresses;
mod geometry;

pub use crate::addresses::{BlockAddr, Lba, PageAddr, Pba, Pbn, Vbn};
pub use crate::geometry::Geometry;
