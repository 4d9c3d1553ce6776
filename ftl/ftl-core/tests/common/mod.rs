#![allow(dead_code)]

use ftl_core::{Ftl, FtlConfig, PageState};
use ftl_geometry::{BlockAddr, Geometry, Lba, Pba};
use ftl_nand::{NandDriver, NandModel, NandRuntime};
use std::sync::Arc;

/// The well-worn bring-up shape: one die, one plane, 8 blocks of 8 pages.
pub const GEO: Geometry = Geometry::new(1, 1, 8, 8);

pub fn config(reserved_write: u32, reserved_spare: u32, total_lbas: u32) -> FtlConfig {
    FtlConfig {
        reserved_write_per_plane: reserved_write,
        reserved_spare_per_plane: reserved_spare,
        total_lbas,
    }
}

/// Driver over a fresh array; bad blocks are injected before the FTL boots.
pub fn driver(geometry: Geometry, factory_bad: &[(u32, u32, u32)]) -> Arc<NandDriver> {
    let runtime = Arc::new(NandRuntime::new(geometry));
    let driver = Arc::new(NandDriver::new(NandModel::new(geometry), runtime));
    for &(d, p, b) in factory_bad {
        driver.inject_factory_bad(BlockAddr::new(d, p, ftl_geometry::Pbn::new(b)));
    }
    driver
}

pub fn boot(geometry: Geometry, cfg: FtlConfig, factory_bad: &[(u32, u32, u32)]) -> (Ftl, Arc<NandDriver>) {
    let driver = self::driver(geometry, factory_bad);
    let ftl = Ftl::new(Arc::clone(&driver), cfg);
    (ftl, driver)
}

pub fn payload(i: u32) -> Vec<u8> {
    format!("D{i}").into_bytes()
}

/// Cross-table consistency that must hold in every reachable state.
pub fn check_invariants(ftl: &Ftl, driver: &NandDriver) {
    let geometry = ftl.geometry();
    let runtime = driver.runtime();

    // A mapped logical address points at a valid page that points back.
    for slot in 0..ftl.total_lbas() {
        let lba = Lba::new(slot as u32);
        if let Some(pba) = ftl.mapping(lba) {
            assert_eq!(
                ftl.page_state(pba),
                PageState::Valid,
                "{lba:?} maps to non-valid {pba:?}"
            );
            assert_eq!(
                ftl.reverse_mapping(pba),
                Some(lba),
                "reverse entry of {pba:?} does not return to {lba:?}"
            );
        }
    }

    // Every valid page is claimed by exactly the address it stores, and
    // never lives in a block flagged bad.
    for raw in 0..geometry.total_pages() {
        let pba = Pba::new(raw);
        if ftl.page_state(pba) == PageState::Valid {
            let lba = ftl
                .reverse_mapping(pba)
                .unwrap_or_else(|| panic!("valid {pba:?} has no reverse entry"));
            assert_eq!(ftl.mapping(lba), Some(pba));
            let block = geometry.page_addr(pba).block;
            assert!(!runtime.is_bad(block), "valid page in bad block {block:?}");
        }
    }

    // Pools are disjoint and the remap tables agree for every pooled or
    // open VBN.
    for (die, plane) in geometry.planes() {
        let alloc = ftl.allocator();
        let snap = alloc.plane_snapshot(die, plane).unwrap();
        let mut live = snap.free_vbns.clone();
        live.extend(&snap.reserved_write_vbns);
        live.extend(snap.cursor.open_vbn());

        for (i, a) in snap.free_vbns.iter().enumerate() {
            assert!(
                !snap.free_vbns[i + 1..].contains(a),
                "duplicate {a:?} in free pool"
            );
            assert!(
                !snap.reserved_write_vbns.contains(a),
                "{a:?} in two pools at once"
            );
        }

        for vbn in live {
            let backing = alloc.resolve_pbn(die, plane, vbn);
            assert_eq!(
                alloc.reverse_vbn(die, plane, backing),
                Some(vbn),
                "reverse of {backing:?} does not return {vbn:?}"
            );
        }
    }
}
