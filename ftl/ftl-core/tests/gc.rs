mod common;

use common::{GEO, boot, check_invariants, config, payload};
use ftl_core::{FtlError, PageState};
use ftl_geometry::{Geometry, Lba, Pba};

#[test]
fn overwrite_pressure_reclaims_blocks_and_keeps_data() {
    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);

    let mut expected: Vec<Vec<u8>> = (0..40).map(common::payload).collect();
    for i in 0..40 {
        ftl.write(Lba::new(i), &expected[i as usize]).unwrap();
    }
    // Overwriting half the space exhausts the pools and forces collection.
    for i in 0..20 {
        let fresh = format!("N{i}").into_bytes();
        ftl.write(Lba::new(i), &fresh).unwrap();
        expected[i as usize] = fresh;
    }

    assert!(driver.stats().erases >= 1, "collection must have run");
    for i in 0..40 {
        assert_eq!(ftl.read(Lba::new(i)).unwrap(), expected[i as usize]);
    }
    assert_eq!(ftl.stats().valid_pages, 40);
    check_invariants(&ftl, &driver);
}

#[test]
fn collector_picks_the_emptiest_block() {
    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);

    // Fill five blocks, then hollow out block 1 completely: its pages all
    // migrate into the write reserve.
    for i in 0..40 {
        ftl.write(Lba::new(i), &payload(i)).unwrap();
    }
    for i in 8..16 {
        ftl.write(Lba::new(i), b"moved").unwrap();
    }

    let erases_before = driver.stats().erases;
    ftl.run_gc().unwrap();
    assert_eq!(driver.stats().erases, erases_before + 1);

    // Block 1, the only fully invalid block, is empty again.
    for g in 0..8 {
        assert_eq!(ftl.page_state(Pba::new(8 + g)), PageState::Empty);
    }
    for i in 0..40 {
        assert!(ftl.read(Lba::new(i)).is_ok());
    }
    check_invariants(&ftl, &driver);
}

#[test]
fn collection_without_candidates_reports_no_victim() {
    // A single block, necessarily open: nothing is eligible.
    let geometry = Geometry::new(1, 1, 1, 4);
    let (mut ftl, _driver) = boot(geometry, config(0, 0, 2), &[]);
    assert_eq!(ftl.run_gc(), Err(FtlError::NoVictim));
}

#[test]
fn device_filled_to_capacity_reports_no_space() {
    // No spare reservation and one retired block: 56 usable pages for 56
    // addresses. The device fills exactly, then chokes on the next write.
    let (mut ftl, driver) = boot(GEO, config(1, 0, 56), &[(0, 0, 0)]);

    for i in 0..56 {
        ftl.write(Lba::new(i), &payload(i)).unwrap();
    }
    assert_eq!(ftl.stats().valid_pages, 56);

    // Every block is packed with live data; collection cannot relocate.
    assert_eq!(ftl.write(Lba::new(0), b"over"), Err(FtlError::NoSpace));
    // The failed overwrite already surrendered its old page.
    assert_eq!(ftl.read(Lba::new(0)), Err(FtlError::Unmapped(Lba::new(0))));
    for i in 1..56 {
        assert_eq!(ftl.read(Lba::new(i)).unwrap(), payload(i));
    }
    check_invariants(&ftl, &driver);
}

#[test]
fn hammering_one_address_spreads_wear_evenly() {
    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);

    for round in 0..1000 {
        let data = format!("R{round}").into_bytes();
        ftl.write(Lba::new(7), &data).unwrap();
    }
    assert_eq!(ftl.read(Lba::new(7)).unwrap(), b"R999");
    assert_eq!(ftl.stats().valid_pages, 1);

    // Idle spare blocks stay at zero, so bound the spread against the
    // average instead of demanding perfect balance.
    let total: u64 = GEO
        .blocks()
        .map(|addr| u64::from(driver.runtime().erase_count(addr)))
        .sum();
    let average = (total / u64::from(GEO.total_blocks())).max(1);
    let stats = ftl.stats();
    let spread = u64::from(stats.erase_gap());
    assert!(
        spread <= 4 * average,
        "wear-aware selection should keep the spread bounded, got {spread} \
         against an average of {average}"
    );
    check_invariants(&ftl, &driver);
}
