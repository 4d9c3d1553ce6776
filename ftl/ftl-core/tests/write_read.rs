mod common;

use common::{GEO, boot, check_invariants, config, payload};
use ftl_core::{FtlError, PageState};
use ftl_geometry::{Lba, Pba};

#[test]
fn first_write_lands_on_the_first_page() {
    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);

    ftl.write(Lba::new(0), b"D0").unwrap();
    assert_eq!(ftl.read(Lba::new(0)).unwrap(), b"D0");

    // Exactly one page went valid, and the plane scan put it at the origin.
    assert_eq!(ftl.stats().valid_pages, 1);
    assert_eq!(ftl.mapping(Lba::new(0)), Some(Pba::new(0)));
    check_invariants(&ftl, &driver);
}

#[test]
fn write_then_read_round_trips_every_lba() {
    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);
    for i in 0..40 {
        ftl.write(Lba::new(i), &payload(i)).unwrap();
    }
    for i in 0..40 {
        assert_eq!(ftl.read(Lba::new(i)).unwrap(), payload(i));
    }
    assert_eq!(ftl.stats().valid_pages, 40);
    check_invariants(&ftl, &driver);
}

#[test]
fn overwrite_retires_the_old_page() {
    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);

    ftl.write(Lba::new(5), b"old").unwrap();
    let first = ftl.mapping(Lba::new(5)).unwrap();
    ftl.write(Lba::new(5), b"new").unwrap();

    assert_eq!(ftl.read(Lba::new(5)).unwrap(), b"new");
    assert_eq!(ftl.page_state(first), PageState::Invalid);

    // Exactly one physical page claims the address.
    let claimants = (0..GEO.total_pages())
        .filter(|&raw| ftl.reverse_mapping(Pba::new(raw)) == Some(Lba::new(5)))
        .count();
    assert_eq!(claimants, 1);
    check_invariants(&ftl, &driver);
}

#[test]
fn out_of_range_addresses_are_rejected() {
    let (mut ftl, _driver) = boot(GEO, config(1, 2, 40), &[]);

    assert_eq!(
        ftl.write(Lba::new(40), b"x"),
        Err(FtlError::BadLba(Lba::new(40)))
    );
    assert_eq!(
        ftl.write(Lba::new(u32::MAX), b"x"),
        Err(FtlError::BadLba(Lba::new(u32::MAX)))
    );
    assert_eq!(ftl.read(Lba::new(40)), Err(FtlError::BadLba(Lba::new(40))));
}

#[test]
fn reading_an_unwritten_address_reports_unmapped() {
    let (ftl, _driver) = boot(GEO, config(1, 2, 40), &[]);
    assert_eq!(ftl.read(Lba::new(7)), Err(FtlError::Unmapped(Lba::new(7))));
}

#[test]
fn program_sequence_numbers_are_strictly_increasing_in_oob() {
    use ftl_nand::NandOp;

    let (mut ftl, driver) = boot(GEO, config(1, 2, 40), &[]);
    for i in 0..16 {
        ftl.write(Lba::new(i), &payload(i)).unwrap();
    }

    let mut last_seq = 0;
    for i in 0..16 {
        let pba = ftl.mapping(Lba::new(i)).unwrap();
        let mut op = NandOp::read_page(GEO.page_addr(pba));
        assert!(driver.submit(&mut op).is_success());
        assert_eq!(op.oob_lba[0], Some(Lba::new(i)));
        assert!(op.oob_seq[0] > last_seq, "sequence numbers must grow");
        last_seq = op.oob_seq[0];
    }
}
