//! Exercises the translation stack on a tiny array: boot with a factory-bad
//! block, stream sequential writes, grow a bad block mid-stream, then hammer
//! the device until the collector cycles and verify every address.

use ftl_core::{Ftl, FtlConfig};
use ftl_geometry::{BlockAddr, Geometry, Lba, Pbn};
use ftl_nand::{NandDriver, NandModel, NandRuntime};
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::sync::Arc;

fn main() {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger init");

    let geometry = Geometry::new(1, 1, 8, 8);
    let reserved_write = 1;
    let reserved_spare = 2;
    let reserved_blocks = (reserved_write + reserved_spare) * geometry.planes_per_die * geometry.dies;
    let total_lbas = geometry.total_pages() - geometry.pages_per_block * reserved_blocks;
    info!("array {geometry:?}, exposing {total_lbas} logical addresses");

    let runtime = Arc::new(NandRuntime::new(geometry));
    let driver = Arc::new(NandDriver::new(NandModel::new(geometry), runtime));
    driver.inject_factory_bad(BlockAddr::new(0, 0, Pbn::new(1)));

    let mut ftl = Ftl::new(
        Arc::clone(&driver),
        FtlConfig {
            reserved_write_per_plane: reserved_write,
            reserved_spare_per_plane: reserved_spare,
            total_lbas,
        },
    );

    for i in 0..16 {
        write(&mut ftl, i, total_lbas);
    }
    report("warm-up", &ftl, &driver);

    // A block starts failing in the field.
    driver.inject_runtime_fail(BlockAddr::new(0, 0, Pbn::new(3)));
    for i in 16..total_lbas {
        write(&mut ftl, i, total_lbas);
    }
    report("after grown bad block", &ftl, &driver);

    // Sustained overwrites force the collector to cycle blocks.
    for i in total_lbas..total_lbas * 100 {
        write(&mut ftl, i, total_lbas);
    }
    report("after overwrite pressure", &ftl, &driver);

    let mut mismatches = 0;
    for l in 0..total_lbas {
        let expected = format!("D{}", 99 * total_lbas + l).into_bytes();
        match ftl.read(Lba::new(l)) {
            Ok(data) if data == expected => {}
            Ok(_) => {
                error!("lba {l}: stale data");
                mismatches += 1;
            }
            Err(err) => {
                error!("lba {l}: {err}");
                mismatches += 1;
            }
        }
    }
    if mismatches == 0 {
        info!("verification passed: all {total_lbas} addresses hold their last write");
    } else {
        error!("verification failed for {mismatches} addresses");
    }
}

fn write(ftl: &mut Ftl, i: u32, total_lbas: u32) {
    let lba = Lba::new(i % total_lbas);
    let data = format!("D{i}").into_bytes();
    if let Err(err) = ftl.write(lba, &data) {
        error!("write {lba}: {err}");
    }
}

fn report(label: &str, ftl: &Ftl, driver: &NandDriver) {
    let stats = ftl.stats();
    info!(
        "[{label}] pages: valid={} invalid={} empty={} | bad blocks={} | erase {}..{}",
        stats.valid_pages,
        stats.invalid_pages,
        stats.empty_pages,
        stats.bad_blocks,
        stats.min_erase_count,
        stats.max_erase_count,
    );
    let nand = driver.stats();
    info!(
        "[{label}] nand: reads={} programs={} erases={} failures={} bad detected={}",
        nand.reads, nand.programs, nand.erases, nand.failures, nand.bad_blocks_detected,
    );
    for (die, plane) in ftl.geometry().planes() {
        if let Some(snap) = ftl.allocator().plane_snapshot(die, plane) {
            info!(
                "[{label}] d{die}/p{plane}: cursor={:?} free={} reserved_write={} spares={}",
                snap.cursor,
                snap.free_vbns.len(),
                snap.reserved_write_vbns.len(),
                snap.reserved_spare_pbns.len(),
            );
        }
    }
}
