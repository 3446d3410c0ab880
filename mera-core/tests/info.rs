mod common;

use common::*;
use mera_core::units::constants::MYR;
use mera_core::units::{ScaleLayout, ScaleSet};
use mera_core::{Component, InfoRecord, LoadOptions, MeraError, check_outputs, getclumps, gethydro};

#[test]
fn resolves_metadata_and_components() {
    let snap = Snapshot::write();
    let info = snap.info();

    assert_eq!(info.output, OUTPUT);
    assert_eq!(info.ncpu as usize, NCPU);
    assert_eq!((info.levelmin, info.levelmax), (1, 3));
    assert_eq!(info.boxlen, 1.0);
    assert_eq!(info.nstep_coarse, 42);
    assert_eq!(info.ordering, "hilbert");
    assert_eq!(info.gamma, GAMMA);
    assert_eq!(info.time, TIME);

    for c in [
        Component::Amr,
        Component::Hydro,
        Component::Gravity,
        Component::Particles,
        Component::Clumps,
    ] {
        assert!(info.has(c), "{c} should be present");
    }
    assert!(!info.has(Component::Rt));
    assert!(!info.has(Component::Sinks));

    assert_eq!(info.hydro_vars, ["rho", "vx", "vy", "vz", "p"]);
    assert_eq!(info.hydro_descriptor_version, Some(1));
    assert_eq!(info.gravity_vars, ["epot", "ax", "ay", "az"]);
    assert_eq!(
        info.particle_symbols(),
        ["x", "y", "z", "vx", "vy", "vz", "mass", "id", "level", "family", "tag", "birth"]
    );
    assert!(info.clump_vars.iter().any(|v| v == "mass_cl"));
}

#[test]
fn time_converts_through_the_scale_table() {
    let snap = Snapshot::write();
    let info = snap.info();
    let myr = info.time * info.scale.resolve("Myr").unwrap();
    assert!(close(myr, TIME * UNIT_T / MYR, 1e-12));
    assert_eq!(info.scale.resolve("").unwrap(), 1.0);
    assert_eq!(info.scale.resolve("standard").unwrap(), 1.0);
    assert!(close(info.scale.resolve("g_cm3").unwrap(), UNIT_D, 1e-12));
}

#[test]
fn unknown_unit_is_key_not_found() {
    let snap = Snapshot::write();
    let err = snap.info().scale.resolve("furlong").unwrap_err();
    assert!(matches!(err, MeraError::KeyNotFound { .. }), "{err}");
}

#[test]
fn scale_record_survives_a_layout_round_trip() {
    let snap = Snapshot::write();
    let info = snap.info();
    let rec = info.scale.to_record(ScaleLayout::Current);
    let back = ScaleSet::from_record(&rec).unwrap();
    assert_eq!(back.resolve("kpc").unwrap(), info.scale.resolve("kpc").unwrap());
    let legacy = rec.convert(ScaleLayout::Legacy).unwrap();
    assert_eq!(legacy.get("Msol"), rec.get("Msol"));
    assert_eq!(legacy.get("Msun"), None);
}

#[test]
fn missing_snapshot_is_missing_data() {
    let snap = Snapshot::write();
    let err = InfoRecord::resolve(snap.base(), 7).unwrap_err();
    assert!(matches!(err, MeraError::MissingData(_)), "{err}");
}

#[test]
fn missing_info_file_is_missing_data() {
    let snap = Snapshot::write();
    std::fs::remove_file(snap.file("info_00001.txt")).unwrap();
    let err = InfoRecord::resolve(snap.base(), OUTPUT).unwrap_err();
    assert!(matches!(err, MeraError::MissingData(_)), "{err}");
}

#[test]
fn outputs_report_lists_incomplete_snapshots() {
    let snap = Snapshot::write();
    std::fs::create_dir(snap.base().join("output_00004")).unwrap();
    std::fs::create_dir(snap.base().join("not_an_output")).unwrap();

    let report = check_outputs(snap.base()).unwrap();
    assert_eq!(report.outputs, [1, 4]);
    assert_eq!(report.missing_info, [4]);
    assert_eq!(report.complete().collect::<Vec<_>>(), [1]);
}

#[test]
fn snapshot_without_clump_finder() {
    let snap = Snapshot::without_clumps();
    let info = snap.info();
    assert!(!info.has(Component::Clumps));
    assert!(!info.has(Component::Rt));
    assert!(!info.has(Component::Sinks));
    assert!(info.has(Component::Hydro) && info.has(Component::Particles) && info.has(Component::Gravity));
    assert!(info.clump_vars.is_empty());

    let err = getclumps(&info, &LoadOptions::new()).unwrap_err();
    assert!(matches!(err, MeraError::MissingData(_)), "{err}");
    assert_eq!(gethydro(&info, &LoadOptions::new()).unwrap().len(), cells(1, 3).len());
}
