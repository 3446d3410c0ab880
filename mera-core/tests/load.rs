mod common;

use common::*;
use mera_core::{
    DatasetKind, Family, LoadOptions, MeraError, SpatialRange, getclumps, getgravity, gethydro,
    getparticles, load,
};

#[test]
fn hydro_returns_leaf_cells_across_domains() {
    let snap = Snapshot::write();
    let ds = gethydro(&snap.info(), &LoadOptions::new()).unwrap();
    let expected = cells(1, 3);

    assert_eq!(ds.kind(), DatasetKind::Hydro);
    assert_eq!(ds.len(), expected.len());
    assert_eq!(ds.len(), 22);
    assert_eq!(ds.variables(), ["rho", "vx", "vy", "vz", "p"]);
    assert_eq!((ds.lmin(), ds.lmax()), (1, 3));

    let levels = ds.table().i64s("level").unwrap();
    for l in 1..=3 {
        let want = expected.iter().filter(|c| c.level == l).count();
        assert_eq!(levels.iter().filter(|&&x| x == l as i64).count(), want, "level {l}");
    }

    // shard order: every domain-1 row precedes every domain-2 row
    let cpu = ds.table().i64s("cpu").unwrap();
    assert!(cpu.windows(2).all(|w| w[0] <= w[1]));
    let owned_by_2 = expected.iter().filter(|c| c.owner == 2).count();
    assert_eq!(cpu.iter().filter(|&&c| c == 2).count(), owned_by_2);

    let volume: f64 = ds.getvar("volume", "").unwrap().iter().sum();
    assert!(close(volume, 1.0, 1e-12));
}

#[test]
fn stored_values_match_cell_positions() {
    let snap = Snapshot::write();
    let ds = gethydro(&snap.info(), &LoadOptions::new()).unwrap();
    let [x, y, z] = ds.positions().unwrap();
    let rho = ds.getvar("rho", "").unwrap();
    let p = ds.getvar("p", "").unwrap();
    for i in 0..ds.len() {
        assert!(close(rho[i], density([x[i], y[i], z[i]]), 1e-12), "row {i}");
        assert!(close(p[i], 0.1 * rho[i], 1e-12));
    }
    assert!(ds.getvar("vy", "").unwrap().iter().all(|&v| v == GAS_VELOCITY[1]));
}

#[test]
fn lmax_caps_the_hierarchy_and_conserves_volume() {
    let snap = Snapshot::write();
    let info = snap.info();
    let mut previous = 0;
    for lmax in 1..=3u8 {
        let ds = gethydro(&info, &LoadOptions::new().lmax(lmax)).unwrap();
        assert_eq!(ds.len(), cells(1, lmax as usize).len(), "lmax {lmax}");
        assert!(ds.len() > previous);
        previous = ds.len();

        let levels = ds.table().i64s("level").unwrap();
        assert!(levels.iter().all(|&l| l <= lmax as i64));
        let volume: f64 = ds.getvar("volume", "").unwrap().iter().sum();
        assert!(close(volume, 1.0, 1e-12), "lmax {lmax}");
    }
}

#[test]
fn lmin_drops_coarse_cells() {
    let snap = Snapshot::write();
    let ds = gethydro(&snap.info(), &LoadOptions::new().lmin(2)).unwrap();
    assert_eq!(ds.len(), cells(2, 3).len());
    assert!(ds.table().i64s("level").unwrap().iter().all(|&l| l >= 2));
}

#[test]
fn thread_count_does_not_change_the_table() {
    let snap = Snapshot::write();
    let info = snap.info();
    for kind in [DatasetKind::Hydro, DatasetKind::Particles] {
        let one = load(&info, kind, &LoadOptions::new().threads(1)).unwrap();
        let four = load(&info, kind, &LoadOptions::new().threads(4)).unwrap();
        let pool = load(&info, kind, &LoadOptions::new()).unwrap();
        assert_eq!(one.table(), four.table(), "{kind}");
        assert_eq!(one.table(), pool.table(), "{kind}");
    }
}

#[test]
fn spatial_range_is_applied_to_cell_centres() {
    let snap = Snapshot::write();
    let range = SpatialRange {
        x: Some([0.0, 0.5]),
        ..Default::default()
    };
    let ds = gethydro(&snap.info(), &LoadOptions::new().range(range)).unwrap();
    let want = cells(1, 3).iter().filter(|c| c.center[0] <= 0.5).count();
    assert_eq!(ds.len(), want);
    assert_eq!(ds.len(), 18);
    assert!(ds.positions().unwrap()[0].iter().all(|&x| x <= 0.5));
    assert_eq!(ds.bounds().hi[0], 0.5);
}

#[test]
fn variable_subset_and_unknown_variables() {
    let snap = Snapshot::write();
    let info = snap.info();
    let ds = gethydro(&info, &LoadOptions::new().vars(["p", "rho"])).unwrap();
    assert_eq!(ds.variables(), ["rho", "p"]);
    assert!(!ds.table().has("vx"));

    let err = gethydro(&info, &LoadOptions::new().vars(["rho", "metals"])).unwrap_err();
    assert!(matches!(err, MeraError::KeyNotFound { .. }), "{err}");
}

#[test]
fn bad_arguments_are_usage_errors() {
    let snap = Snapshot::write();
    let info = snap.info();
    let cases = [
        LoadOptions::new().lmin(3).lmax(2),
        LoadOptions::new().lmax(9),
        LoadOptions::new().threads(0),
        LoadOptions::new().families([1]),
    ];
    for opts in cases {
        let err = gethydro(&info, &opts).unwrap_err();
        assert!(matches!(err, MeraError::Usage(_)), "{opts:?}: {err}");
    }
    let inverted = SpatialRange {
        y: Some([0.8, 0.2]),
        ..Default::default()
    };
    assert!(matches!(
        gethydro(&info, &LoadOptions::new().range(inverted)),
        Err(MeraError::Usage(_))
    ));
}

#[test]
fn gravity_uses_the_hydro_cells() {
    let snap = Snapshot::write();
    let info = snap.info();
    let hydro = gethydro(&info, &LoadOptions::new()).unwrap();
    let grav = getgravity(&info, &LoadOptions::new()).unwrap();
    assert_eq!(grav.variables(), ["epot", "ax", "ay", "az"]);
    assert_eq!(grav.len(), hydro.len());
    assert_eq!(grav.positions().unwrap(), hydro.positions().unwrap());

    let epot = grav.getvar("epot", "").unwrap();
    let rho = hydro.getvar("rho", "").unwrap();
    assert!(epot.iter().zip(&rho).all(|(e, r)| close(*e, -r, 1e-12)));

    let x = grav.getvar("x", "").unwrap();
    let a = grav.getvar("a_magnitude", "").unwrap();
    for i in 0..grav.len() {
        assert!(close(a[i], (x[i] * x[i] + 1.0).sqrt(), 1e-12));
    }
}

#[test]
fn particles_carry_bookkeeping_and_requested_fields() {
    let snap = Snapshot::write();
    let info = snap.info();
    let ds = getparticles(&info, &LoadOptions::new().vars(["mass", "id"])).unwrap();
    let names: Vec<&str> = ds.table().names().iter().map(String::as_str).collect();
    assert_eq!(names, ["x", "y", "z", "level", "family", "cpu", "mass", "id"]);
    assert_eq!(ds.len(), all_particles().len());

    let ids = ds.table().i64s("id").unwrap();
    let want: Vec<i64> = all_particles().iter().map(|p| p.id as i64).collect();
    assert_eq!(ids, want.as_slice());
    assert_eq!(ds.table().i64s("cpu").unwrap(), [1, 1, 1, 2, 2]);
    assert!(ds.table().i64s("level").unwrap().iter().all(|&l| l == LEVELMAX as i64));
}

#[test]
fn unknown_particle_families_are_rejected() {
    let snap = Snapshot::write();
    let info = snap.info();
    for ids in [vec![42], vec![2, 6], vec![]] {
        let err = getparticles(&info, &LoadOptions::new().families(ids.clone())).unwrap_err();
        assert!(matches!(err, MeraError::Usage(_)), "{ids:?}: {err}");
    }
    let named = Family::Star.id();
    assert_eq!(getparticles(&info, &LoadOptions::new().families([named])).unwrap().len(), 2);
}

#[test]
fn particle_family_filter() {
    let snap = Snapshot::write();
    let ds = getparticles(&snap.info(), &LoadOptions::new().families([2])).unwrap();
    let stars = all_particles().iter().filter(|p| p.family == 2).count();
    assert_eq!(ds.len(), stars);
    assert!(ds.table().i64s("family").unwrap().iter().all(|&f| f == 2));

    let age = ds.getvar("age", "").unwrap();
    let birth = ds.getvar("birth", "").unwrap();
    for (a, b) in age.iter().zip(&birth) {
        assert!(close(*a, TIME - b, 1e-12));
    }
}

#[test]
fn clumps_are_read_from_text_tables() {
    let snap = Snapshot::write();
    let ds = getclumps(&snap.info(), &LoadOptions::new()).unwrap();
    assert_eq!(ds.len(), CLUMPS.len());
    assert_eq!(ds.getvar("mass_cl", "").unwrap(), [CLUMPS[0][10], CLUMPS[1][10]]);
    let [x, _, z] = ds.positions().unwrap();
    assert_eq!(x, [0.25, 0.75]);
    assert_eq!(z, [0.25, 0.6]);
}

#[test]
fn absent_component_is_missing_data() {
    let snap = Snapshot::write();
    for icpu in 1..=NCPU {
        std::fs::remove_file(snap.file(&format!("grav_00001.out{icpu:05}"))).unwrap();
    }
    let err = getgravity(&snap.info(), &LoadOptions::new()).unwrap_err();
    assert!(matches!(err, MeraError::MissingData(_)), "{err}");
}

#[test]
fn truncated_shard_is_a_format_error() {
    let snap = Snapshot::write();
    let path = snap.file("hydro_00001.out00002");
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 20]).unwrap();
    let err = gethydro(&snap.info(), &LoadOptions::new()).unwrap_err();
    assert!(matches!(err, MeraError::Format(_)), "{err}");
}

#[test]
fn corrupt_amr_header_counts_are_format_errors() {
    // ncpu payload sits at bytes 4..8, nlevelmax at 48..52
    for (at, value) in [(4, -1i32), (4, 3), (48, -7), (48, i32::MAX)] {
        let snap = Snapshot::write();
        let path = snap.file("amr_00001.out00001");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        let err = gethydro(&snap.info(), &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, MeraError::Format(_)), "byte {at} = {value}: {err}");
    }
}
