mod common;

use common::*;
use mera_core::units::constants::{KM, MSOL};
use mera_core::{
    Center, LoadOptions, MeraError, RangeUnit, Region, bulk_velocity, center_of_mass, gethydro,
    getparticles, msum, subregion,
};

#[test]
fn total_mass_in_code_and_solar_units() {
    let snap = Snapshot::write();
    let ds = gethydro(&snap.info(), &LoadOptions::new()).unwrap();
    let code = msum(&ds, "").unwrap();
    let want: f64 = cells(1, 3).iter().map(Cell::mass).sum();
    assert!(close(code, want, 1e-12));

    let unit_m = UNIT_D * UNIT_L.powi(3);
    assert!(close(msum(&ds, "Msol").unwrap(), want * unit_m / MSOL, 1e-12));
}

#[test]
fn particle_centre_of_mass() {
    let snap = Snapshot::write();
    let ds = getparticles(&snap.info(), &LoadOptions::new()).unwrap();
    let ps = all_particles();
    let m: f64 = ps.iter().map(|p| p.mass).sum();
    let com = center_of_mass(&ds, "").unwrap();
    for k in 0..3 {
        let want = ps.iter().map(|p| p.mass * p.pos[k]).sum::<f64>() / m;
        assert!(close(com[k], want, 1e-12), "axis {k}");
    }
    let kpc = center_of_mass(&ds, "kpc").unwrap();
    let factor = ds.scale().resolve("kpc").unwrap();
    assert!(close(kpc[0], com[0] * factor, 1e-12));
}

#[test]
fn uniform_flow_has_that_bulk_velocity() {
    let snap = Snapshot::write();
    let ds = gethydro(&snap.info(), &LoadOptions::new()).unwrap();
    let v = bulk_velocity(&ds, "km_s").unwrap();
    let unit_v = UNIT_L / UNIT_T;
    for k in 0..3 {
        assert!(close(v[k], GAS_VELOCITY[k] * unit_v / KM, 1e-12), "axis {k}");
    }
}

#[test]
fn empty_selection_has_no_centre() {
    let snap = Snapshot::write();
    let ds = getparticles(&snap.info(), &LoadOptions::new()).unwrap();
    let nothing = subregion(
        &ds,
        &Region::sphere(Center::at([0.0; 3], RangeUnit::Code), 0.01, RangeUnit::Code),
        false,
    )
    .unwrap();
    assert!(nothing.is_empty());
    assert_eq!(msum(&nothing, "").unwrap(), 0.0);
    assert!(matches!(center_of_mass(&nothing, ""), Err(MeraError::EmptySelection(_))));
    assert!(matches!(bulk_velocity(&nothing, "km_s"), Err(MeraError::EmptySelection(_))));
}
