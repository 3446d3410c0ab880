use std::path::{Path, PathBuf};
use std::sync::Arc;

use mera_core::error::Result;
use mera_core::info::Component;
use mera_core::units::ScaleLayout;
use mera_core::{
    Axis, DatasetKind, InfoRecord, LoadOptions, Mode, ProjectionOptions, SaveOptions,
    check_outputs, inspect, load, projection, save_dataset, verify,
};

use tracing::debug;

use crate::presentation::cli::{LoadArgs, SnapshotArgs};

fn resolve(snap: &SnapshotArgs) -> Result<Arc<InfoRecord>> {
    debug!(base = %snap.base.display(), output = snap.output, "opening snapshot");
    Ok(Arc::new(InfoRecord::resolve(&snap.base, snap.output)?))
}

fn load_options(args: &LoadArgs) -> LoadOptions {
    LoadOptions {
        vars: (!args.vars.is_empty()).then(|| args.vars.clone()),
        lmin: args.lmin,
        lmax: args.lmax,
        threads: args.threads,
        families: (!args.families.is_empty())
            .then(|| args.families.iter().map(|f| f.id()).collect()),
        ..Default::default()
    }
}

pub fn handle_info(snap: SnapshotArgs, scales: bool) -> Result<()> {
    let info = resolve(&snap)?;
    println!("output     {}", info.output);
    println!("path       {}", info.path.display());
    println!("ncpu       {}", info.ncpu);
    println!("levels     {}..={}", info.levelmin, info.levelmax);
    println!("boxlen     {}", info.boxlen);
    println!("time       {} (code), {} Myr", info.time, info.time * info.scale.resolve("Myr")?);
    println!("aexp       {}", info.cosmology.aexp);
    println!("gamma      {}", info.gamma);
    for c in [
        Component::Amr,
        Component::Hydro,
        Component::Gravity,
        Component::Particles,
        Component::Clumps,
        Component::Rt,
        Component::Sinks,
    ] {
        let vars = info.variables(c);
        if vars.is_empty() {
            println!("{c:<10} {}", info.has(c));
        } else {
            println!("{c:<10} {}  [{}]", info.has(c), vars.join(", "));
        }
    }
    if scales {
        let rec = info.scale.to_record(ScaleLayout::Current);
        for (sym, v) in ScaleLayout::Current.fields().iter().zip(&rec.values) {
            println!("  {sym:<12} {v:e}");
        }
    }
    Ok(())
}

pub fn handle_outputs(base: PathBuf) -> Result<()> {
    let report = check_outputs(&base)?;
    for o in &report.outputs {
        let state = if report.missing_info.contains(o) { "incomplete" } else { "ok" };
        println!("output_{o:05}  {state}");
    }
    Ok(())
}

pub fn handle_pack(
    snap: SnapshotArgs,
    load_args: LoadArgs,
    out: PathBuf,
    deterministic: bool,
    min_gain: f32,
) -> Result<()> {
    let info = resolve(&snap)?;
    let kind: DatasetKind = load_args.kind.parse()?;
    let ds = load(&info, kind, &load_options(&load_args))?;
    let opts = SaveOptions::default()
        .deterministic(deterministic)
        .min_gain(min_gain);
    save_dataset(&ds, &out, &opts)?;
    println!("{} rows of {kind} -> {}", ds.len(), out.display());
    Ok(())
}

pub fn handle_inspect(archive: &Path) -> Result<()> {
    let s = inspect(archive)?;
    println!(
        "{} output={} rows={} levels={}..={} shards={} created={} tool={}",
        s.kind, s.output, s.rows, s.lmin, s.lmax, s.shards, s.created, s.tool
    );
    for c in &s.columns {
        println!(
            "  {:<12} {:?} codec={:?} u={} c={} blake3={}",
            c.name,
            c.kind,
            c.codec,
            c.u_size,
            c.c_size,
            &c.blake3[..16]
        );
    }
    println!("total u={} c={}", s.total_u, s.total_c);
    Ok(())
}

pub fn handle_verify(archive: &Path) -> Result<()> {
    let r = verify(archive)?;
    eprintln!("verify: OK ({} chunks, {} bytes)", r.chunks, r.bytes);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_project(
    snap: SnapshotArgs,
    load_args: LoadArgs,
    maps: Vec<String>,
    units: Vec<String>,
    pixels: usize,
    direction: String,
    mode: String,
) -> Result<()> {
    // parse before touching the snapshot
    let direction: Axis = direction.parse()?;
    let mode: Mode = mode.parse()?;
    let kind: DatasetKind = load_args.kind.parse()?;
    let opts = ProjectionOptions::new(maps)
        .units(units)
        .pixels(pixels)
        .direction(direction)
        .mode(mode);
    opts.validate()?;

    let info = resolve(&snap)?;
    let ds = load(&info, kind, &load_options(&load_args))?;
    let p = projection(&ds, &opts)?;
    println!(
        "{}x{} pixels of {:e} along {:?}, {} rows",
        p.grid.nx, p.grid.ny, p.grid.pixel[0], p.direction, p.rows
    );
    for m in &p.maps {
        println!("  {:<10} [{}] total={:e} max={:e}", m.var, m.unit, m.total(), m.max());
    }
    Ok(())
}
