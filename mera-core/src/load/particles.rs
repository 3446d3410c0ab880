//! Particle files: an 8-record header followed by one flat record per field,
//! in descriptor order.

use super::{LoadOptions, finish, plan, run_shards};
use crate::dataset::{CPU, Dataset, DatasetKind, FAMILY, LEVEL, PARTICLE_POS};
use crate::descriptor::DescriptorField;
use crate::error::{MeraError, Result};
use crate::family::Family;
use crate::fortran::{FieldType, RecordReader};
use crate::info::{Component, InfoRecord};
use crate::table::{Column, ColumnKind, Schema, ShardRows};
use std::sync::Arc;

/// ncpu, ndim, npart, localseed, nstar_tot, mstar_tot, mstar_lost, nsink
const HEADER_RECORDS: usize = 8;

fn column_kind(ty: FieldType) -> ColumnKind {
    match ty {
        FieldType::F64 | FieldType::F32 => ColumnKind::Float,
        FieldType::I32 | FieldType::I64 | FieldType::I8 => ColumnKind::Int,
    }
}

struct Layout {
    pos: [usize; 3],
    level: usize,
    family: usize,
    cpu: usize,
    /// (field position in file, output column)
    vars: Vec<(usize, usize)>,
}

fn schema_for(fields: &[DescriptorField], symbols: &[String], requested: &[String]) -> (Schema, Layout) {
    let mut schema = Schema::new();
    let pos = PARTICLE_POS.map(|n| schema.push(n, ColumnKind::Float));
    let level = schema.push(LEVEL, ColumnKind::Int);
    let family = schema.push(FAMILY, ColumnKind::Int);
    let cpu = schema.push(CPU, ColumnKind::Int);
    let vars = symbols
        .iter()
        .enumerate()
        .filter(|(_, s)| requested.contains(s))
        .map(|(i, s)| (i, schema.push(s.as_str(), column_kind(fields[i].ty))))
        .collect();
    (
        schema,
        Layout {
            pos,
            level,
            family,
            cpu,
            vars,
        },
    )
}

fn read_field(r: &mut RecordReader<impl std::io::Read + std::io::Seek>, f: &DescriptorField, npart: usize) -> Result<Column> {
    let col = match column_kind(f.ty) {
        ColumnKind::Float => Column::Float(r.read_as_f64(f.ty)?),
        ColumnKind::Int => Column::Int(r.read_as_i64(f.ty)?),
    };
    if col.len() != npart {
        return Err(MeraError::format(format!(
            "{}: field {} has {} values for {npart} particles",
            r.path().display(),
            f.name,
            col.len()
        )));
    }
    Ok(col)
}

fn decode_shard(
    info: &InfoRecord,
    icpu: u32,
    schema: &Schema,
    layout: &Layout,
    extent: &crate::geometry::Extent,
    families: Option<&[i64]>,
) -> Result<ShardRows> {
    let mut r = RecordReader::open(&info.shard_path(Component::Particles, icpu))?;
    r.skip(2)?;
    let npart = r.read_count("npart")?;
    r.skip(HEADER_RECORDS - 3)?;

    let symbols = info.particle_symbols();
    let has_family = symbols.iter().any(|s| s == FAMILY);
    let mut decoded: Vec<Option<Column>> = vec![None; symbols.len()];
    for (i, (f, sym)) in info.particle_fields.iter().zip(&symbols).enumerate() {
        let needed = PARTICLE_POS.contains(&sym.as_str())
            || sym == LEVEL
            || sym == FAMILY
            || (!has_family && sym == "birth")
            || layout.vars.iter().any(|&(fi, _)| fi == i);
        if needed {
            decoded[i] = Some(read_field(&mut r, f, npart)?);
        } else {
            r.skip(1)?;
        }
    }

    let find = |name: &str| symbols.iter().position(|s| s == name).and_then(|i| decoded[i].as_ref());
    let mut pos = Vec::with_capacity(3);
    for name in PARTICLE_POS {
        let col = find(name).ok_or_else(|| {
            MeraError::format(format!("particle files carry no {name} positions"))
        })?;
        pos.push(col.as_f64().into_owned());
    }
    let level: Vec<i64> = match find(LEVEL).and_then(Column::as_i64) {
        Some(l) => l.to_vec(),
        None => vec![info.levelmax as i64; npart],
    };
    let family: Vec<i64> = match (find(FAMILY).and_then(Column::as_i64), find("birth")) {
        (Some(f), _) => f.to_vec(),
        (None, Some(b)) => b
            .as_f64()
            .iter()
            .map(|&t| if t != 0.0 { Family::Star.id() } else { Family::DarkMatter.id() })
            .collect(),
        (None, None) => vec![Family::DarkMatter.id(); npart],
    };

    let mut rows = schema.shard(icpu);
    for i in 0..npart {
        let p = [pos[0][i], pos[1][i], pos[2][i]];
        if !extent.contains(p) {
            continue;
        }
        if let Some(fams) = families {
            if !fams.contains(&family[i]) {
                continue;
            }
        }
        for k in 0..3 {
            rows.push_f64(layout.pos[k], p[k]);
        }
        rows.push_i64(layout.level, level[i]);
        rows.push_i64(layout.family, family[i]);
        rows.push_i64(layout.cpu, icpu as i64);
        for &(fi, col) in &layout.vars {
            match &decoded[fi] {
                Some(Column::Float(v)) => rows.push_f64(col, v[i]),
                Some(Column::Int(v)) => rows.push_i64(col, v[i]),
                None => {}
            }
        }
    }
    Ok(rows)
}

/// Load particles, optionally restricted to some families.
pub fn getparticles(info: &Arc<InfoRecord>, opts: &LoadOptions) -> Result<Dataset> {
    let plan = plan(info, DatasetKind::Particles, opts)?;
    let symbols = info.particle_symbols();
    let (schema, layout) = schema_for(&info.particle_fields, &symbols, &plan.vars);
    let families = opts.families.as_deref();
    let extent = plan.extent;
    let table = run_shards(info, &schema, opts.threads, |icpu| {
        decode_shard(info, icpu, &schema, &layout, &extent, families)
    })?;
    Ok(finish(DatasetKind::Particles, Arc::clone(info), table, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::legacy_particle_fields;

    #[test]
    fn schema_puts_bookkeeping_first() {
        let fields = legacy_particle_fields();
        let symbols: Vec<String> = fields
            .iter()
            .map(|f| crate::descriptor::particle_symbol(&f.name))
            .collect();
        let (schema, layout) = schema_for(&fields, &symbols, &["mass".to_string(), "id".to_string()]);
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, ["x", "y", "z", "level", "family", "cpu", "mass", "id"]);
        assert_eq!(layout.vars, [(6, 6), (7, 7)]);
    }
}
