use super::amr::{CellColumns, CellFilter, CellVarFile, decode_cells};
use super::{LoadOptions, Plan, finish, plan, run_shards};
use crate::dataset::{CELL_INDEX, CPU, Dataset, DatasetKind, LEVEL};
use crate::error::Result;
use crate::info::{Component, InfoRecord};
use crate::table::{ColumnKind, Schema};
use std::sync::Arc;

/// Header records after `nvar`: ndim, nlevelmax, nboundary, gamma.
const HYDRO_HEADER_TAIL: usize = 4;
/// Header records after `nvar`: nlevelmax, nboundary.
const GRAVITY_HEADER_TAIL: usize = 2;

pub(crate) fn cell_schema(plan: &Plan) -> (Schema, CellColumns) {
    let mut schema = Schema::new();
    let level = schema.push(LEVEL, ColumnKind::Int);
    let index = CELL_INDEX.map(|n| schema.push(n, ColumnKind::Int));
    let cpu = schema.push(CPU, ColumnKind::Int);
    let vars = plan
        .vars
        .iter()
        .map(|v| schema.push(v.as_str(), ColumnKind::Float))
        .collect();
    (
        schema,
        CellColumns {
            level,
            index,
            cpu,
            vars,
        },
    )
}

/// Slot of each file variable in the requested list.
pub(crate) fn wanted_slots(file_vars: &[String], requested: &[String]) -> Vec<Option<usize>> {
    file_vars
        .iter()
        .map(|v| requested.iter().position(|r| r == v))
        .collect()
}

pub(crate) fn load_cells(
    info: &Arc<InfoRecord>,
    kind: DatasetKind,
    opts: &LoadOptions,
) -> Result<Dataset> {
    let plan = plan(info, kind, opts)?;
    let (component, header_tail, file_vars) = match kind {
        DatasetKind::Gravity => (Component::Gravity, GRAVITY_HEADER_TAIL, &info.gravity_vars),
        _ => (Component::Hydro, HYDRO_HEADER_TAIL, &info.hydro_vars),
    };
    let (schema, cols) = cell_schema(&plan);
    let filter = CellFilter {
        lmin: plan.lmin,
        lmax: plan.lmax,
        extent: plan.extent,
        boxlen: info.boxlen,
    };
    let slots = wanted_slots(file_vars, &plan.vars);

    let table = run_shards(info, &schema, opts.threads, |icpu| {
        let mut vars = CellVarFile::open(&info.shard_path(component, icpu), header_tail, slots.clone())?;
        let mut rows = schema.shard(icpu);
        decode_cells(info, icpu, &filter, &mut vars, &cols, &mut rows)?;
        Ok(rows)
    })?;
    Ok(finish(kind, Arc::clone(info), table, plan))
}

/// Load hydro cells (leaf cells, or every cell at `lmax`).
pub fn gethydro(info: &Arc<InfoRecord>, opts: &LoadOptions) -> Result<Dataset> {
    load_cells(info, DatasetKind::Hydro, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_request_order() {
        let file: Vec<String> = ["rho", "vx", "vy", "vz", "p"].map(String::from).to_vec();
        let req: Vec<String> = ["rho", "p"].map(String::from).to_vec();
        assert_eq!(wanted_slots(&file, &req), [Some(0), None, None, None, Some(1)]);
    }
}
