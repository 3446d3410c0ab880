use super::LoadOptions;
use super::hydro::load_cells;
use crate::dataset::{Dataset, DatasetKind};
use crate::error::Result;
use crate::info::InfoRecord;
use std::sync::Arc;

/// Load potential and acceleration (`epot`, `ax`, `ay`, `az`) on the same
/// cells the hydro loader would produce.
pub fn getgravity(info: &Arc<InfoRecord>, opts: &LoadOptions) -> Result<Dataset> {
    load_cells(info, DatasetKind::Gravity, opts)
}
