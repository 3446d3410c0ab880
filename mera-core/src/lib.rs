#![forbid(unsafe_code)]

pub mod error;

pub mod fortran;
pub mod descriptor;
pub mod info;
pub mod outputs;

pub mod units {
    pub mod constants;
    pub mod scales;

    pub use scales::{BaseUnits, ScaleLayout, ScaleParams, ScaleRecord, ScaleSet};
}

pub mod family;
pub mod geometry;
pub mod table;
pub mod dataset;

pub mod load;
pub mod getvar;
pub mod region;
pub mod projection;
pub mod reduce;

pub mod archive;

// Re-exports: stable API surface
pub use archive::{SaveOptions, inspect, load_dataset, save_dataset, verify};
pub use dataset::{Dataset, DatasetKind};
pub use error::{MeraError, Result};
pub use family::Family;
pub use geometry::{Axis, Center, Extent, RangeUnit, SpatialRange};
pub use getvar::{Mask, VarQuery, getvar, known_variables};
pub use info::{Component, InfoRecord};
pub use load::{LoadOptions, getclumps, getgravity, gethydro, getparticles, load};
pub use outputs::check_outputs;
pub use projection::{Mode, ProjectionOptions, ProjectionResult, Resolution, Weighting, projection};
pub use reduce::{bulk_velocity, center_of_mass, msum};
pub use region::{Region, RegionPredicate, Shell, shellregion, subregion};
