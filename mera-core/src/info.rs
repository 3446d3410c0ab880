//! Snapshot metadata: `output_NNNNN/info_NNNNN.txt` plus descriptors and the
//! set of component files present on disk.

use crate::descriptor::{
    self, Descriptor, DescriptorField, default_hydro_symbols, hydro_symbol, particle_symbol,
};
use crate::error::{MeraError, Result};
use crate::fortran::RecordReader;
use crate::units::{BaseUnits, ScaleParams, ScaleSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Amr,
    Hydro,
    Gravity,
    Particles,
    Clumps,
    Rt,
    Sinks,
}

impl Component {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Amr => "amr",
            Self::Hydro => "hydro",
            Self::Gravity => "grav",
            Self::Particles => "part",
            Self::Clumps => "clump",
            Self::Rt => "rt",
            Self::Sinks => "sink",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Amr => "amr",
            Self::Hydro => "hydro",
            Self::Gravity => "gravity",
            Self::Particles => "particles",
            Self::Clumps => "clumps",
            Self::Rt => "rt",
            Self::Sinks => "sinks",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub amr: bool,
    pub hydro: bool,
    pub gravity: bool,
    pub particles: bool,
    pub clumps: bool,
    pub rt: bool,
    pub sinks: bool,
}

impl Presence {
    pub fn has(&self, c: Component) -> bool {
        match c {
            Component::Amr => self.amr,
            Component::Hydro => self.hydro,
            Component::Gravity => self.gravity,
            Component::Particles => self.particles,
            Component::Clumps => self.clumps,
            Component::Rt => self.rt,
            Component::Sinks => self.sinks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    pub aexp: f64,
    pub h0: f64,
    pub omega_m: f64,
    pub omega_l: f64,
    pub omega_k: f64,
    pub omega_b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRecord {
    pub output: u32,
    pub path: PathBuf,
    pub ncpu: u32,
    pub ndim: u32,
    pub levelmin: u8,
    pub levelmax: u8,
    pub ngridmax: u64,
    pub nstep_coarse: u64,
    pub boxlen: f64,
    /// Code units.
    pub time: f64,
    pub cosmology: Cosmology,
    pub base_units: BaseUnits,
    pub ordering: String,
    /// Adiabatic index from the hydro header; 5/3 without hydro.
    pub gamma: f64,
    pub hydro_vars: Vec<String>,
    pub hydro_descriptor_version: Option<u32>,
    pub gravity_vars: Vec<String>,
    pub particle_fields: Vec<DescriptorField>,
    pub particle_descriptor_version: Option<u32>,
    pub clump_vars: Vec<String>,
    pub presence: Presence,
    pub scale: ScaleSet,
}

fn parse_kv(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

struct Fields {
    kv: HashMap<String, String>,
    path: PathBuf,
}

impl Fields {
    fn raw(&self, key: &str) -> Result<&str> {
        self.kv.get(key).map(String::as_str).ok_or_else(|| {
            MeraError::format(format!("{}: missing field {key:?}", self.path.display()))
        })
    }

    /// Integer field that must fit `T`.
    fn int<T: TryFrom<i64>>(&self, key: &str) -> Result<T> {
        let v = self.raw(key)?;
        v.parse::<i64>()
            .ok()
            .and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| {
                MeraError::format(format!(
                    "{}: {key} = {v:?} is not a valid {}",
                    self.path.display(),
                    std::any::type_name::<T>()
                ))
            })
    }

    fn float(&self, key: &str) -> Result<f64> {
        let v = self.raw(key)?;
        v.replace(['D', 'd'], "E").parse().map_err(|_| {
            MeraError::format(format!("{}: {key} = {v:?} is not a number", self.path.display()))
        })
    }

    fn float_or(&self, key: &str, default: f64) -> Result<f64> {
        if self.kv.contains_key(key) {
            self.float(key)
        } else {
            Ok(default)
        }
    }
}

pub fn output_dir(base: &Path, output: u32) -> PathBuf {
    base.join(format!("output_{output:05}"))
}

impl InfoRecord {
    /// Resolve snapshot `output` under `base`, with default gas composition.
    pub fn resolve(base: &Path, output: u32) -> Result<Self> {
        Self::resolve_with(base, output, ScaleParams::default())
    }

    pub fn resolve_with(base: &Path, output: u32, params: ScaleParams) -> Result<Self> {
        if !base.is_dir() {
            return Err(MeraError::missing(format!(
                "simulation directory {} does not exist",
                base.display()
            )));
        }
        let dir = output_dir(base, output);
        if !dir.is_dir() {
            return Err(MeraError::missing(format!(
                "snapshot {output} not found under {}",
                base.display()
            )));
        }
        let info_path = dir.join(format!("info_{output:05}.txt"));
        if !info_path.is_file() {
            return Err(MeraError::missing(format!(
                "metadata file {} does not exist",
                info_path.display()
            )));
        }

        let fields = Fields {
            kv: parse_kv(&std::fs::read_to_string(&info_path)?),
            path: info_path,
        };
        let ndim: u32 = fields.int("ndim")?;
        if ndim != 3 {
            return Err(MeraError::format(format!(
                "only 3-dimensional snapshots are supported, found ndim = {ndim}"
            )));
        }
        let base_units = BaseUnits::new(
            fields.float("unit_l")?,
            fields.float("unit_d")?,
            fields.float("unit_t")?,
        );

        let mut rec = Self {
            output,
            path: dir,
            ncpu: fields.int("ncpu")?,
            ndim,
            levelmin: fields.int("levelmin")?,
            levelmax: fields.int("levelmax")?,
            ngridmax: fields.int("ngridmax")?,
            nstep_coarse: fields.int("nstep_coarse")?,
            boxlen: fields.float("boxlen")?,
            time: fields.float("time")?,
            cosmology: Cosmology {
                aexp: fields.float_or("aexp", 1.0)?,
                h0: fields.float_or("H0", 1.0)?,
                omega_m: fields.float_or("omega_m", 1.0)?,
                omega_l: fields.float_or("omega_l", 0.0)?,
                omega_k: fields.float_or("omega_k", 0.0)?,
                omega_b: fields.float_or("omega_b", 0.0)?,
            },
            base_units,
            ordering: fields
                .kv
                .get("ordering type")
                .cloned()
                .unwrap_or_else(|| "hilbert".to_string()),
            gamma: 5.0 / 3.0,
            hydro_vars: Vec::new(),
            hydro_descriptor_version: None,
            gravity_vars: Vec::new(),
            particle_fields: Vec::new(),
            particle_descriptor_version: None,
            clump_vars: Vec::new(),
            presence: Presence::default(),
            scale: ScaleSet::new(base_units, params),
        };
        if rec.levelmin > rec.levelmax || rec.ncpu == 0 {
            return Err(MeraError::format(format!(
                "inconsistent info file: ncpu={} levelmin={} levelmax={}",
                rec.ncpu, rec.levelmin, rec.levelmax
            )));
        }

        rec.presence = rec.detect_presence();
        if rec.presence.hydro {
            rec.read_hydro_layout()?;
        }
        if rec.presence.gravity {
            rec.gravity_vars = ["epot", "ax", "ay", "az"].map(String::from).to_vec();
        }
        if rec.presence.particles {
            let p = rec.path.join("part_file_descriptor.txt");
            if p.is_file() {
                let d = Descriptor::read(&p)?;
                rec.particle_descriptor_version = Some(d.version);
                rec.particle_fields = d.fields;
            } else {
                rec.particle_fields = descriptor::legacy_particle_fields();
            }
        }
        if rec.presence.clumps {
            rec.clump_vars = crate::load::clumps::read_header(&rec.shard_path(Component::Clumps, 1))?;
        }

        info!(
            output,
            ncpu = rec.ncpu,
            levelmin = rec.levelmin,
            levelmax = rec.levelmax,
            time = rec.time,
            "resolved snapshot"
        );
        debug!(presence = ?rec.presence, "component files");
        Ok(rec)
    }

    /// File of `component` written by domain `icpu` (1-based).
    pub fn shard_path(&self, component: Component, icpu: u32) -> PathBuf {
        let out = self.output;
        let name = match component {
            Component::Clumps => format!("clump_{out:05}.txt{icpu:05}"),
            c => format!("{}_{out:05}.out{icpu:05}", c.prefix()),
        };
        self.path.join(name)
    }

    fn detect_presence(&self) -> Presence {
        let exists = |c: Component| self.shard_path(c, 1).is_file();
        Presence {
            amr: exists(Component::Amr),
            hydro: exists(Component::Hydro),
            gravity: exists(Component::Gravity),
            particles: exists(Component::Particles),
            clumps: exists(Component::Clumps),
            rt: exists(Component::Rt),
            sinks: exists(Component::Sinks)
                || self
                    .path
                    .join(format!("sink_{:05}.csv", self.output))
                    .is_file(),
        }
    }

    fn read_hydro_layout(&mut self) -> Result<()> {
        // ncpu, nvar, ndim, nlevelmax, nboundary, gamma
        let mut r = RecordReader::open(&self.shard_path(Component::Hydro, 1))?;
        r.skip(1)?;
        let nvar = r.read_count("nvar")?;
        r.skip(3)?;
        self.gamma = r.read_f64()?;

        let p = self.path.join("hydro_file_descriptor.txt");
        if p.is_file() {
            let d = Descriptor::read(&p)?;
            if d.fields.len() != nvar {
                return Err(MeraError::format(format!(
                    "hydro descriptor lists {} variables, hydro header has {nvar}",
                    d.fields.len()
                )));
            }
            self.hydro_descriptor_version = Some(d.version);
            self.hydro_vars = d.fields.iter().map(|f| hydro_symbol(f.index, &f.name)).collect();
        } else {
            self.hydro_vars = default_hydro_symbols(nvar);
        }
        Ok(())
    }

    pub fn has(&self, c: Component) -> bool {
        self.presence.has(c)
    }

    pub fn require(&self, c: Component) -> Result<()> {
        if !self.has(c) {
            return Err(MeraError::missing(format!(
                "snapshot {} has no {c} data",
                self.output
            )));
        }
        if matches!(c, Component::Hydro | Component::Gravity) && !self.presence.amr {
            return Err(MeraError::missing(format!(
                "snapshot {} has {c} files but no amr files",
                self.output
            )));
        }
        Ok(())
    }

    pub fn particle_symbols(&self) -> Vec<String> {
        self.particle_fields.iter().map(|f| particle_symbol(&f.name)).collect()
    }

    /// Variables a loader of `component` can materialize.
    pub fn variables(&self, component: Component) -> Vec<String> {
        match component {
            Component::Hydro => self.hydro_vars.clone(),
            Component::Gravity => self.gravity_vars.clone(),
            Component::Particles => self.particle_symbols(),
            Component::Clumps => self.clump_vars.clone(),
            _ => Vec::new(),
        }
    }

    pub fn cellsize(&self, level: u8) -> f64 {
        self.boxlen / 2f64.powi(level as i32)
    }
}
