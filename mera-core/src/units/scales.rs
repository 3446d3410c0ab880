//! Named unit scales derived from the four code-unit conversion factors.
//!
//! A value `q` in code units converts to unit `u` as `q * scale.resolve(u)?`.
//! Every factor is a pure function of [`BaseUnits`] and [`ScaleParams`].
//!
//! Scales travel as a [`ScaleRecord`], an ordered value list tagged with a
//! [`ScaleLayout`]. The legacy layout carries a subset of the current one;
//! converting between layouts copies shared fields by symbol and re-derives the
//! rest from the record's base factors, so both directions round-trip exactly.

use super::constants::*;
use crate::error::{MeraError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Code-unit conversion factors to cgs, as written in the info file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseUnits {
    pub unit_l: f64,
    pub unit_d: f64,
    pub unit_t: f64,
    pub unit_m: f64,
}

impl BaseUnits {
    /// `unit_m` follows from length and density.
    pub fn new(unit_l: f64, unit_d: f64, unit_t: f64) -> Self {
        Self {
            unit_l,
            unit_d,
            unit_t,
            unit_m: unit_d * unit_l.powi(3),
        }
    }

    pub fn unit_v(&self) -> f64 {
        self.unit_l / self.unit_t
    }
}

/// Gas composition assumptions entering the thermal scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    /// Mean molecular weight used for `K`/`T`.
    pub mu: f64,
    pub hydrogen_fraction: f64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            mu: 0.6,
            hydrogen_fraction: X_H,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleLayout {
    /// v1 records
    Legacy,
    /// v2 records
    Current,
}

impl ScaleLayout {
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Legacy => LEGACY_FIELDS,
            Self::Current => CURRENT_FIELDS,
        }
    }
}

const LEGACY_FIELDS: &[&str] = &[
    "Mpc", "kpc", "pc", "mpc", "ly", "Au", "km", "m", "cm", "mm", "μm", //
    "Mpc3", "kpc3", "pc3", "mpc3", "ly3", "Au3", "km3", "m3", "cm3", "mm3", "μm3", //
    "Msol_pc3", "g_cm3", "Msol_pc2", "g_cm2", //
    "Gyr", "Myr", "yr", "s", "ms", //
    "Msol", "Mearth", "Mjupiter", "g", //
    "km_s", "m_s", "cm_s", //
    "nH", "erg", "g_cms2", "T_mu", "Ba",
];

const CURRENT_FIELDS: &[&str] = &[
    // lengths
    "Mpc", "kpc", "pc", "mpc", "ly", "Au", "km", "m", "cm", "mm", "μm",
    // volumes
    "Mpc3", "kpc3", "pc3", "mpc3", "ly3", "Au3", "km3", "m3", "cm3", "mm3", "μm3",
    // densities
    "Msol_pc3", "Msun_pc3", "g_cm3", "kg_m3",
    // column densities
    "Msol_pc2", "Msun_pc2", "g_cm2", "NH_cm2", "atoms_cm2",
    // times
    "Gyr", "Myr", "yr", "s", "ms", "Hz",
    // masses
    "Msol", "Msun", "Mearth", "Mjupiter", "g", "kg",
    // velocities
    "km_s", "m_s", "cm_s", "c",
    // number densities
    "nH", "cm_3", "m_3",
    // energies
    "erg", "J", "eV", "keV", "MeV",
    // specific energies / potentials
    "erg_g", "J_kg", "km2_s2", "u_grav",
    // pressures / energy densities
    "Ba", "g_cms2", "dyne_cm2", "Pa", "erg_cm3", "p_kB", "K_cm3",
    // temperature
    "T_mu", "K_mu", "K", "T",
    // power and fluxes
    "erg_s", "Lsol", "Lsun", "erg_cm2_s", "Jy",
    // accelerations
    "cm_s2", "m_s2", "km_s2", "pc_Myr2",
    // momenta
    "g_cm_s", "Msol_km_s", "g_cm2_s", "Msol_kpc_km_s",
    // rates
    "Msol_yr", "g_s",
    // magnetic field
    "Gauss", "muG", "microG", "Tesla",
];

fn derive_factor(symbol: &str, b: &BaseUnits, p: &ScaleParams) -> Option<f64> {
    let l = b.unit_l;
    let d = b.unit_d;
    let t = b.unit_t;
    let m = b.unit_m;
    let v = b.unit_v();
    let ba = d * v * v;
    let erg = m * v * v;
    let acc = l / (t * t);
    let t_mu = MH / KB * v * v;
    let gauss = (4.0 * PI * d).sqrt() * v;

    let f = match symbol {
        "Mpc" => l / MPC,
        "kpc" => l / KPC,
        "pc" => l / PC,
        "mpc" => l / MILLI_PC,
        "ly" => l / LY,
        "Au" => l / AU,
        "km" => l / KM,
        "m" => l / M,
        "cm" => l,
        "mm" => l / MM,
        "μm" => l / UM,

        "Mpc3" => (l / MPC).powi(3),
        "kpc3" => (l / KPC).powi(3),
        "pc3" => (l / PC).powi(3),
        "mpc3" => (l / MILLI_PC).powi(3),
        "ly3" => (l / LY).powi(3),
        "Au3" => (l / AU).powi(3),
        "km3" => (l / KM).powi(3),
        "m3" => (l / M).powi(3),
        "cm3" => l.powi(3),
        "mm3" => (l / MM).powi(3),
        "μm3" => (l / UM).powi(3),

        "Msol_pc3" | "Msun_pc3" => d * PC.powi(3) / MSOL,
        "g_cm3" => d,
        "kg_m3" => d * 1.0e3,

        "Msol_pc2" | "Msun_pc2" => d * l * PC.powi(2) / MSOL,
        "g_cm2" => d * l,
        "NH_cm2" => p.hydrogen_fraction * d * l / MH,
        "atoms_cm2" => d * l / MH,

        "Gyr" => t / GYR,
        "Myr" => t / MYR,
        "yr" => t / YR,
        "s" => t,
        "ms" => t * 1.0e3,
        "Hz" => 1.0 / t,

        "Msol" | "Msun" => m / MSOL,
        "Mearth" => m / MEARTH,
        "Mjupiter" => m / MJUPITER,
        "g" => m,
        "kg" => m * 1.0e-3,

        "km_s" => v / KM,
        "m_s" => v / M,
        "cm_s" => v,
        "c" => v / C,

        "nH" => p.hydrogen_fraction * d / MH,
        "cm_3" => d / MH,
        "m_3" => d / MH * 1.0e6,

        "erg" => erg,
        "J" => erg * 1.0e-7,
        "eV" => erg / EV,
        "keV" => erg / EV * 1.0e-3,
        "MeV" => erg / EV * 1.0e-6,

        "erg_g" | "u_grav" => v * v,
        "J_kg" => v * v * 1.0e-4,
        "km2_s2" => (v / KM).powi(2),

        "Ba" | "g_cms2" | "dyne_cm2" | "erg_cm3" => ba,
        "Pa" => ba * 0.1,
        "p_kB" | "K_cm3" => ba / KB,

        "T_mu" | "K_mu" => t_mu,
        "K" | "T" => t_mu * p.mu,

        "erg_s" => erg / t,
        "Lsol" | "Lsun" => erg / t / LSOL,
        "erg_cm2_s" => erg / (t * l * l),
        "Jy" => erg / (l * l) / JY,

        "cm_s2" => acc,
        "m_s2" => acc / M,
        "km_s2" => acc / KM,
        "pc_Myr2" => acc * MYR * MYR / PC,

        "g_cm_s" => m * v,
        "Msol_km_s" => m * v / (MSOL * KM),
        "g_cm2_s" => m * l * v,
        "Msol_kpc_km_s" => m * l * v / (MSOL * KPC * KM),

        "Msol_yr" => m / MSOL * YR / t,
        "g_s" => m / t,

        "Gauss" => gauss,
        "muG" | "microG" => gauss * 1.0e6,
        "Tesla" => gauss * 1.0e-4,

        _ => return None,
    };
    Some(f)
}

/// Symbols that mean "leave the value in code units".
fn is_code_unit(symbol: &str) -> bool {
    matches!(symbol, "" | "standard" | "code")
}

fn canonical(symbol: &str) -> &str {
    match symbol {
        "um" => "μm",
        "um3" => "μm3",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ScaleRecord", try_from = "ScaleRecord")]
pub struct ScaleSet {
    base: BaseUnits,
    params: ScaleParams,
    factors: BTreeMap<&'static str, f64>,
}

impl ScaleSet {
    pub fn new(base: BaseUnits, params: ScaleParams) -> Self {
        let factors = CURRENT_FIELDS
            .iter()
            .filter_map(|&s| derive_factor(s, &base, &params).map(|f| (s, f)))
            .collect();
        Self {
            base,
            params,
            factors,
        }
    }

    pub fn base(&self) -> &BaseUnits {
        &self.base
    }

    pub fn params(&self) -> &ScaleParams {
        &self.params
    }

    /// Multiplier converting code units into `symbol`.
    pub fn resolve(&self, symbol: &str) -> Result<f64> {
        if is_code_unit(symbol) {
            return Ok(1.0);
        }
        self.factors
            .get(canonical(symbol))
            .copied()
            .ok_or_else(|| MeraError::unknown_unit(symbol))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factors.keys().copied()
    }

    pub fn to_record(&self, layout: ScaleLayout) -> ScaleRecord {
        let values = layout
            .fields()
            .iter()
            .map(|s| self.factors.get(s).copied().unwrap_or(f64::NAN))
            .collect();
        ScaleRecord {
            layout,
            base: self.base,
            params: self.params,
            values,
        }
    }

    /// Rebuild from a record of either layout. Fields the record does not
    /// carry are re-derived from its base factors.
    pub fn from_record(rec: &ScaleRecord) -> Result<Self> {
        let fields = rec.layout.fields();
        if fields.len() != rec.values.len() {
            return Err(MeraError::format(format!(
                "{:?} scale record holds {} values, layout has {} fields",
                rec.layout,
                rec.values.len(),
                fields.len()
            )));
        }
        let mut set = Self::new(rec.base, rec.params);
        for (&sym, &val) in fields.iter().zip(&rec.values) {
            set.factors.insert(sym, val);
        }
        Ok(set)
    }
}

/// Wire form of a [`ScaleSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleRecord {
    pub layout: ScaleLayout,
    pub base: BaseUnits,
    pub params: ScaleParams,
    pub values: Vec<f64>,
}

impl ScaleRecord {
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.layout
            .fields()
            .iter()
            .position(|&s| s == symbol)
            .map(|i| self.values[i])
    }

    pub fn convert(&self, target: ScaleLayout) -> Result<ScaleRecord> {
        Ok(ScaleSet::from_record(self)?.to_record(target))
    }
}

impl From<ScaleSet> for ScaleRecord {
    fn from(s: ScaleSet) -> Self {
        s.to_record(ScaleLayout::Current)
    }
}

impl TryFrom<ScaleRecord> for ScaleSet {
    type Error = MeraError;

    fn try_from(rec: ScaleRecord) -> Result<Self> {
        ScaleSet::from_record(&rec)
    }
}
