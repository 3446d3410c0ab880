//! Per-component file descriptors (`hydro_file_descriptor.txt`,
//! `part_file_descriptor.txt`).
//!
//! Two layouts are in the wild:
//!
//! ```text
//! version 0                      version 1
//! nvar        =           6      # version:  1
//! variable #  1: density         # ivar, variable_name, variable_type
//! variable #  2: velocity_x        1, density, d
//! ```

use crate::error::{MeraError, Result};
use crate::fortran::FieldType;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorField {
    /// 1-based position in the file
    pub index: usize,
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub version: u32,
    pub fields: Vec<DescriptorField>,
}

impl Descriptor {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
            .map_err(|e| MeraError::format(format!("{}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let version = text.lines().find_map(|l| {
            l.trim()
                .strip_prefix('#')
                .and_then(|r| r.trim().strip_prefix("version:"))
                .map(|v| v.trim().to_string())
        });
        match version {
            Some(v) => {
                let version = v
                    .parse::<u32>()
                    .map_err(|_| MeraError::format(format!("bad descriptor version {v:?}")))?;
                Ok(Self {
                    version,
                    fields: parse_csv_fields(text)?,
                })
            }
            None => Ok(Self {
                version: 0,
                fields: parse_v0_fields(text)?,
            }),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

fn parse_csv_fields(text: &str) -> Result<Vec<DescriptorField>> {
    let mut out = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(MeraError::format(format!("bad descriptor line {line:?}")));
        }
        let index = parts[0]
            .parse::<usize>()
            .map_err(|_| MeraError::format(format!("bad variable index in {line:?}")))?;
        out.push(DescriptorField {
            index,
            name: parts[1].to_string(),
            ty: FieldType::from_code(parts[2])?,
        });
    }
    Ok(out)
}

fn parse_v0_fields(text: &str) -> Result<Vec<DescriptorField>> {
    let mut out = Vec::new();
    for line in text.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix("variable #") else {
            continue;
        };
        let (idx, name) = rest
            .split_once(':')
            .ok_or_else(|| MeraError::format(format!("bad descriptor line {line:?}")))?;
        let index = idx
            .trim()
            .parse::<usize>()
            .map_err(|_| MeraError::format(format!("bad variable index in {line:?}")))?;
        out.push(DescriptorField {
            index,
            name: name.trim().to_string(),
            ty: FieldType::F64,
        });
    }
    Ok(out)
}

/// Column name used for the `index`-th hydro variable.
pub fn hydro_symbol(index: usize, name: &str) -> String {
    match name {
        "density" => "rho".into(),
        "velocity_x" => "vx".into(),
        "velocity_y" => "vy".into(),
        "velocity_z" => "vz".into(),
        "pressure" | "thermal_pressure" => "p".into(),
        _ => format!("var{index}"),
    }
}

/// Hydro names when no descriptor was written.
pub fn default_hydro_symbols(nvar: usize) -> Vec<String> {
    const FIRST: [&str; 5] = ["rho", "vx", "vy", "vz", "p"];
    (1..=nvar)
        .map(|i| match FIRST.get(i - 1) {
            Some(s) => s.to_string(),
            None => format!("var{i}"),
        })
        .collect()
}

/// Column name used for a particle field.
pub fn particle_symbol(name: &str) -> String {
    match name {
        "position_x" => "x",
        "position_y" => "y",
        "position_z" => "z",
        "velocity_x" => "vx",
        "velocity_y" => "vy",
        "velocity_z" => "vz",
        "identity" => "id",
        "levelp" => "level",
        "birth_time" => "birth",
        "metallicity" => "metals",
        other => other,
    }
    .to_string()
}

/// Particle layout of outputs written before descriptors existed.
pub fn legacy_particle_fields() -> Vec<DescriptorField> {
    let legacy = [
        ("position_x", FieldType::F64),
        ("position_y", FieldType::F64),
        ("position_z", FieldType::F64),
        ("velocity_x", FieldType::F64),
        ("velocity_y", FieldType::F64),
        ("velocity_z", FieldType::F64),
        ("mass", FieldType::F64),
        ("identity", FieldType::I32),
        ("levelp", FieldType::I32),
    ];
    legacy.iter()
        .enumerate()
        .map(|(i, (name, ty))| DescriptorField {
            index: i + 1,
            name: name.to_string(),
            ty: *ty,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_one() {
        let text = "# version:  1\n# ivar, variable_name, variable_type\n  1, position_x, d\n  2, family, b\n  3, identity, i\n";
        let d = Descriptor::parse(text).unwrap();
        assert_eq!(d.version, 1);
        assert_eq!(d.fields.len(), 3);
        assert_eq!(d.fields[1].name, "family");
        assert_eq!(d.fields[1].ty, FieldType::I8);
    }

    #[test]
    fn parses_version_zero() {
        let text = "nvar        =           3\nvariable #  1: density\nvariable #  2: velocity_x\nvariable #  3: pressure\n";
        let d = Descriptor::parse(text).unwrap();
        assert_eq!(d.version, 0);
        assert_eq!(d.names().collect::<Vec<_>>(), ["density", "velocity_x", "pressure"]);
        assert!(d.fields.iter().all(|f| f.ty == FieldType::F64));
    }

    #[test]
    fn rejects_bad_type_code() {
        assert!(Descriptor::parse("# version: 1\n 1, mass, x\n").is_err());
    }

    #[test]
    fn symbol_mapping() {
        assert_eq!(hydro_symbol(1, "density"), "rho");
        assert_eq!(hydro_symbol(6, "scalar_01"), "var6");
        assert_eq!(default_hydro_symbols(7), ["rho", "vx", "vy", "vz", "p", "var6", "var7"]);
        assert_eq!(particle_symbol("levelp"), "level");
        assert_eq!(particle_symbol("tag"), "tag");
    }
}
