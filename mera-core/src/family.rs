//! Particle family ids as written in the `family` field of particle files.

use crate::error::{MeraError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    GasTracer,
    DmTracer,
    StarTracer,
    CloudTracer,
    DebrisTracer,
    OtherTracer,
    DarkMatter,
    Star,
    Cloud,
    Debris,
    Other,
    Undefined,
}

impl Family {
    pub const ALL: [Family; 12] = [
        Family::OtherTracer,
        Family::DebrisTracer,
        Family::CloudTracer,
        Family::StarTracer,
        Family::DmTracer,
        Family::GasTracer,
        Family::DarkMatter,
        Family::Star,
        Family::Cloud,
        Family::Debris,
        Family::Other,
        Family::Undefined,
    ];

    pub const fn id(self) -> i64 {
        match self {
            Family::GasTracer => 0,
            Family::DmTracer => -1,
            Family::StarTracer => -2,
            Family::CloudTracer => -3,
            Family::DebrisTracer => -4,
            Family::OtherTracer => -5,
            Family::DarkMatter => 1,
            Family::Star => 2,
            Family::Cloud => 3,
            Family::Debris => 4,
            Family::Other => 5,
            Family::Undefined => 127,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Family::GasTracer => "gas_tracer",
            Family::DmTracer => "dm_tracer",
            Family::StarTracer => "star_tracer",
            Family::CloudTracer => "cloud_tracer",
            Family::DebrisTracer => "debris_tracer",
            Family::OtherTracer => "other_tracer",
            Family::DarkMatter => "dm",
            Family::Star => "star",
            Family::Cloud => "cloud",
            Family::Debris => "debris",
            Family::Other => "other",
            Family::Undefined => "undefined",
        }
    }

    pub fn is_tracer(self) -> bool {
        self.id() <= 0
    }

    /// Check every id of a family filter; an empty filter is rejected too.
    pub fn check_ids(ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Err(MeraError::usage("empty particle family filter"));
        }
        ids.iter().try_for_each(|&id| Family::try_from(id).map(drop))
    }
}

impl TryFrom<i64> for Family {
    type Error = MeraError;

    fn try_from(id: i64) -> Result<Self> {
        Family::ALL
            .into_iter()
            .find(|f| f.id() == id)
            .ok_or_else(|| MeraError::usage(format!("unknown particle family id {id}")))
    }
}

impl FromStr for Family {
    type Err = MeraError;

    /// Accepts a family name or its numeric id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Family::try_from(id);
        }
        Family::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeraError::usage(format!("unknown particle family {s:?}")))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
