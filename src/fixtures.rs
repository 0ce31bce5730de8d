use std::{collections::BTreeMap, fmt::Display, fs, path::Path};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot read reference table")]
    Io(#[from] std::io::Error),

    #[error("Error deserializing reference table")]
    Deserialize(#[from] toml::de::Error),
}

/// Ambient conditions a part is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// On the launch pad
    SeaLevel,
    /// Circular orbit above the atmosphere
    Vacuum,
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::SeaLevel => write!(f, "sea level"),
            Environment::Vacuum => write!(f, "vacuum"),
        }
    }
}

/// Figures that depend on ambient pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Figures {
    pub max_thrust: f64,
    pub isp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcsReference {
    /// Propellant name to mixture ratio
    pub propellants: BTreeMap<String, f64>,
    pub max_vac_thrust: f64,
    pub msl_isp: f64,
    pub vac_isp: f64,
    pub thrusters: usize,

    pub sea_level: Figures,
    pub vacuum: Figures,
}

impl RcsReference {
    pub fn figures(&self, env: Environment) -> &Figures {
        match env {
            Environment::SeaLevel => &self.sea_level,
            Environment::Vacuum => &self.vacuum,
        }
    }
}

/// Reference records keyed by part title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    parts: BTreeMap<String, RcsReference>,
}

impl ReferenceTable {
    pub fn from_toml(toml: &str) -> Result<Self, Error> {
        Ok(toml::from_str(toml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn get(&self, title: &str) -> Option<&RcsReference> {
        self.parts.get(title)
    }

    pub fn insert(&mut self, title: &str, reference: RcsReference) {
        self.parts.insert(title.to_string(), reference);
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

pub const LINEAR_PORT: &str = "Place-Anywhere 7 Linear RCS Port";
pub const THRUSTER_BLOCK: &str = "RV-105 RCS Thruster Block";
pub const VERNOR: &str = "Vernor Engine";

pub static RCS_PARTS: Lazy<ReferenceTable> = Lazy::new(|| {
    let monoprop = || BTreeMap::from([("MonoPropellant".to_string(), 1.0)]);

    let mut table = ReferenceTable::default();

    table.insert(
        LINEAR_PORT,
        RcsReference {
            propellants: monoprop(),
            max_vac_thrust: 2000.0,
            msl_isp: 100.0,
            vac_isp: 240.0,
            thrusters: 1,
            sea_level: Figures {
                max_thrust: 842.0,
                isp: 101.0,
            },
            vacuum: Figures {
                max_thrust: 2000.0,
                isp: 240.0,
            },
        },
    );

    table.insert(
        THRUSTER_BLOCK,
        RcsReference {
            propellants: monoprop(),
            max_vac_thrust: 1000.0,
            msl_isp: 100.0,
            vac_isp: 240.0,
            thrusters: 4,
            sea_level: Figures {
                max_thrust: 420.0,
                isp: 101.0,
            },
            vacuum: Figures {
                max_thrust: 1000.0,
                isp: 240.0,
            },
        },
    );

    table.insert(
        VERNOR,
        RcsReference {
            propellants: BTreeMap::from([
                ("LiquidFuel".to_string(), 9.0 / 11.0),
                ("Oxidizer".to_string(), 1.0),
            ]),
            max_vac_thrust: 12000.0,
            msl_isp: 140.0,
            vac_isp: 260.0,
            thrusters: 1,
            sea_level: Figures {
                max_thrust: 6503.0,
                isp: 140.9,
            },
            vacuum: Figures {
                max_thrust: 12000.0,
                isp: 260.0,
            },
        },
    );

    table
});
