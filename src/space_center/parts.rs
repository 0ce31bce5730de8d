use std::{collections::BTreeMap, fmt::Display};

use crate::krpc::Error;

remote_class!(
    /// The parts of a vessel.
    Parts,
    "Parts"
);

remote_class!(Part, "Part");

remote_class!(
    /// An RCS block or engine module attached to a part.
    Rcs,
    "RCS"
);

remote_class!(
    /// A single nozzle of an RCS module.
    Thruster,
    "Thruster"
);

impl Parts {
    /// RCS modules of every part in the vessel
    pub fn rcs(&self) -> Result<Vec<Rcs>, Error> {
        self.get_objects("RCS")
    }
}

impl Part {
    pub fn title(&self) -> Result<String, Error> {
        self.get("Title")
    }

    /// Whether the part is shielded from the airstream, e.g. by a fairing
    pub fn shielded(&self) -> Result<bool, Error> {
        self.get("Shielded")
    }
}

impl Thruster {
    pub fn part(&self) -> Result<Part, Error> {
        self.get_object("Part")
    }
}

/// Writable switches on an RCS module: the module itself and its six axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RcsFlag {
    Enabled,
    Pitch,
    Yaw,
    Roll,
    Forward,
    Up,
    Right,
}

impl RcsFlag {
    pub const ALL: [RcsFlag; 7] = [
        RcsFlag::Enabled,
        RcsFlag::Pitch,
        RcsFlag::Yaw,
        RcsFlag::Roll,
        RcsFlag::Forward,
        RcsFlag::Up,
        RcsFlag::Right,
    ];

    pub const AXES: [RcsFlag; 6] = [
        RcsFlag::Pitch,
        RcsFlag::Yaw,
        RcsFlag::Roll,
        RcsFlag::Forward,
        RcsFlag::Up,
        RcsFlag::Right,
    ];

    pub fn property(&self) -> &'static str {
        match self {
            RcsFlag::Enabled => "Enabled",
            RcsFlag::Pitch => "PitchEnabled",
            RcsFlag::Yaw => "YawEnabled",
            RcsFlag::Roll => "RollEnabled",
            RcsFlag::Forward => "ForwardEnabled",
            RcsFlag::Up => "UpEnabled",
            RcsFlag::Right => "RightEnabled",
        }
    }
}

impl Display for RcsFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RcsFlag::Enabled => "enabled",
            RcsFlag::Pitch => "pitch_enabled",
            RcsFlag::Yaw => "yaw_enabled",
            RcsFlag::Roll => "roll_enabled",
            RcsFlag::Forward => "forward_enabled",
            RcsFlag::Up => "up_enabled",
            RcsFlag::Right => "right_enabled",
        };
        write!(f, "{name}")
    }
}

impl Rcs {
    pub fn part(&self) -> Result<Part, Error> {
        self.get_object("Part")
    }

    /// True when the module will fire: RCS is on and the module is enabled.
    pub fn active(&self) -> Result<bool, Error> {
        self.get("Active")
    }

    pub fn flag(&self, flag: RcsFlag) -> Result<bool, Error> {
        self.get(flag.property())
    }

    pub fn set_flag(&self, flag: RcsFlag, value: bool) -> Result<(), Error> {
        self.set(flag.property(), value)
    }

    pub fn enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Enabled)
    }

    pub fn set_enabled(&self, value: bool) -> Result<(), Error> {
        self.set_flag(RcsFlag::Enabled, value)
    }

    pub fn pitch_enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Pitch)
    }

    pub fn yaw_enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Yaw)
    }

    pub fn roll_enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Roll)
    }

    pub fn forward_enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Forward)
    }

    pub fn up_enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Up)
    }

    pub fn right_enabled(&self) -> Result<bool, Error> {
        self.flag(RcsFlag::Right)
    }

    /// Current maximum thrust in Newtons, at the ambient pressure
    pub fn max_thrust(&self) -> Result<f32, Error> {
        self.get("MaxThrust")
    }

    pub fn max_vacuum_thrust(&self) -> Result<f32, Error> {
        self.get("MaxVacuumThrust")
    }

    pub fn thrusters(&self) -> Result<Vec<Thruster>, Error> {
        self.get_objects("Thrusters")
    }

    /// Current specific impulse in seconds, at the ambient pressure
    pub fn specific_impulse(&self) -> Result<f32, Error> {
        self.get("SpecificImpulse")
    }

    pub fn vacuum_specific_impulse(&self) -> Result<f32, Error> {
        self.get("VacuumSpecificImpulse")
    }

    pub fn kerbin_sea_level_specific_impulse(&self) -> Result<f32, Error> {
        self.get("KerbinSeaLevelSpecificImpulse")
    }

    pub fn propellants(&self) -> Result<Vec<String>, Error> {
        self.get("Propellants")
    }

    pub fn propellant_ratios(&self) -> Result<BTreeMap<String, f32>, Error> {
        self.get("PropellantRatios")
    }

    pub fn has_fuel(&self) -> Result<bool, Error> {
        self.get("HasFuel")
    }
}
