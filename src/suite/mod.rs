// The RCS part suite: scenario setup, the individual cases, and a report of
// their outcomes.

mod cases;
mod setup;

pub use setup::{launch_vessel_from_vab, new_save, wait_for_vessel};

use std::{fmt::Display, thread, time::Duration};

use log::{info, warn};
use thiserror::Error;

use crate::{
    checks::Mismatch,
    config::Config,
    fixtures::{self, Environment, ReferenceTable, RCS_PARTS},
    krpc::{self, Connection},
    space_center::{Control, Parts, Rcs, SpaceCenter, Vessel},
    testing_tools::TestingTools,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("kRPC error: {0}")]
    Krpc(#[from] krpc::Error),

    #[error("Check failed: {0}")]
    Check(#[from] Mismatch),

    #[error("No RCS part titled '{0}' on the active vessel")]
    PartNotFound(String),

    #[error("No reference data for part '{0}'")]
    MissingReference(String),

    #[error("Scenario '{0}' does not define a flight environment")]
    NoEnvironment(Scenario),

    #[error("Vessel '{vessel}' did not become active within {timeout:?}")]
    LaunchTimeout { vessel: String, timeout: Duration },

    #[error("Cannot stage fixture files")]
    Staging(#[source] std::io::Error),

    #[error("Cannot load reference table")]
    References(#[from] fixtures::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Uses the vessel already on the pad when it is the test vessel
    Reuse,
    /// Fresh launch, vessel on the pad
    SeaLevel,
    /// Fresh launch, then moved to a circular orbit
    Vacuum,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Reuse, Scenario::SeaLevel, Scenario::Vacuum];

    pub fn client_name(&self) -> &'static str {
        match self {
            Scenario::Reuse => "TestPartsRCS",
            Scenario::SeaLevel => "TestPartsRCSMSL",
            Scenario::Vacuum => "TestPartsRCSVacuum",
        }
    }

    pub fn environment(&self) -> Option<Environment> {
        match self {
            Scenario::Reuse => None,
            Scenario::SeaLevel => Some(Environment::SeaLevel),
            Scenario::Vacuum => Some(Environment::Vacuum),
        }
    }

    pub fn cases(&self) -> &'static [Case] {
        match self {
            Scenario::Reuse => &[
                Case::ActiveAndEnabled,
                Case::EnabledProperties,
                Case::HasFuel,
                Case::HasNoFuel,
            ],
            Scenario::SeaLevel | Scenario::Vacuum => {
                &[Case::RcsBlock, Case::RcsSingle, Case::VernorEngine]
            }
        }
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.client_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Case {
    ActiveAndEnabled,
    EnabledProperties,
    HasFuel,
    HasNoFuel,
    RcsBlock,
    RcsSingle,
    VernorEngine,
}

impl Case {
    pub fn name(&self) -> &'static str {
        match self {
            Case::ActiveAndEnabled => "active_and_enabled",
            Case::EnabledProperties => "enabled_properties",
            Case::HasFuel => "has_fuel",
            Case::HasNoFuel => "has_no_fuel",
            Case::RcsBlock => "rcs_block",
            Case::RcsSingle => "rcs_single",
            Case::VernorEngine => "vernor_engine",
        }
    }
}

impl Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug)]
pub struct CaseOutcome {
    pub case: Case,
    pub result: Result<(), Error>,
}

#[derive(Debug)]
pub struct Report {
    pub scenario: Scenario,
    pub outcomes: Vec<CaseOutcome>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn outcome(&self, case: Case) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.case == case)
    }
}

/// One scenario's connection and the vessel state the cases operate on.
pub struct RcsSuite {
    conn: Connection,
    scenario: Scenario,
    vessel: Vessel,
    control: Control,
    parts: Parts,
    references: ReferenceTable,
    settle: Duration,
}

impl RcsSuite {
    /// Connects and brings the game into the state the scenario expects.
    pub fn set_up(config: &Config, scenario: Scenario) -> Result<Self, Error> {
        let suite_config = &config.suite;

        let references = match &suite_config.reference_table {
            Some(path) => ReferenceTable::from_file(path)?,
            None => RCS_PARTS.clone(),
        };

        let conn = Connection::connect(&config.connection, scenario.client_name())?;
        let space_center = SpaceCenter::new(&conn);

        info!("Setting up {scenario}");

        let needs_launch = match scenario {
            Scenario::Reuse => {
                let active = space_center.active_vessel().and_then(|v| v.name());
                match active {
                    Ok(name) if name == suite_config.vessel => false,
                    Ok(name) => {
                        info!("Active vessel is '{name}', relaunching");
                        true
                    }
                    Err(e) => {
                        info!("No usable active vessel ({e}), relaunching");
                        true
                    }
                }
            }
            Scenario::SeaLevel | Scenario::Vacuum => true,
        };

        if needs_launch {
            new_save(&conn, suite_config)?;
            launch_vessel_from_vab(&conn, suite_config)?;
            TestingTools::new(&conn).remove_other_vessels()?;
        }

        if scenario == Scenario::Vacuum {
            TestingTools::new(&conn)
                .set_circular_orbit(&suite_config.orbit_body, suite_config.orbit_altitude_m)?;
        }

        let vessel = space_center.active_vessel()?;
        let control = vessel.control()?;
        let parts = vessel.parts()?;

        Ok(Self {
            conn,
            scenario,
            vessel,
            control,
            parts,
            references,
            settle: suite_config.settle_delay(),
        })
    }

    pub fn tear_down(self) -> Result<(), Error> {
        info!("Tearing down {}", self.scenario);
        Ok(self.conn.close()?)
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn vessel(&self) -> &Vessel {
        &self.vessel
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Waits for the simulation to apply the last change.
    pub fn settle(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }

    /// First RCS module whose part has the given title.
    pub fn get_rcs(&self, title: &str) -> Result<Rcs, Error> {
        for rcs in self.parts.rcs()? {
            if rcs.part()?.title()? == title {
                return Ok(rcs);
            }
        }

        Err(Error::PartNotFound(title.to_string()))
    }

    /// Enables or disables every resource container of the vessel.
    pub fn set_fuel_enabled(&self, value: bool) -> Result<(), Error> {
        self.set_resources_enabled(value)?;
        self.settle();

        Ok(())
    }

    /// Same as `set_fuel_enabled`, without settling afterwards.
    fn set_resources_enabled(&self, value: bool) -> Result<(), Error> {
        for resource in self.vessel.resources()?.all()? {
            resource.set_enabled(value)?;
        }

        Ok(())
    }

    pub fn run(&self) -> Report {
        let outcomes = self
            .scenario
            .cases()
            .iter()
            .map(|&case| {
                info!("{}::{case} ...", self.scenario);

                let result = self.run_case(case);
                match &result {
                    Ok(()) => info!("{}::{case} ok", self.scenario),
                    Err(e) => warn!("{}::{case} FAILED: {e}", self.scenario),
                }

                CaseOutcome { case, result }
            })
            .collect();

        Report {
            scenario: self.scenario,
            outcomes,
        }
    }
}

/// Sets up `scenario`, runs all its cases and tears it down again.
pub fn run_scenario(config: &Config, scenario: Scenario) -> Result<Report, Error> {
    let suite = RcsSuite::set_up(config, scenario)?;
    let report = suite.run();
    let report = keep_report(report, suite.tear_down());

    info!(
        "{scenario}: {} passed, {} failed",
        report.passed(),
        report.failed()
    );

    Ok(report)
}

/// The cases already ran, so a failed teardown is only logged.
fn keep_report(report: Report, teardown: Result<(), Error>) -> Report {
    if let Err(e) = teardown {
        warn!("Tearing down {} failed: {e}", report.scenario);
    }

    report
}
