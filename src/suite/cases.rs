use std::collections::BTreeMap;

use super::{Case, Error, RcsSuite};
use crate::{
    checks::{
        expect_close, expect_close_map, expect_eq, expect_flag, expect_same_names,
        DEFAULT_TOLERANCE,
    },
    fixtures::{Environment, RcsReference, LINEAR_PORT, THRUSTER_BLOCK, VERNOR},
    space_center::{Rcs, RcsFlag},
};

const THRUST_TOLERANCE: f64 = 1.0;
const ISP_TOLERANCE: f64 = 0.1;

impl RcsSuite {
    pub fn run_case(&self, case: Case) -> Result<(), Error> {
        match case {
            Case::ActiveAndEnabled => self.check_active_and_enabled(),
            Case::EnabledProperties => self.check_enabled_properties(),
            Case::HasFuel => self.check_has_fuel(),
            Case::HasNoFuel => self.check_has_no_fuel(),
            Case::RcsBlock => self.check_properties(&self.get_rcs(THRUSTER_BLOCK)?),
            Case::RcsSingle => self.check_properties(&self.get_rcs(LINEAR_PORT)?),
            Case::VernorEngine => self.check_properties(&self.get_rcs(VERNOR)?),
        }
    }

    /// Runs `body`, then `restore` whatever the outcome, then settles. The
    /// body's error wins over the restore's.
    fn restoring<T>(
        &self,
        body: impl FnOnce() -> Result<T, Error>,
        restore: impl FnOnce() -> Result<(), Error>,
    ) -> Result<T, Error> {
        let result = body();
        let restored = restore();
        self.settle();

        let value = result?;
        restored?;
        Ok(value)
    }

    /// With RCS on, the module must be active, fully enabled and match its
    /// reference figures for the scenario's environment.
    pub fn check_properties(&self, rcs: &Rcs) -> Result<(), Error> {
        let env = self
            .scenario
            .environment()
            .ok_or(Error::NoEnvironment(self.scenario))?;

        let title = rcs.part()?.title()?;
        let reference = self
            .references
            .get(&title)
            .ok_or_else(|| Error::MissingReference(title.clone()))?;

        self.control.set_rcs(true)?;
        self.settle();

        self.restoring(
            || check_reference(rcs, reference, env),
            || Ok(self.control.set_rcs(false)?),
        )
    }

    /// The module is active iff RCS is on and the module is enabled.
    pub fn check_active_and_enabled(&self) -> Result<(), Error> {
        let rcs = self.get_rcs(THRUSTER_BLOCK)?;

        self.restoring(
            || {
                self.control.set_rcs(true)?;
                rcs.set_enabled(true)?;
                self.settle();
                expect_flag("control.rcs", true, self.control.rcs()?)?;
                expect_flag("enabled", true, rcs.enabled()?)?;
                expect_flag("part.shielded", false, rcs.part()?.shielded()?)?;
                expect_flag("active", true, rcs.active()?)?;

                rcs.set_enabled(false)?;
                self.settle();
                expect_flag("enabled", false, rcs.enabled()?)?;
                expect_flag("active", false, rcs.active()?)?;

                rcs.set_enabled(true)?;
                self.settle();
                expect_flag("enabled", true, rcs.enabled()?)?;
                expect_flag("active", true, rcs.active()?)?;

                self.control.set_rcs(false)?;
                self.settle();
                expect_flag("active", false, rcs.active()?)?;

                Ok(())
            },
            || {
                rcs.set_enabled(true)?;
                Ok(self.control.set_rcs(false)?)
            },
        )
    }

    /// Clearing one switch leaves exactly that switch off.
    pub fn check_enabled_properties(&self) -> Result<(), Error> {
        let rcs = self.get_rcs(THRUSTER_BLOCK)?;

        let expect_all_except = |cleared: Option<RcsFlag>| -> Result<(), Error> {
            for flag in RcsFlag::ALL {
                expect_flag(&flag.to_string(), Some(flag) != cleared, rcs.flag(flag)?)?;
            }
            Ok(())
        };

        self.restoring(
            || {
                for flag in RcsFlag::ALL {
                    expect_all_except(None)?;

                    rcs.set_flag(flag, false)?;
                    self.settle();
                    expect_all_except(Some(flag))?;

                    rcs.set_flag(flag, true)?;
                    self.settle();
                    expect_all_except(None)?;
                }
                Ok(())
            },
            || {
                for flag in RcsFlag::ALL {
                    rcs.set_flag(flag, true)?;
                }
                Ok(())
            },
        )
    }

    pub fn check_has_fuel(&self) -> Result<(), Error> {
        let rcs = self.get_rcs(THRUSTER_BLOCK)?;
        expect_flag("has_fuel", true, rcs.has_fuel()?)?;
        Ok(())
    }

    /// With every resource container closed the module reports no fuel.
    pub fn check_has_no_fuel(&self) -> Result<(), Error> {
        let rcs = self.get_rcs(THRUSTER_BLOCK)?;

        self.restoring(
            || {
                self.set_fuel_enabled(false)?;
                expect_flag("has_fuel", false, rcs.has_fuel()?)?;
                Ok(())
            },
            || self.set_resources_enabled(true),
        )
    }
}

fn check_reference(rcs: &Rcs, reference: &RcsReference, env: Environment) -> Result<(), Error> {
    expect_flag("active", true, rcs.active()?)?;
    for flag in RcsFlag::AXES {
        expect_flag(&flag.to_string(), true, rcs.flag(flag)?)?;
    }

    let figures = reference.figures(env);

    expect_close(
        "max_thrust",
        figures.max_thrust,
        f64::from(rcs.max_thrust()?),
        THRUST_TOLERANCE,
    )?;
    expect_eq(
        "max_vacuum_thrust",
        reference.max_vac_thrust,
        f64::from(rcs.max_vacuum_thrust()?),
    )?;
    expect_eq("thrusters", reference.thrusters, rcs.thrusters()?.len())?;
    expect_close(
        "specific_impulse",
        figures.isp,
        f64::from(rcs.specific_impulse()?),
        ISP_TOLERANCE,
    )?;
    expect_eq(
        "vacuum_specific_impulse",
        reference.vac_isp,
        f64::from(rcs.vacuum_specific_impulse()?),
    )?;
    expect_eq(
        "kerbin_sea_level_specific_impulse",
        reference.msl_isp,
        f64::from(rcs.kerbin_sea_level_specific_impulse()?),
    )?;

    let names: Vec<String> = reference.propellants.keys().cloned().collect();
    expect_same_names("propellants", &names, &rcs.propellants()?)?;

    let ratios: BTreeMap<String, f64> = rcs
        .propellant_ratios()?
        .into_iter()
        .map(|(name, ratio)| (name, f64::from(ratio)))
        .collect();
    expect_close_map(
        "propellant_ratios",
        &reference.propellants,
        &ratios,
        DEFAULT_TOLERANCE,
    )?;

    expect_flag("has_fuel", true, rcs.has_fuel()?)?;

    Ok(())
}
