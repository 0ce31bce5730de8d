use std::{
    thread,
    time::{Duration, Instant},
};

use log::{debug, info};

use super::Error;
use crate::{
    config::SuiteConfig,
    krpc::Connection,
    space_center::{SpaceCenter, Vessel},
    testing_tools::{FixtureFiles, TestingTools},
};

const MIN_POLL: Duration = Duration::from_millis(10);

fn fixture_files(config: &SuiteConfig) -> Option<FixtureFiles> {
    match (&config.ksp_dir, &config.fixtures_dir) {
        (Some(ksp), Some(fixtures)) => Some(FixtureFiles::new(ksp, fixtures)),
        _ => None,
    }
}

/// Loads the test save, staging it from the fixtures first when configured.
pub fn new_save(conn: &Connection, config: &SuiteConfig) -> Result<(), Error> {
    if let Some(files) = fixture_files(config) {
        files
            .stage_save(&config.save_directory, &config.save_name)
            .map_err(Error::Staging)?;
    }

    TestingTools::new(conn).load_save(&config.save_directory, &config.save_name)?;

    Ok(())
}

/// Launches the test vessel and waits until it is the active vessel.
pub fn launch_vessel_from_vab(conn: &Connection, config: &SuiteConfig) -> Result<Vessel, Error> {
    if let Some(files) = fixture_files(config) {
        files
            .stage_craft(&config.save_directory, &config.vessel)
            .map_err(Error::Staging)?;
    }

    info!("Launching '{}' from the VAB", config.vessel);
    SpaceCenter::new(conn).launch_vessel_from_vab(&config.vessel)?;

    wait_for_vessel(
        conn,
        &config.vessel,
        config.settle_delay(),
        config.launch_timeout(),
    )
}

/// Polls the active vessel until it is named `name`. Errors while the game
/// is switching scenes count as "not yet".
pub fn wait_for_vessel(
    conn: &Connection,
    name: &str,
    poll: Duration,
    timeout: Duration,
) -> Result<Vessel, Error> {
    let space_center = SpaceCenter::new(conn);
    let start = Instant::now();

    loop {
        let active = space_center
            .active_vessel()
            .and_then(|vessel| vessel.name().map(|n| (vessel, n)));

        match active {
            Ok((vessel, active_name)) if active_name == name => return Ok(vessel),
            Ok((_, active_name)) => debug!("Active vessel is '{active_name}', waiting for '{name}'"),
            Err(e) => debug!("Active vessel not available yet: {e}"),
        }

        if start.elapsed() >= timeout {
            return Err(Error::LaunchTimeout {
                vessel: name.to_string(),
                timeout,
            });
        }

        thread::sleep(poll.max(MIN_POLL));
    }
}
