use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::krpc::{codec::Encode, Connection, Error};

pub const SERVICE: &str = "TestingTools";

/// Game-state helpers exposed by the server's testing service.
#[derive(Debug, Clone)]
pub struct TestingTools {
    conn: Connection,
}

impl TestingTools {
    pub fn new(conn: &Connection) -> Self {
        Self { conn: conn.clone() }
    }

    /// Loads `saves/<directory>/<name>.sfs`
    pub fn load_save(&self, directory: &str, name: &str) -> Result<(), Error> {
        info!("Loading save '{directory}/{name}'");
        self.conn
            .call(SERVICE, "LoadSave", &[&directory as &dyn Encode, &name])
    }

    pub fn remove_other_vessels(&self) -> Result<(), Error> {
        debug!("Removing other vessels");
        self.conn.call(SERVICE, "RemoveOtherVessels", &[])
    }

    /// Puts the active vessel in a circular orbit `altitude` meters above `body`
    pub fn set_circular_orbit(&self, body: &str, altitude: f64) -> Result<(), Error> {
        info!("Setting circular orbit around {body} at {altitude:.0} m");
        self.conn
            .call(SERVICE, "SetCircularOrbit", &[&body as &dyn Encode, &altitude])
    }
}

/// Copies fixture saves and craft files into a KSP install before they are
/// loaded.
#[derive(Debug, Clone)]
pub struct FixtureFiles {
    ksp_dir: PathBuf,
    fixtures_dir: PathBuf,
}

impl FixtureFiles {
    pub fn new(ksp_dir: &Path, fixtures_dir: &Path) -> Self {
        Self {
            ksp_dir: ksp_dir.to_path_buf(),
            fixtures_dir: fixtures_dir.to_path_buf(),
        }
    }

    pub fn save_dir(&self, save_directory: &str) -> PathBuf {
        self.ksp_dir.join("saves").join(save_directory)
    }

    /// Copies `<fixtures>/<name>.sfs` to `<ksp>/saves/<save_directory>/`
    pub fn stage_save(&self, save_directory: &str, name: &str) -> std::io::Result<PathBuf> {
        let file = format!("{name}.sfs");
        self.copy(&file, &self.save_dir(save_directory))
    }

    /// Copies `<fixtures>/<vessel>.craft` to `<ksp>/saves/<save_directory>/Ships/VAB/`
    pub fn stage_craft(&self, save_directory: &str, vessel: &str) -> std::io::Result<PathBuf> {
        let file = format!("{vessel}.craft");
        let dest = self.save_dir(save_directory).join("Ships").join("VAB");
        self.copy(&file, &dest)
    }

    fn copy(&self, file: &str, dest_dir: &Path) -> std::io::Result<PathBuf> {
        let src = self.fixtures_dir.join(file);
        let dest = dest_dir.join(file);

        debug!("Staging '{}' -> '{}'", src.display(), dest.display());

        fs::create_dir_all(dest_dir)?;
        fs::copy(&src, &dest)?;

        Ok(dest)
    }
}
