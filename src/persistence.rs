//! On-disk state for host builds: `VehicleModel` persistence plus the
//! `AlarmFlags` temp flag files.
//!
//! Stores the model as JSON under `~/.vehicle-radio-router/model.json`
//! by default, following the same load-or-create/write-then-verify
//! pattern the teacher uses for identity persistence
//! (`persistence_host.rs`), adapted from a single binary blob to a
//! structured `serde_json` document since the model has many fields
//! that evolve independently.

use crate::model::VehicleModel;
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns `~/.vehicle-radio-router/model.json`.
pub fn default_model_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".vehicle-radio-router").join("model.json"))
}

/// Load the model from a specific path. Returns `None` if the file is
/// absent or cannot be parsed (the caller falls back to
/// `VehicleModel::empty`).
pub fn load_model_from(path: &Path) -> Option<VehicleModel> {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No vehicle model found at {:?}", path);
            return None;
        }
        Err(e) => {
            log::warn!("Failed to read vehicle model: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(model) => Some(model),
        Err(e) => {
            log::error!("Failed to parse stored vehicle model: {}", e);
            None
        }
    }
}

/// Save the model to a specific path, verifying the write by reading
/// it back and re-parsing it.
pub fn save_model_to(model: &VehicleModel, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(model)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, &json)?;

    let read_back = fs::read_to_string(path)?;
    let reparsed: VehicleModel = serde_json::from_str(&read_back)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if &reparsed != model {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "vehicle model verification failed: readback does not match what was written",
        ));
    }

    info!("Vehicle model saved to {:?}", path);
    Ok(())
}

/// Save to the default path.
pub fn save_model(model: &VehicleModel) -> io::Result<()> {
    let path = default_model_path()?;
    save_model_to(model, &path)
}

/// Load existing model from path, or create and persist an empty one
/// for the given vehicle id.
pub fn load_or_create_model_at(path: &Path, vehicle_id: u32) -> io::Result<VehicleModel> {
    if let Some(model) = load_model_from(path) {
        info!("Loaded existing vehicle model from {:?}", path);
        return Ok(model);
    }

    info!("Creating new vehicle model for vehicle id {}", vehicle_id);
    let model = VehicleModel::empty(vehicle_id);
    save_model_to(&model, path)?;
    Ok(model)
}

/// Load existing model or create a new one, both at the default path.
pub fn load_or_create_model(vehicle_id: u32) -> io::Result<VehicleModel> {
    let path = default_model_path()?;
    load_or_create_model_at(&path, vehicle_id)
}

/// Default directory for the temp flag files `AlarmFlags` writes.
pub fn default_flags_dir() -> PathBuf {
    std::env::temp_dir().join("vehicle-radio-router")
}

/// Temp flag files signalling external boolean state (spec §6 on-disk
/// state: "alarm on", "reinit in progress", "reinit requested"), the
/// same presence-of-a-file-means-true convention the teacher's
/// `host_utils` lock file uses for "a flash is in progress". A name is
/// "set" by creating an empty file and "cleared" by removing it, so any
/// external watcher can poll with a plain `stat`.
pub struct AlarmFlags {
    dir: PathBuf,
}

impl AlarmFlags {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn set(&self, name: &str, on: bool) {
        let path = self.dir.join(name);
        let result = if on {
            fs::create_dir_all(&self.dir).and_then(|_| fs::write(&path, b""))
        } else {
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            log::warn!("failed to update flag file {:?}: {}", path, e);
        }
    }

    pub fn set_alarm_on(&self, on: bool) {
        self.set("alarm_on", on);
    }

    pub fn set_reinit_in_progress(&self, on: bool) {
        self.set("reinit_in_progress", on);
    }

    pub fn set_reinit_requested(&self, on: bool) {
        self.set("reinit_requested", on);
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.dir.join(name).exists()
    }
}
