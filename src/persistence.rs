//! JSON cache directory for the engine state.
//!
//! A cache directory holds one file per cache:
//! - `intersection_points.json` - point coordinates, position = point index
//! - `already_compared.json` - route pairs already intersected
//! - `sections.json` - sections of every route
//! - `contiguous_section_combinations.json` - recorded combinations
//!
//! A missing file loads as an empty cache, which makes the next run
//! recompute it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use geo::Coord;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::RoutePair;
use crate::combinations::ContiguousSectionCombination;
use crate::error::Result;
use crate::sections::Section;

pub const INTERSECTION_POINTS_FILE: &str = "intersection_points.json";
pub const ALREADY_COMPARED_FILE: &str = "already_compared.json";
pub const SECTIONS_FILE: &str = "sections.json";
pub const COMBINATIONS_FILE: &str = "contiguous_section_combinations.json";

/// Serializable copy of the engine caches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub intersection_points: Vec<Coord<f64>>,
    pub already_compared: Vec<RoutePair>,
    pub sections: Vec<Section>,
    pub combinations: Vec<ContiguousSectionCombination>,
}

impl EngineSnapshot {
    pub fn is_empty(&self) -> bool {
        self.intersection_points.is_empty()
            && self.already_compared.is_empty()
            && self.sections.is_empty()
            && self.combinations.is_empty()
    }
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let temp_path = dir.join(format!("{}.tmp", name));

    let mut writer = BufWriter::new(File::create(&temp_path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    drop(writer);

    std::fs::rename(&temp_path, &path)?;
    debug!("[Persistence] Wrote {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned + Default>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    if !path.exists() {
        debug!("[Persistence] {} not found, starting empty", path.display());
        return Ok(T::default());
    }

    let reader = BufReader::new(File::open(&path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write every cache of the snapshot into `dir`, creating it if needed.
///
/// Each file is written to a temporary name first and renamed into place.
pub fn save_snapshot(dir: impl AsRef<Path>, snapshot: &EngineSnapshot) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    write_json(dir, INTERSECTION_POINTS_FILE, &snapshot.intersection_points)?;
    write_json(dir, ALREADY_COMPARED_FILE, &snapshot.already_compared)?;
    write_json(dir, SECTIONS_FILE, &snapshot.sections)?;
    write_json(dir, COMBINATIONS_FILE, &snapshot.combinations)?;

    info!(
        "[Persistence] Saved {} points, {} compared pairs, {} sections, {} combinations to {}",
        snapshot.intersection_points.len(),
        snapshot.already_compared.len(),
        snapshot.sections.len(),
        snapshot.combinations.len(),
        dir.display()
    );
    Ok(())
}

/// Read the caches stored in `dir`. Missing files yield empty caches.
pub fn load_snapshot(dir: impl AsRef<Path>) -> Result<EngineSnapshot> {
    let dir = dir.as_ref();
    let snapshot = EngineSnapshot {
        intersection_points: read_json(dir, INTERSECTION_POINTS_FILE)?,
        already_compared: read_json(dir, ALREADY_COMPARED_FILE)?,
        sections: read_json(dir, SECTIONS_FILE)?,
        combinations: read_json(dir, COMBINATIONS_FILE)?,
    };

    info!(
        "[Persistence] Loaded {} points, {} compared pairs, {} sections, {} combinations from {}",
        snapshot.intersection_points.len(),
        snapshot.already_compared.len(),
        snapshot.sections.len(),
        snapshot.combinations.len(),
        dir.display()
    );
    Ok(snapshot)
}
