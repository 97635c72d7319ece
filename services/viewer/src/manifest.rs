//! Scene manifest: the avatar entities a viewer renders.
//!
//! A manifest is a JSON list of entities:
//!
//! ```json
//! [{ "id": "avatar-1", "clips": ["idle", "wave"], "joints": ["mixamorig:Spine_02"], "loadDelayMs": 2000 }]
//! ```

use animus_core::{MemoryEntity, generator::DEFAULT_TARGET};
use std::{collections::HashSet, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Manifest {path} is not a valid entity list: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("Manifest {0} lists no entities")]
    Empty(String),
    #[error("Manifest lists entity '{0}' more than once")]
    DuplicateId(String),
}

/// The scene used when no manifest is given: one Mixamo-rigged avatar with
/// an idle and a wave clip, whose asset takes a moment to load.
pub fn default_entities() -> Vec<MemoryEntity> {
    vec![
        MemoryEntity::new(DEFAULT_TARGET)
            .with_clips(["idle", "wave"])
            .with_joints([
                "mixamorig:Hips",
                "mixamorig:Spine_02",
                "mixamorig:LeftArm",
                "mixamorig:LeftForeArm",
                "mixamorig:RightArm",
                "mixamorig:RightForeArm",
            ])
            .with_load_delay(500),
    ]
}

pub fn load(path: &Path) -> Result<Vec<MemoryEntity>, ManifestError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: display.clone(),
        source,
    })?;
    let entities: Vec<MemoryEntity> =
        serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: display.clone(),
            source,
        })?;

    if entities.is_empty() {
        return Err(ManifestError::Empty(display));
    }
    let mut seen = HashSet::new();
    for entity in &entities {
        if !seen.insert(entity.id.as_str()) {
            return Err(ManifestError::DuplicateId(entity.id.clone()));
        }
    }
    Ok(entities)
}
