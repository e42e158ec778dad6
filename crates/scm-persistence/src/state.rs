//! Position and profit snapshot.
//!
//! The snapshot is written to `<dir>/<instance_id>.json` through a temporary
//! file and a rename, so a crash mid-write leaves the previous snapshot
//! intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scm_position::{Position, ProfitStats};

use crate::{PersistenceError, PersistenceResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyState {
    pub position: Position,
    pub profit_stats: ProfitStats,
    pub saved_at: DateTime<Utc>,
}

impl StrategyState {
    pub fn new(position: Position, profit_stats: ProfitStats) -> Self {
        Self {
            position,
            profit_stats,
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    instance_id: String,
}

impl StateStore {
    /// Create the store, creating `dir` when missing.
    ///
    /// `instance_id` becomes the file name and may only contain ASCII
    /// alphanumerics, `-`, `_` and `:`.
    pub fn open(dir: impl AsRef<Path>, instance_id: &str) -> PersistenceResult<Self> {
        let valid = !instance_id.is_empty()
            && instance_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if !valid {
            return Err(PersistenceError::InvalidInstanceId(instance_id.to_string()));
        }

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            instance_id: instance_id.to_string(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.file_stem()))
    }

    fn file_stem(&self) -> String {
        self.instance_id.replace(':', "_")
    }

    /// Load the last snapshot, `None` when nothing was saved yet.
    pub fn load(&self) -> PersistenceResult<Option<StrategyState>> {
        let path = self.path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No saved strategy state");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let state: StrategyState = serde_json::from_str(&data)?;
        info!(
            path = %path.display(),
            base = %state.position.base,
            average_cost = %state.position.average_cost,
            saved_at = %state.saved_at,
            "Loaded strategy state"
        );
        Ok(Some(state))
    }

    pub fn save(&self, state: &StrategyState) -> PersistenceResult<()> {
        let path = self.path();
        let tmp = self.dir.join(format!("{}.json.tmp", self.file_stem()));

        let json = serde_json::to_vec_pretty(state)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), base = %state.position.base, "Saved strategy state");
        Ok(())
    }
}
