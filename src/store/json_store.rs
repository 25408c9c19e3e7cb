use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::Config;
use crate::store::schema::{AttemptHistoryData, EXPORT_VERSION, ExportData};

const HISTORY_FILE: &str = "history.json";

pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examace");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Missing or unreadable files load as the default value.
    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if !path.exists() {
            return T::default();
        }
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable data file");
                T::default()
            }
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");
        write_synced(&tmp_path, &serde_json::to_string_pretty(data)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load_history(&self) -> AttemptHistoryData {
        let data: AttemptHistoryData = self.load(HISTORY_FILE);
        if data.needs_reset() {
            tracing::warn!(
                found = data.schema_version,
                "history schema version changed, starting fresh"
            );
            return AttemptHistoryData::default();
        }
        data
    }

    pub fn save_history(&self, data: &AttemptHistoryData) -> Result<()> {
        self.save(HISTORY_FILE, data)
    }

    pub fn export_all(&self, config: &Config) -> ExportData {
        ExportData {
            examace_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            config: config.clone(),
            history: self.load_history(),
        }
    }

    /// Replace local history with an export's. The previous file is kept as
    /// `.bak` until the new one is in place, and restored if the swap fails.
    /// The caller decides whether to adopt `data.config`.
    pub fn import_all(&self, data: &ExportData) -> Result<()> {
        if data.examace_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.examace_export_version,
                EXPORT_VERSION
            );
        }

        let final_path = self.file_path(HISTORY_FILE);
        let tmp_path = final_path.with_extension("json.tmp");
        let bak_path = final_path.with_extension("json.bak");

        let json = serde_json::to_string_pretty(&data.history)?;
        if let Err(e) = write_synced(&tmp_path, &json) {
            let _ = fs::remove_file(&tmp_path);
            bail!("Import failed during staging: {e}");
        }

        let had_original = final_path.exists();
        if had_original && let Err(e) = fs::rename(&final_path, &bak_path) {
            let _ = fs::remove_file(&tmp_path);
            bail!("Import failed during commit (backup): {e}");
        }

        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            if had_original {
                let _ = fs::rename(&bak_path, &final_path);
            }
            let _ = fs::remove_file(&tmp_path);
            bail!("Import failed during commit (rename): {e}");
        }

        if had_original {
            let _ = fs::remove_file(&bak_path);
        }
        Ok(())
    }

    /// Deal with a `.bak` left by an interrupted import. When the history
    /// file is gone the backup is the only copy, so it is moved back into
    /// place; otherwise the backup is stale and removed.
    pub fn check_interrupted_import(&self) -> Option<ImportLeftover> {
        let final_path = self.file_path(HISTORY_FILE);
        let bak_path = final_path.with_extension("json.bak");
        if !bak_path.exists() {
            return None;
        }
        if final_path.exists() {
            let _ = fs::remove_file(&bak_path);
            return Some(ImportLeftover::Discarded);
        }
        match fs::rename(&bak_path, &final_path) {
            Ok(()) => {
                let _ = fs::remove_file(final_path.with_extension("json.tmp"));
                Some(ImportLeftover::Restored)
            }
            Err(e) => {
                tracing::error!(path = %bak_path.display(), error = %e, "could not restore history backup");
                Some(ImportLeftover::Stranded)
            }
        }
    }
}

/// What `check_interrupted_import` did with a leftover backup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportLeftover {
    /// History was missing; the backup became the history file again.
    Restored,
    /// History was intact; the backup was deleted.
    Discarded,
    /// History was missing and the backup could not be moved back. It is
    /// left on disk untouched.
    Stranded,
}

fn write_synced(path: &Path, contents: &str) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
