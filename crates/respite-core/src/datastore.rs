use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::plan::PlanBook;
use crate::session::Session;

/// On-disk planner state: the plan blob plus the session side file,
/// both plain JSON in the data directory. Saves replace whole files;
/// last write wins.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub plan_path: PathBuf,
    pub session_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let plan_path = data_dir.join("plan.json");
        let session_path = data_dir.join("session.json");

        info!(
            data_dir = %data_dir.display(),
            plan = %plan_path.display(),
            session = %session_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            plan_path,
            session_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_plan(&self) -> anyhow::Result<PlanBook> {
        let Some(raw) = self.raw_plan()? else {
            debug!("no plan blob yet; starting empty");
            return Ok(PlanBook::default());
        };
        parse_plan(&raw).with_context(|| format!("failed parsing {}", self.plan_path.display()))
    }

    /// The stored blob exactly as written, for byte-verbatim export.
    #[tracing::instrument(skip(self))]
    pub fn raw_plan(&self) -> anyhow::Result<Option<String>> {
        if !self.plan_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.plan_path)
            .with_context(|| format!("failed reading {}", self.plan_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, book), fields(days = book.day_count()))]
    pub fn save_plan(&self, book: &PlanBook) -> anyhow::Result<()> {
        save_json_atomic(&self.plan_path, book).context("failed to save plan.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_session(&self) -> anyhow::Result<Session> {
        if !self.session_path.exists() {
            return Ok(Session::default());
        }
        let raw = fs::read_to_string(&self.session_path)
            .with_context(|| format!("failed reading {}", self.session_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Session::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.session_path.display()))
    }

    #[tracing::instrument(skip(self, session))]
    pub fn save_session(&self, session: &Session) -> anyhow::Result<()> {
        save_json_atomic(&self.session_path, session).context("failed to save session.json")
    }

    /// Removes both files. The next open starts from scratch.
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        for path in [&self.plan_path, &self.session_path] {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("failed removing {}", path.display()))?;
            }
        }
        info!("cleared planner data");
        Ok(())
    }
}

/// Validates text as a plan blob without touching the store.
pub fn parse_plan(raw: &str) -> anyhow::Result<PlanBook> {
    serde_json::from_str(raw).map_err(|err| anyhow!("not a valid plan blob: {err}"))
}

#[tracing::instrument(skip(path, value))]
fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    debug!(file = %path.display(), "saving json atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string_pretty(value)?;
    writeln!(temp, "{serialized}")?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
