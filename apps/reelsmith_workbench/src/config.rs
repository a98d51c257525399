use anyhow::{bail, Context};
use reelsmith_core::types::{ArrangeSettings, SourceRef, MIN_CLIP_DURATION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "REELSMITH_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub project_name: String,
    pub history_size: usize,
    pub session_path: PathBuf,
    pub generation_delay_ms: u64,
    pub arrange: ArrangeSettings,
    /// Placeholder pools for the mock generator. Empty keeps its built-ins.
    pub transition_assets: Vec<SourceRef>,
    pub footage_assets: Vec<SourceRef>,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            project_name: "Untitled".to_string(),
            history_size: 100,
            session_path: PathBuf::from("reelsmith-session.json"),
            generation_delay_ms: 3000,
            arrange: ArrangeSettings::default(),
            transition_assets: Vec::new(),
            footage_assets: Vec::new(),
        }
    }
}

impl WorkbenchConfig {
    /// Load from the file named by `REELSMITH_CONFIG`, or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let a = &self.arrange;
        if !(a.pixels_per_second > 0.0) {
            bail!("arrange.pixels_per_second must be positive");
        }
        if self.history_size == 0 {
            bail!("history_size must be at least 1");
        }
        for (name, start, max) in [
            ("clip", a.clip_start_duration_us, a.clip_max_duration_us),
            (
                "transition",
                a.transition_start_duration_us,
                a.transition_max_duration_us,
            ),
        ] {
            if start < MIN_CLIP_DURATION || start > max {
                bail!("{name} start duration {start} must lie in [{MIN_CLIP_DURATION}, {max}]");
            }
        }
        Ok(())
    }

    pub fn generation_delay(&self) -> Duration {
        Duration::from_millis(self.generation_delay_ms)
    }
}
