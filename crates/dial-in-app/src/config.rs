//! Project configuration read from `.dial-in/config.toml`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use time::Duration;

/// Directory holding configuration and data, relative to the project root.
pub const CONFIG_DIR: &str = ".dial-in";
const CONFIG_FILE: &str = "config.toml";

/// Top-level project configuration loaded from `.dial-in/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// `[expansion]` table.
    #[serde(default)]
    pub expansion: ExpansionConfig,
    /// `[generation]` table.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// `[storage]` table.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ProjectConfig {
    /// Load configuration from the nearest ancestor of `cwd` that contains a
    /// `.dial-in` directory, falling back to defaults rooted at `cwd`.
    ///
    /// Returns the resolved project root alongside the configuration.
    pub fn load(cwd: impl AsRef<Path>) -> Result<(PathBuf, Self)> {
        let cwd = cwd.as_ref();
        let root = discover_root(cwd).unwrap_or_else(|| cwd.to_path_buf());
        let config = Self::from_workdir(&root)?;
        Ok((root, config))
    }

    /// Load configuration from a known project root.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        let config_path = workdir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Location of the data file for a project rooted at `workdir`.
    pub fn data_path(&self, workdir: impl AsRef<Path>) -> PathBuf {
        if self.storage.data_file.is_absolute() {
            return self.storage.data_file.clone();
        }
        workdir.as_ref().join(CONFIG_DIR).join(&self.storage.data_file)
    }

    fn validate(&self) -> Result<()> {
        self.expansion.validate()?;
        self.storage.validate()
    }
}

fn discover_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Bounds applied to expansion windows at the service boundary.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Largest window, in days, accepted by expand and generate requests.
    pub max_window_days: u32,
    /// Largest number of occurrences one request may return or materialize.
    pub max_occurrences: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_window_days: 366,
            max_occurrences: 1000,
        }
    }
}

impl ExpansionConfig {
    /// Maximum window length as a [`Duration`].
    #[must_use]
    pub fn max_window(&self) -> Duration {
        Duration::days(i64::from(self.max_window_days))
    }

    fn validate(&self) -> Result<()> {
        if self.max_window_days == 0 {
            bail!("expansion.max_window_days must be positive");
        }
        if self.max_occurrences == 0 {
            bail!("expansion.max_occurrences must be positive");
        }
        Ok(())
    }
}

/// Defaults used when rules are materialized into tasks and events.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Length of generated events; 0 leaves `end_time` unset.
    pub event_duration_minutes: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            event_duration_minutes: 60,
        }
    }
}

impl GenerationConfig {
    /// Duration of generated events, `None` when configured as zero.
    #[must_use]
    pub fn event_duration(&self) -> Option<Duration> {
        (self.event_duration_minutes > 0).then(|| Duration::minutes(i64::from(self.event_duration_minutes)))
    }
}

/// Location of the JSON data file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the data file; relative paths resolve inside `.dial-in/`.
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data.json"),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            bail!("storage.data_file must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> Result<()> {
        let cfg_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&cfg_dir)?;
        let mut file = fs::File::create(cfg_dir.join(CONFIG_FILE))?;
        writeln!(file, "{body}")?;
        Ok(())
    }

    #[test]
    fn missing_config_returns_defaults() -> Result<()> {
        let dir = tempdir()?;
        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.expansion.max_window_days, 366);
        assert_eq!(cfg.expansion.max_occurrences, 1000);
        assert_eq!(cfg.generation.event_duration(), Some(Duration::hours(1)));
        assert_eq!(
            cfg.data_path(dir.path()),
            dir.path().join(CONFIG_DIR).join("data.json")
        );
        Ok(())
    }

    #[test]
    fn load_config_with_all_sections() -> Result<()> {
        let dir = tempdir()?;
        write_config(
            dir.path(),
            "[expansion]\nmax_window_days = 31\nmax_occurrences = 50\n\n[generation]\nevent_duration_minutes = 0\n\n[storage]\ndata_file = \"planner.json\"",
        )?;

        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.expansion.max_window(), Duration::days(31));
        assert_eq!(cfg.expansion.max_occurrences, 50);
        assert!(cfg.generation.event_duration().is_none());
        assert!(cfg.data_path(dir.path()).ends_with("planner.json"));
        Ok(())
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[expansion]\nmax_occurrences = 10")?;
        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.expansion.max_window_days, 366);
        assert_eq!(cfg.expansion.max_occurrences, 10);
        Ok(())
    }

    #[test]
    fn zero_window_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[expansion]\nmax_window_days = 0")?;
        let Err(err) = ProjectConfig::from_workdir(dir.path()) else {
            panic!("zero window should error");
        };
        assert!(err.to_string().contains("max_window_days"));
        Ok(())
    }

    #[test]
    fn empty_data_file_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[storage]\ndata_file = \"\"")?;
        assert!(ProjectConfig::from_workdir(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn load_discovers_project_root_from_subdirectory() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[expansion]\nmax_window_days = 7")?;
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested)?;

        let (root, cfg) = ProjectConfig::load(&nested)?;
        assert_eq!(root, dir.path());
        assert_eq!(cfg.expansion.max_window_days, 7);
        Ok(())
    }
}
