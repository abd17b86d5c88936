//! Configuration at ~/.config/vendo/config.toml
//!
//! Every key is optional. `VENDO_*` environment variables override the file
//! (`VENDO_TIMEZONE`, `VENDO_BUSY_CALENDARS=primary,team`,
//! `VENDO_COLORS__DONE=8`, ...).

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::color::ColorPalette;
use crate::error::{VendoError, VendoResult};
use crate::remote::Remote;
use crate::run::RunOptions;
use crate::scheduler::WorkingHours;

const DEFAULT_TIMEZONE: &str = "Europe/Warsaw";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendoConfig {
    /// IANA timezone working hours are expressed in
    pub timezone: String,
    /// Calendar holding the vendor tasks
    pub calendar_id: String,
    /// Calendars whose events count as busy time
    pub busy_calendars: Vec<String>,
    pub lookback_days: u32,
    pub lookahead_days: u32,
    pub freeze_days: u32,
    /// `HH:MM`
    pub work_day_start: String,
    /// `HH:MM`
    pub work_day_end: String,
    pub skip_weekends: bool,
    pub colors: ColorPalette,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub remote: Remote,
}

impl Default for VendoConfig {
    fn default() -> Self {
        VendoConfig {
            timezone: DEFAULT_TIMEZONE.into(),
            calendar_id: "primary".into(),
            busy_calendars: vec!["primary".into()],
            lookback_days: 10,
            lookahead_days: 20,
            freeze_days: 1,
            work_day_start: "08:00".into(),
            work_day_end: "16:00".into(),
            skip_weekends: false,
            colors: ColorPalette::default(),
            log_dir: None,
            remote: Remote::default(),
        }
    }
}

impl VendoConfig {
    pub fn config_path() -> VendoResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| VendoError::Config("Could not determine config directory".into()))?
            .join("vendo");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config from `path`, or from the default location.
    ///
    /// The default file is created with commented-out options on first use;
    /// an explicit path must exist.
    pub fn load(path: Option<&Path>) -> VendoResult<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => {
                let path = Self::config_path()?;
                if !path.exists() {
                    Self::create_default_config(&path)?;
                }
                (path, false)
            }
        };

        let config: VendoConfig = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix("VENDO")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("busy_calendars")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| VendoError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| VendoError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VendoResult<()> {
        self.tz()?;
        let hours = self.working_hours()?;
        if hours.start >= hours.end {
            return Err(VendoError::Config(format!(
                "work_day_start ({}) must be before work_day_end ({})",
                self.work_day_start, self.work_day_end
            )));
        }
        if self.calendar_id.is_empty() {
            return Err(VendoError::Config("calendar_id cannot be empty".into()));
        }
        Ok(())
    }

    pub fn tz(&self) -> VendoResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| VendoError::Config(format!("Unknown timezone '{}'", self.timezone)))
    }

    pub fn working_hours(&self) -> VendoResult<WorkingHours> {
        Ok(WorkingHours {
            start: parse_clock("work_day_start", &self.work_day_start)?,
            end: parse_clock("work_day_end", &self.work_day_end)?,
            skip_weekends: self.skip_weekends,
        })
    }

    /// Directory for run logs, with `~` expanded.
    pub fn log_dir(&self) -> VendoResult<PathBuf> {
        if let Some(dir) = &self.log_dir {
            return Ok(PathBuf::from(
                shellexpand::tilde(&dir.to_string_lossy()).into_owned(),
            ));
        }

        let state_dir = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
            .ok_or_else(|| VendoError::Config("Could not determine state directory".into()))?;
        Ok(state_dir.join("vendo").join("log"))
    }

    pub fn run_options(&self, dry_run: bool) -> VendoResult<RunOptions> {
        Ok(RunOptions {
            calendar_id: self.calendar_id.clone(),
            busy_calendars: self.busy_calendars.clone(),
            timezone: self.tz()?,
            working_hours: self.working_hours()?,
            lookback_days: self.lookback_days,
            lookahead_days: self.lookahead_days,
            freeze_days: self.freeze_days,
            palette: self.colors.clone(),
            dry_run,
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> VendoResult<()> {
        let contents = format!(
            "\
# vendo configuration

# Timezone working hours are expressed in:
# timezone = \"{DEFAULT_TIMEZONE}\"

# Calendar holding #vendo tasks, and calendars that count as busy time:
# calendar_id = \"primary\"
# busy_calendars = [\"primary\"]

# Days around today to read, and days around now in which placed tasks stay put:
# lookback_days = 10
# lookahead_days = 20
# freeze_days = 1

# Working day:
# work_day_start = \"08:00\"
# work_day_end = \"16:00\"
# skip_weekends = false

# Where run logs go:
# log_dir = \"~/.local/state/vendo/log\"

# Status colors (Google Calendar color ids):
# [colors]
# overdue = \"11\"
# done = \"8\"
# normal = \"5\"

# Provider binary (vendo-provider-<name>) and its settings:
# [remote]
# provider = \"google\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VendoError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| VendoError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn parse_clock(key: &str, value: &str) -> VendoResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| VendoError::Config(format!("{key} must look like HH:MM, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).expect("Should write config");
        (dir, path)
    }

    #[test]
    fn commented_default_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        VendoConfig::create_default_config(&path).expect("Should create default config");

        let config = VendoConfig::load(Some(path.as_path())).expect("Should load defaults");

        assert_eq!(config.timezone, "Europe/Warsaw");
        assert_eq!(config.busy_calendars, ["primary"]);
        assert_eq!(config.lookback_days, 10);
        assert_eq!(config.lookahead_days, 20);
        assert_eq!(config.colors, ColorPalette::default());
        assert_eq!(config.remote.provider.name(), "google");
        let hours = config.working_hours().unwrap();
        assert_eq!(hours, WorkingHours::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let (_dir, path) = write_config(
            r#"
timezone = "America/New_York"
busy_calendars = ["primary", "team@example.com"]
freeze_days = 0
work_day_start = "09:30"
skip_weekends = true

[colors]
done = "2"

[remote]
provider = "caldav"
caldav_url = "https://dav.example.com"
"#,
        );

        let config = VendoConfig::load(Some(path.as_path())).unwrap();
        let options = config.run_options(true).unwrap();

        assert_eq!(options.timezone, chrono_tz::America::New_York);
        assert_eq!(options.busy_calendars.len(), 2);
        assert_eq!(options.freeze_days, 0);
        assert_eq!(
            options.working_hours.start,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(options.working_hours.skip_weekends);
        assert_eq!(options.palette.done, "2");
        assert_eq!(options.palette.overdue, "11");
        assert!(options.dry_run);
        assert_eq!(config.remote.provider.name(), "caldav");
        assert!(config.remote.config.0.contains_key("caldav_url"));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let (_dir, path) = write_config("timezone = \"Mars/Olympus\"\n");
        assert!(matches!(VendoConfig::load(Some(path.as_path())), Err(VendoError::Config(_))));
    }

    #[test]
    fn inverted_working_day_is_rejected() {
        let (_dir, path) = write_config("work_day_start = \"17:00\"\nwork_day_end = \"09:00\"\n");
        assert!(matches!(VendoConfig::load(Some(path.as_path())), Err(VendoError::Config(_))));
    }

    #[test]
    fn negative_day_count_is_rejected() {
        let (_dir, path) = write_config("lookback_days = -1\n");
        assert!(matches!(VendoConfig::load(Some(path.as_path())), Err(VendoError::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VendoConfig::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }

    #[test]
    fn log_dir_expands_tilde() {
        let config = VendoConfig {
            log_dir: Some(PathBuf::from("~/vendo-logs")),
            ..VendoConfig::default()
        };
        let dir = config.log_dir().unwrap();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with("vendo-logs"));
    }
}
