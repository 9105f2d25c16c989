use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, WearError};
use crate::models::DEFAULT_BUCKET_WIDTH;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Part consumption-rate and durability reports from chassis usage records
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wear-report",
    about = "Part consumption-rate and durability reports from chassis usage records",
    version
)]
pub struct Settings {
    /// Part characteristics table (.csv, .json, .jsonl or .xlsx)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Chassis usage table (.csv, .json, .jsonl or .xlsx)
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Directory the two reports are written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Report file format
    #[arg(long, default_value = "csv", value_parser = ["csv", "json", "xlsx"])]
    pub format: String,

    /// Width of a hectare range bucket
    #[arg(long, default_value_t = DEFAULT_BUCKET_WIDTH, value_parser = clap::value_parser!(u64).range(1..))]
    pub bucket_width: u64,

    /// Only summarise parts whose code contains this text
    #[arg(long)]
    pub code: Option<String>,

    /// Only summarise parts of this family
    #[arg(long)]
    pub family: Option<String>,

    /// Only summarise parts with this proportion rule
    #[arg(long, value_parser = ["PerUnit", "PerLine"])]
    pub proportion: Option<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Save the table paths, output dir and format for later runs
    #[arg(long)]
    pub remember: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.wear-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".wear-report").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> std::result::Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the default config file if it exists.
    pub fn clear() -> std::result::Result<(), std::io::Error> {
        Self::clear_at(&Self::config_path())
    }

    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and fill in values not given on the command line
    /// from the saved configuration. The result is saved only with
    /// `--remember`.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit config path.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. Filters are never persisted.
        if !is_arg_explicitly_set(&matches, "catalog") && settings.catalog.is_none() {
            settings.catalog = last.catalog;
        }
        if !is_arg_explicitly_set(&matches, "ledger") && settings.ledger.is_none() {
            settings.ledger = last.ledger;
        }
        // NOTE: clap stores the arg id using the field name (underscores).
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }

        settings = Self::apply_debug(settings);

        if settings.remember {
            let params = LastUsedParams::from(&settings);
            if let Err(e) = params.save_to(config_path) {
                tracing::warn!("Could not save configuration to {}: {}", config_path.display(), e);
            }
        }

        settings
    }

    /// The catalog and ledger paths, or a configuration error naming the
    /// first one missing.
    pub fn input_paths(&self) -> Result<(&Path, &Path)> {
        let catalog = self
            .catalog
            .as_deref()
            .ok_or_else(|| WearError::Config("no catalog table given (--catalog)".to_string()))?;
        let ledger = self
            .ledger
            .as_deref()
            .ok_or_else(|| WearError::Config("no ledger table given (--ledger)".to_string()))?;
        Ok((catalog, ledger))
    }

    /// Whether any of the summary filters was given.
    pub fn has_filters(&self) -> bool {
        self.code.is_some() || self.family.is_some() || self.proportion.is_some()
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            catalog: s.catalog.clone(),
            ledger: s.ledger.clone(),
            output_dir: Some(s.output_dir.clone()),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
