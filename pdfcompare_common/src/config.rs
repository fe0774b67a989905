use crate::{AppConfig, PdfCompareError};
use directories::ProjectDirs;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "pdfcompare.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PDFCOMPARE_CONFIG";

/// Where a config file path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Set through `PDFCOMPARE_CONFIG`
    Explicit,
    /// `pdfcompare.toml` next to the executable
    Portable,
    /// Platform config directory
    Platform,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn is_portable(&self) -> bool {
        self.source == ConfigSource::Portable
    }
}

/// Load the effective configuration.
///
/// `PDFCOMPARE_CONFIG` wins over everything; otherwise a portable file next to
/// the executable is used when it exists (or when `prefer_portable` is set),
/// and the platform config directory last.
pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, PdfCompareError> {
    let explicit = std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let (path, source) = resolve_config_path(prefer_portable, explicit)?;
    load_config_from(path, source)
}

/// Load and validate a config file; a missing file yields defaults
pub fn load_config_from(path: PathBuf, source: ConfigSource) -> Result<LoadedConfig, PdfCompareError> {
    let exists = path.exists();

    let mut config: AppConfig = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).map_err(|e| {
            PdfCompareError::Serialization(format!("{}: {}", path.display(), e))
        })?
    } else {
        AppConfig::default()
    };

    validate_config(&config)
        .map_err(|e| PdfCompareError::Config(format!("{}: {}", path.display(), e)))?;
    config.portable_mode = source == ConfigSource::Portable;

    Ok(LoadedConfig {
        config,
        path,
        exists,
        source,
    })
}

/// Reject values that parse but cannot drive a comparison
pub fn validate_config(config: &AppConfig) -> Result<(), String> {
    let cutoff = config.diff.intraline_cutoff;
    if !(0.0..=1.0).contains(&cutoff) {
        return Err(format!(
            "diff.intraline_cutoff must be between 0 and 1, got {}",
            cutoff
        ));
    }

    for (index, rule) in config.diff.regex_rules.iter().enumerate() {
        Regex::new(&rule.pattern).map_err(|e| {
            format!(
                "invalid regex '{}' in diff.regex_rules[{}]: {}",
                rule.pattern, index, e
            )
        })?;
    }

    Ok(())
}

pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, PdfCompareError> {
    let loaded = load_config(prefer_portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
    }
    Ok(loaded)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), PdfCompareError> {
    validate_config(config).map_err(PdfCompareError::Config)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| PdfCompareError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path(
    prefer_portable: bool,
    explicit: Option<PathBuf>,
) -> Result<(PathBuf, ConfigSource), PdfCompareError> {
    if let Some(path) = explicit {
        return Ok((path, ConfigSource::Explicit));
    }

    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, ConfigSource::Portable));
        }
    }

    let dirs = ProjectDirs::from("", "firent", "pdfcompare")
        .ok_or_else(|| PdfCompareError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), ConfigSource::Platform))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegexRuleConfig, ReportFormat, WhitespaceMode};
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded =
            load_config_from(temp.path().join(CONFIG_FILE_NAME), ConfigSource::Platform).unwrap();

        assert!(!loaded.exists);
        assert!(!loaded.is_portable());
        assert_eq!(loaded.config.diff, AppConfig::default().diff);
    }

    #[test]
    fn test_config_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.diff.ignore_case = true;
        config.diff.whitespace_mode = WhitespaceMode::IgnoreTrailing;
        config.diff.regex_rules.push(RegexRuleConfig {
            pattern: r"Page \d+".to_string(),
            replacement: "Page #".to_string(),
        });
        config.report.format = ReportFormat::Html;

        save_config(&path, &config).unwrap();
        let loaded = load_config_from(path, ConfigSource::Portable).unwrap();

        assert!(loaded.exists);
        assert!(loaded.config.portable_mode);
        assert_eq!(loaded.config.diff, config.diff);
        assert_eq!(loaded.config.report, config.report);
    }

    #[test]
    fn test_unknown_enum_value_is_a_serialization_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[diff]\nwhitespace_mode = \"sometimes\"\n").unwrap();

        let err = load_config_from(path, ConfigSource::Platform).unwrap_err();
        assert!(matches!(err, PdfCompareError::Serialization(_)));
    }

    #[test]
    fn test_invalid_regex_rule_rejected_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[diff]\n[[diff.regex_rules]]\npattern = \"Page \\\\d+\"\n[[diff.regex_rules]]\npattern = \"(unclosed\"\n",
        )
        .unwrap();

        match load_config_from(path, ConfigSource::Platform).unwrap_err() {
            PdfCompareError::Config(message) => {
                assert!(message.contains("invalid regex '(unclosed'"));
                assert!(message.contains("diff.regex_rules[1]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cutoff_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config.diff.intraline_cutoff = 1.5;
        assert!(validate_config(&config).is_err());

        config.diff.intraline_cutoff = f32::NAN;
        assert!(validate_config(&config).is_err());

        config.diff.intraline_cutoff = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_save_refuses_invalid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.diff.regex_rules.push(RegexRuleConfig {
            pattern: "[".to_string(),
            replacement: String::new(),
        });

        assert!(matches!(
            save_config(&path, &config),
            Err(PdfCompareError::Config(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("custom.toml");

        let (path, source) = resolve_config_path(true, Some(explicit.clone())).unwrap();

        assert_eq!(path, explicit);
        assert_eq!(source, ConfigSource::Explicit);
    }
}
