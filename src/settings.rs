use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierConfig, DatePattern, DEFAULT_NOISE_TERMS};
use crate::error::{Result, SpendscanError};
use crate::importer::ImportConfig;
use crate::pairing::{PairingConfig, DEFAULT_CREDIT_KEYWORDS, DEFAULT_MAX_DESCRIPTION_LINES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_account")]
    pub default_account: String,
    #[serde(default = "default_max_description_lines")]
    pub max_description_lines: usize,
    #[serde(default = "default_credit_keywords")]
    pub credit_keywords: Vec<String>,
    #[serde(default = "default_noise_terms")]
    pub noise_terms: Vec<String>,
    #[serde(default = "default_date_patterns")]
    pub date_patterns: Vec<DatePattern>,
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_account() -> String {
    "Cash".to_string()
}

fn default_max_description_lines() -> usize {
    DEFAULT_MAX_DESCRIPTION_LINES
}

fn default_credit_keywords() -> Vec<String> {
    DEFAULT_CREDIT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_noise_terms() -> Vec<String> {
    DEFAULT_NOISE_TERMS.iter().map(|t| t.to_string()).collect()
}

fn default_date_patterns() -> Vec<DatePattern> {
    DatePattern::ALL.to_vec()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            default_currency: default_currency(),
            default_account: default_account(),
            max_description_lines: default_max_description_lines(),
            credit_keywords: default_credit_keywords(),
            noise_terms: default_noise_terms(),
            date_patterns: default_date_patterns(),
        }
    }
}

impl Settings {
    /// Pipeline configuration derived from these settings.
    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            classifier: ClassifierConfig {
                date_patterns: self.date_patterns.clone(),
                noise_terms: self.noise_terms.iter().map(|t| t.to_lowercase()).collect(),
            },
            pairing: PairingConfig {
                // Zero would drop every description line.
                max_description_lines: self.max_description_lines.max(1),
                credit_keywords: self.credit_keywords.clone(),
                default_currency: self.default_currency.to_uppercase(),
            },
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("spendscan")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("spendscan")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SpendscanError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
