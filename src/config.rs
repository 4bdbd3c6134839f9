//! Configuration loading and data folder resolution
//!
//! Settings resolve in priority order: environment variable, then the TOML
//! config file, then a compiled default.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the HTTP server binds to
    pub port: u16,
    /// Data folder holding the database, media files and proctor frames
    pub data_dir: PathBuf,
    /// API key for the generative model backend
    pub gemini_api_key: String,
    /// Model identifier passed to the generative backend
    pub gemini_model: String,
    /// Number of resume-based questions per interview
    pub resume_questions: u32,
    /// Number of technical questions per interview
    pub technical_questions: u32,
    /// Number of HR/behavioral questions per interview
    pub hr_questions: u32,
}

/// Subset of fields readable from the TOML config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    data_dir: Option<String>,
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    resume_questions: Option<u32>,
    technical_questions: Option<u32>,
    hr_questions: Option<u32>,
}

impl Config {
    /// Resolve configuration from environment, config file, and defaults
    pub fn load() -> Result<Self> {
        let file = load_config_file().unwrap_or_default();

        let port = env_parse("HIREFLOW_PORT")?.or(file.port).unwrap_or(8000);

        let data_dir = std::env::var("HIREFLOW_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| file.data_dir.as_deref().map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        let gemini_api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .or(file.gemini_api_key)
            .unwrap_or_default();

        let gemini_model = std::env::var("HIREFLOW_GEMINI_MODEL")
            .ok()
            .or(file.gemini_model)
            .unwrap_or_else(|| "gemini-2.5-flash".to_string());

        let resume_questions = env_parse("RESUME_QUESTIONS_COUNT")?
            .or(file.resume_questions)
            .unwrap_or(2);
        let technical_questions = env_parse("TECHNICAL_QUESTIONS_COUNT")?
            .or(file.technical_questions)
            .unwrap_or(2);
        let hr_questions = env_parse("HR_QUESTIONS_COUNT")?
            .or(file.hr_questions)
            .unwrap_or(1);

        Ok(Config {
            port,
            data_dir,
            gemini_api_key,
            gemini_model,
            resume_questions,
            technical_questions,
            hr_questions,
        })
    }

    /// Total questions per interview under the configured type policy
    pub fn total_questions(&self) -> u32 {
        self.resume_questions + self.technical_questions + self.hr_questions
    }

    /// Path of the SQLite database inside the data folder
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("hireflow.db")
    }

    /// Folder for uploaded answer recordings
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    /// Folder for stored proctoring frames
    pub fn frames_dir(&self) -> PathBuf {
        self.data_dir.join("frames")
    }

    /// Create the data folder tree if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.media_dir())?;
        std::fs::create_dir_all(self.frames_dir())?;
        Ok(())
    }

    /// Minimal configuration for tests: everything under one temp folder
    pub fn for_tests(data_dir: PathBuf) -> Self {
        Config {
            port: 0,
            data_dir,
            gemini_api_key: String::new(),
            gemini_model: "test".to_string(),
            resume_questions: 2,
            technical_questions: 2,
            hr_questions: 1,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Read the platform config file if one exists
fn load_config_file() -> Option<FileConfig> {
    let path = config_file_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring malformed config file {}: {}", path.display(), e);
            None
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("hireflow").join("config.toml");
    path.exists().then_some(path)
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hireflow"))
        .unwrap_or_else(|| PathBuf::from("./hireflow_data"))
}
