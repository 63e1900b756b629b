use std::env;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Environment settings for the export worker.
///
/// Segment assignment arrives through the environment because the orchestrator that
/// fans out workers sets one SEGMENT per task.
#[derive(Debug)]
pub struct ExportConfig {
    pub bucket: String,
    pub table: String,
    pub total_segments: u32,
    pub segment: u32,
}

impl ExportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| env::var(name).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let bucket = require(&get, "BUCKET_NAME", &mut missing);
        let table = require(&get, "TABLE_NAME", &mut missing);
        let total_segments_raw = require(&get, "TOTAL_SEGMENTS", &mut missing);
        let segment_raw = require(&get, "SEGMENT", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let total_segments = parse_u32("TOTAL_SEGMENTS", &total_segments_raw)?;
        let segment = parse_u32("SEGMENT", &segment_raw)?;

        Ok(Self {
            bucket,
            table,
            total_segments,
            segment,
        })
    }
}

/// Environment settings for the import worker.
pub struct ImportConfig {
    pub bucket: String,
    pub table: String,
    /// Destination table region. The staging bucket keeps using ambient credentials'
    /// default region; only the table client is pinned.
    pub region: String,
    /// `None` when S3_KEYS is absent or blank, which the worker reports as nothing to
    /// import.
    pub stage_keys: Option<Vec<String>>,
}

impl ImportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| env::var(name).ok())
    }

    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let bucket = require(&get, "BUCKET_NAME", &mut missing);
        let table = require(&get, "TABLE_NAME", &mut missing);
        let region = require(&get, "REGION", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let stage_keys = get("S3_KEYS")
            .map(|raw| parse_stage_keys(&raw))
            .filter(|keys| !keys.is_empty());

        Ok(Self {
            bucket,
            table,
            region,
            stage_keys,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, name: &str, missing: &mut Vec<String>) -> String {
    match get(name) {
        Some(value) => value,
        None => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

fn parse_u32(name: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Comma-separated key list; surrounding whitespace and empty entries are dropped.
fn parse_stage_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
