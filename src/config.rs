use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::keywords::tfidf::TfIdfParams;
use crate::sentiment::controller::DEFAULT_BATCH_SIZE;
use crate::sentiment::device::DevicePreference;
use crate::sentiment::download::{self, DEFAULT_MODEL};
use crate::themes::lexicon::ThemeLexicon;

/// Default classifier sequence length, in tokens.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default; a value that is present but invalid is an error
/// naming the variable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Classifier model identifier (REVIEWLENS_MODEL)
    pub model: String,
    /// Directory containing model.onnx, tokenizer.json, config.json
    pub model_dir: PathBuf,
    pub batch_size: usize,
    pub max_length: usize,
    pub device: DevicePreference,
    /// Skip the model and score everything with the lexicon
    pub force_lexicon: bool,
    pub tfidf: TfIdfParams,
    /// JSON theme lexicon replacing the built-in one
    pub themes_path: Option<PathBuf>,
    pub db_path: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = get("REVIEWLENS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let model_dir = get("REVIEWLENS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| download::default_model_dir(&model));

        let batch_size = parse_var(get("REVIEWLENS_BATCH_SIZE"), "REVIEWLENS_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            anyhow::bail!("REVIEWLENS_BATCH_SIZE must be at least 1");
        }
        let max_length = parse_var(get("REVIEWLENS_MAX_LENGTH"), "REVIEWLENS_MAX_LENGTH", DEFAULT_MAX_LENGTH)?;
        if max_length == 0 {
            anyhow::bail!("REVIEWLENS_MAX_LENGTH must be at least 1");
        }

        let device = match get("REVIEWLENS_DEVICE") {
            Some(raw) => raw
                .parse::<DevicePreference>()
                .context("Invalid REVIEWLENS_DEVICE")?,
            None => DevicePreference::Auto,
        };

        let force_lexicon = match get("REVIEWLENS_FORCE_LEXICON") {
            Some(raw) => parse_flag(&raw).context("Invalid REVIEWLENS_FORCE_LEXICON")?,
            None => false,
        };

        let defaults = TfIdfParams::default();
        let tfidf = TfIdfParams {
            max_features: parse_var(
                get("REVIEWLENS_MAX_FEATURES"),
                "REVIEWLENS_MAX_FEATURES",
                defaults.max_features,
            )?,
            top_n: parse_var(get("REVIEWLENS_TOP_KEYWORDS"), "REVIEWLENS_TOP_KEYWORDS", defaults.top_n)?,
        };

        Ok(Self {
            model,
            model_dir,
            batch_size,
            max_length,
            device,
            force_lexicon,
            tfidf,
            themes_path: get("REVIEWLENS_THEMES").map(PathBuf::from),
            db_path: get("REVIEWLENS_DB_PATH").unwrap_or_else(|| "./reviewlens.db".to_string()),
        })
    }

    /// The configured theme lexicon, or the built-in one.
    pub fn theme_lexicon(&self) -> Result<ThemeLexicon> {
        match &self.themes_path {
            Some(path) => ThemeLexicon::from_json_file(path),
            None => Ok(ThemeLexicon::reference().clone()),
        }
    }

    /// Check that the model files are downloaded.
    /// Only `download-model` and `status` report on this; analysis falls back instead.
    pub fn model_present(&self) -> bool {
        download::model_files_present(&self.model_dir)
    }
}

fn parse_var(raw: Option<String>, name: &str, default: usize) -> Result<usize> {
    match raw {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{name} must be a non-negative integer, got {value:?}")),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected 1/true/yes or 0/false/no, got {other:?}"),
    }
}
