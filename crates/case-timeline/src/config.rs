//! Configuration for the timeline backend and the OCR service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::timeline::DateOrdering;

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "CASE_TIMELINE_CONFIG";

/// Main configuration shared by both binaries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Timeline backend HTTP server
    pub server: ServerConfig,
    /// Upload handling
    pub upload: UploadConfig,
    /// LLM endpoint
    pub llm: LlmConfig,
    /// OCR model client
    pub ocr: OcrConfig,
    /// OCR page service HTTP server
    pub ocr_server: OcrServerConfig,
    /// Content-addressed page cache
    pub cache: CacheConfig,
    /// Timeline ordering
    pub timeline: TimelineSettings,
}

/// Timeline backend server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable permissive CORS for the web client
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 10MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

/// How a multi-file upload reacts to a file that yields no text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Reject the whole batch; nothing is committed and stored files are removed
    #[default]
    AllOrNothing,
    /// Commit the files that succeeded and report the others
    BestEffort,
}

impl std::str::FromStr for BatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all_or_nothing" => Ok(Self::AllOrNothing),
            "best_effort" => Ok(Self::BestEffort),
            other => Err(Error::Config(format!("Unknown batch policy: {}", other))),
        }
    }
}

/// Upload handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory where uploaded files are stored
    pub upload_dir: PathBuf,
    /// Maximum number of files per upload request
    pub max_files: usize,
    /// Batch failure policy
    pub batch_policy: BatchPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_files: 10,
            batch_policy: BatchPolicy::AllOrNothing,
        }
    }
}

/// LLM endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Completion endpoint accepting `{prompt, n_predict}`
    pub endpoint: String,
    /// Token budget for event extraction
    pub n_predict: u32,
    /// Token budget for chat answers
    pub chat_n_predict: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (0 = no retry)
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/answer".to_string(),
            n_predict: 2048,
            chat_n_predict: 5000,
            timeout_secs: 300,
            max_retries: 0,
        }
    }
}

/// OCR model client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Use the OCR model for PDFs (otherwise only the text layer is read)
    pub enabled: bool,
    /// OCR model endpoint (a model server or the OCR page service `/parse`)
    pub model_url: String,
    /// Rendering resolution sent with each page (dpi)
    pub resolution: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum OCR page calls in flight
    pub max_concurrent_pages: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_url: "http://localhost:8503/predict".to_string(),
            resolution: 200,
            timeout_secs: 600,
            max_concurrent_pages: num_cpus::get().clamp(1, 4),
        }
    }
}

/// OCR page service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 16MB)
    pub max_upload_size: usize,
}

impl Default for OcrServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5003,
            max_upload_size: 16 * 1024 * 1024,
        }
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory; one subdirectory per content hash
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("case-timeline")
                .join("pages"),
        }
    }
}

/// Timeline ordering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    /// Event ordering strategy
    pub ordering: DateOrdering,
}

impl TimelineConfig {
    /// Load configuration: defaults, optional TOML file, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML configuration; missing sections keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(endpoint) = lookup("LLM_ENDPOINT_PATH") {
            self.llm.endpoint = endpoint;
        }
        if let Some(size) = lookup("LLM_CONTEXT_SIZE") {
            self.llm.n_predict = parse_var("LLM_CONTEXT_SIZE", &size)?;
        }
        if let Some(size) = lookup("CHAT_N_PREDICT") {
            self.llm.chat_n_predict = parse_var("CHAT_N_PREDICT", &size)?;
        }
        // OCR_MODEL_URL wins over the legacy parser endpoint name
        if let Some(url) = lookup("PDF_PARSER_ENDPOINT_PATH") {
            self.ocr.model_url = url;
        }
        if let Some(url) = lookup("OCR_MODEL_URL") {
            self.ocr.model_url = url;
        }
        if let Some(port) = lookup("OCR_PORT") {
            self.ocr_server.port = parse_var("OCR_PORT", &port)?;
        }
        if let Some(dir) = lookup("PAGE_CACHE_DIR") {
            self.cache.root = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.upload.upload_dir = PathBuf::from(dir);
        }
        if let Some(ordering) = lookup("TIMELINE_ORDERING") {
            self.timeline.ordering = ordering.parse()?;
        }
        if let Some(policy) = lookup("BATCH_POLICY") {
            self.upload.batch_policy = policy.parse()?;
        }
        Ok(())
    }

    /// Reject configurations the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.llm.endpoint.trim().is_empty() {
            return Err(Error::Config("llm.endpoint must not be empty".to_string()));
        }
        if self.ocr.enabled && self.ocr.model_url.trim().is_empty() {
            return Err(Error::Config(
                "ocr.model_url must be set when OCR is enabled".to_string(),
            ));
        }
        if self.ocr.max_concurrent_pages == 0 {
            return Err(Error::Config(
                "ocr.max_concurrent_pages must be at least 1".to_string(),
            ));
        }
        if self.upload.max_files == 0 {
            return Err(Error::Config("upload.max_files must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", name, value)))
}
