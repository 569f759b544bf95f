//! Configuration management for rulegen.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.rulegen/config.yaml`), with `${VAR}` / `${VAR:default}`
//!   placeholders substituted from the environment
//! - Environment variables
//! - Command-line flags
//!
//! The resulting [`AppConfig`] is built once at startup and passed by
//! reference into every component constructor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Embedding providers understood by the knowledge crate.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["trigram", "ollama", "openai"];

/// Language-model providers understood by the llm crate.
pub const LLM_PROVIDERS: [&str; 3] = ["ollama", "openai", "mock"];

/// Vector index kinds (including the aliases used by older configs).
pub const VECTOR_STORE_KINDS: [&str; 4] = ["cosine", "in-memory", "flat-l2", "faiss"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .rulegen/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Vocabulary file (JSON with a `keys` array), relative to the workspace
    pub vocabulary_path: PathBuf,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Text or JSON log lines
    pub log_format: LogFormat,

    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub mapper: MapperConfig,
    pub rag: RagConfig,
    pub jsonlogic: ValidatorConfig,
    pub llm: LlmConfig,
}

/// Embedding provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint for HTTP providers
    pub endpoint: Option<String>,

    /// Environment variable holding the API key (HTTP providers)
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    /// Maximum batch size for embedding requests
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key_env: None,
            batch_size: 100,
        }
    }
}

/// Vector index selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// "cosine" (brute force) or "flat-l2"
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            kind: "cosine".to_string(),
        }
    }
}

/// Key mapper options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapperConfig {
    /// Minimum acceptable best-match score
    pub similarity_threshold: f32,

    /// Candidates considered per phrase and surfaced in miss suggestions
    pub top_k: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            top_k: 3,
        }
    }
}

/// Policy-document retrieval options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    pub enabled: bool,

    /// Policy document (or directory of `.md` files), relative to the workspace
    pub docs_path: PathBuf,

    pub top_k: usize,

    pub similarity_threshold: f32,

    /// Character budget per chunk
    pub chunk_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            docs_path: PathBuf::from("data/policy_docs.md"),
            top_k: 3,
            similarity_threshold: 0.5,
            chunk_size: 500,
        }
    }
}

/// Rule validator options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Maximum operator nesting before rejection
    pub max_depth: usize,

    /// Maximum serialized character length
    pub max_size: usize,

    /// Reserved for stricter checks; currently informational
    pub enable_strict_mode: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_size: 5000,
            enable_strict_mode: true,
        }
    }
}

/// Language-model client options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "ollama", "openai", "mock"
    pub provider: String,

    pub model: String,

    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Request timeout enforced by the HTTP client
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 30,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    vocabulary: Option<VocabularySection>,
    logging: Option<LoggingSection>,
    embedding: Option<EmbeddingConfig>,
    vector_store: Option<VectorStoreConfig>,
    mapper: Option<MapperConfig>,
    rag: Option<RagConfig>,
    jsonlogic: Option<ValidatorConfig>,
    llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabularySection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            vocabulary_path: PathBuf::from("data/sample_store_keys.json"),
            log_level: None,
            verbose: false,
            no_color: false,
            log_format: LogFormat::default(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            mapper: MapperConfig::default(),
            rag: RagConfig::default(),
            jsonlogic: ValidatorConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment and the default locations.
    ///
    /// Equivalent to `load_from(None, None)`.
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, optionally pinning the workspace and config file.
    ///
    /// Environment variables:
    /// - `RULEGEN_WORKSPACE`, `RULEGEN_CONFIG`: locations (when not pinned)
    /// - `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`
    /// - `VECTOR_STORE_TYPE`
    /// - `SIMILARITY_THRESHOLD`, `SIMILARITY_TOP_K`, `RAG_TOP_K`
    /// - `LLM_PROVIDER`, `LLM_MODEL`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use rulegen_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("RULEGEN_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("RULEGEN_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.rulegen_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        } else {
            tracing::debug!("No config file at {:?}, using defaults", config_path);
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::info!("Configuration loaded from {:?}", path);
        Ok(result)
    }

    fn merge_yaml_str(&mut self, contents: &str) -> AppResult<()> {
        let raw: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let file: ConfigFile = if raw.is_null() {
            ConfigFile::default()
        } else {
            serde_yaml::from_value(substitute_env_vars(raw))?
        };

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(path) = file.vocabulary.and_then(|v| v.path) {
            self.vocabulary_path = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = LogFormat::parse(&format)?;
            }
        }

        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(vector_store) = file.vector_store {
            self.vector_store = vector_store;
        }
        if let Some(mapper) = file.mapper {
            self.mapper = mapper;
        }
        if let Some(rag) = file.rag {
            self.rag = rag;
        }
        if let Some(jsonlogic) = file.jsonlogic {
            self.jsonlogic = jsonlogic;
        }
        if let Some(llm) = file.llm {
            self.llm = llm;
        }

        Ok(())
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(kind) = std::env::var("VECTOR_STORE_TYPE") {
            self.vector_store.kind = kind;
        }
        if let Some(threshold) = env_parse::<f32>("SIMILARITY_THRESHOLD")? {
            self.mapper.similarity_threshold = threshold;
        }
        if let Some(top_k) = env_parse::<usize>("SIMILARITY_TOP_K")? {
            self.mapper.top_k = top_k;
        }
        if let Some(top_k) = env_parse::<usize>("RAG_TOP_K")? {
            self.rag.top_k = top_k;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
        if self.log_level.is_none() {
            self.log_level = std::env::var("RUST_LOG").ok();
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
        if let Ok(format) = std::env::var("RULEGEN_LOG_FORMAT") {
            self.log_format = LogFormat::parse(&format)?;
        }
        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and YAML.
    pub fn with_overrides(mut self, log_level: Option<String>, verbose: bool, no_color: bool) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .rulegen directory.
    pub fn rulegen_dir(&self) -> PathBuf {
        self.workspace.join(".rulegen")
    }

    /// Resolve a workspace-relative path (absolute paths are returned as-is).
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Resolve the LLM API key from the configured environment variable.
    pub fn resolve_llm_api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    /// Resolve the embedding API key, falling back to the LLM key variable.
    pub fn resolve_embedding_api_key(&self) -> Option<String> {
        let var = self
            .embedding
            .api_key_env
            .as_deref()
            .unwrap_or(&self.llm.api_key_env);
        std::env::var(var).ok().filter(|key| !key.is_empty())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        check_known("embedding provider", &self.embedding.provider, &EMBEDDING_PROVIDERS)?;
        check_known("LLM provider", &self.llm.provider, &LLM_PROVIDERS)?;
        check_known("vector store type", &self.vector_store.kind, &VECTOR_STORE_KINDS)?;

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        check_unit_range("mapper.similarity_threshold", self.mapper.similarity_threshold)?;
        check_unit_range("rag.similarity_threshold", self.rag.similarity_threshold)?;

        let positive = [
            ("mapper.top_k", self.mapper.top_k),
            ("rag.top_k", self.rag.top_k),
            ("rag.chunk_size", self.rag.chunk_size),
            ("jsonlogic.max_depth", self.jsonlogic.max_depth),
            ("jsonlogic.max_size", self.jsonlogic.max_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AppError::Config(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Recursively substitute `${VAR}` and `${VAR:default}` placeholders.
///
/// A substituted value is re-read as a YAML scalar so numeric and boolean
/// settings can come from the environment.
pub fn substitute_env_vars(value: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value;

    match value {
        Value::String(s) => match placeholder(&s) {
            Some((name, default)) => {
                let resolved = std::env::var(name)
                    .ok()
                    .or_else(|| default.map(str::to_string))
                    .unwrap_or_default();
                match serde_yaml::from_str::<Value>(&resolved) {
                    Ok(scalar @ (Value::Bool(_) | Value::Number(_))) => scalar,
                    _ => Value::String(resolved),
                }
            }
            None => Value::String(s),
        },
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, substitute_env_vars(v)))
                .collect(),
        ),
        Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(substitute_env_vars).collect())
        }
        other => other,
    }
}

fn placeholder(s: &str) -> Option<(&str, Option<&str>)> {
    let spec = s.strip_prefix("${")?.strip_suffix('}')?;
    match spec.split_once(':') {
        Some((name, default)) => Some((name, Some(default))),
        None => Some((spec, None)),
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> AppResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("Invalid value for {}: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

fn check_unit_range(name: &str, value: f32) -> AppResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.vector_store.kind, "cosine");
        assert_eq!(config.mapper.similarity_threshold, 0.75);
        assert_eq!(config.mapper.top_k, 3);
        assert_eq!(config.rag.similarity_threshold, 0.5);
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.jsonlogic.max_depth, 10);
        assert_eq!(config.jsonlogic.max_size, 5000);
        assert!(config.jsonlogic.enable_strict_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_yaml_sections() {
        let mut config = AppConfig::default();
        config
            .merge_yaml_str(
                r#"
vector_store:
  type: flat-l2
mapper:
  similarity_threshold: 0.6
jsonlogic:
  max_depth: 4
logging:
  level: debug
  color: false
  format: json
"#,
            )
            .unwrap();

        assert_eq!(config.vector_store.kind, "flat-l2");
        assert_eq!(config.mapper.similarity_threshold, 0.6);
        // unspecified keys inside a section keep their defaults
        assert_eq!(config.mapper.top_k, 3);
        assert_eq!(config.jsonlogic.max_depth, 4);
        assert_eq!(config.jsonlogic.max_size, 5000);
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert!(config.no_color);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.merge_yaml_str("logging:\n  format: xml\n");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_empty_yaml() {
        let mut config = AppConfig::default();
        config.merge_yaml_str("").unwrap();
        assert_eq!(config.mapper, MapperConfig::default());
    }

    #[test]
    fn test_env_placeholder_substitution() {
        std::env::set_var("RULEGEN_TEST_TOP_K", "7");
        std::env::remove_var("RULEGEN_TEST_UNSET_MODEL");

        let mut config = AppConfig::default();
        config
            .merge_yaml_str(
                r#"
mapper:
  top_k: "${RULEGEN_TEST_TOP_K}"
llm:
  model: "${RULEGEN_TEST_UNSET_MODEL:gpt-4-turbo}"
"#,
            )
            .unwrap();

        assert_eq!(config.mapper.top_k, 7);
        assert_eq!(config.llm.model, "gpt-4-turbo");
    }

    #[test]
    fn test_placeholder_parsing() {
        assert_eq!(placeholder("${A}"), Some(("A", None)));
        assert_eq!(placeholder("${A:b:c}"), Some(("A", Some("b:c"))));
        assert_eq!(placeholder("plain"), None);
        assert_eq!(placeholder("${unterminated"), None);
    }

    #[test]
    fn test_load_from_workspace_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".rulegen")).unwrap();
        std::fs::write(
            temp.path().join(".rulegen/config.yaml"),
            "rag:\n  enabled: false\n  top_k: 5\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert!(!config.rag.enabled);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.rag.chunk_size, 500);
    }

    #[test]
    fn test_load_from_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(None, true, false);
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));

        let config = AppConfig::default().with_overrides(Some("warn".to_string()), true, true);
        assert_eq!(config.log_level, Some("warn".to_string()));
        assert!(config.no_color);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.mapper.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.jsonlogic.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.embedding.provider = "word2vec".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_resolve_path() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/rules");
        assert_eq!(
            config.resolve_path(Path::new("data/keys.json")),
            PathBuf::from("/srv/rules/data/keys.json")
        );
        assert_eq!(
            config.resolve_path(Path::new("/etc/keys.json")),
            PathBuf::from("/etc/keys.json")
        );
    }
}
