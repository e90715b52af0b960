use std::path::PathBuf;

/// Default request body cap: 16 MiB
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Runtime configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Directory uploaded spreadsheets are written to
    pub upload_folder: PathBuf,

    /// Directory served under `/static`
    pub static_dir: PathBuf,

    /// Location of the live graph document
    pub graph_path: PathBuf,

    /// Directory receiving graph backups on clear
    pub backup_dir: PathBuf,

    /// Maximum accepted request body, in bytes
    pub max_content_length: usize,

    /// Lowercased file extensions accepted for upload
    pub allowed_extensions: Vec<String>,

    /// Origins allowed by CORS; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_folder: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
            graph_path: PathBuf::from("static/data/graph_data.json"),
            backup_dir: PathBuf::from("backups"),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            allowed_extensions: split_list("xlsx,xls,csv"),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl AppConfig {
    /// Read the configuration from process environment variables
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key/value source
    ///
    /// # Examples
    /// ```
    /// use sheetscope::config::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|key| match key {
    ///     "PORT" => Some("8080".to_string()),
    ///     "ALLOWED_EXTENSIONS" => Some("CSV, xlsx".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.port, 8080);
    /// assert_eq!(config.allowed_extensions, vec!["csv", "xlsx"]);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            upload_folder: path("UPLOAD_FOLDER", defaults.upload_folder),
            static_dir: path("STATIC_DIR", defaults.static_dir),
            graph_path: path("GRAPH_PATH", defaults.graph_path),
            backup_dir: path("BACKUP_DIR", defaults.backup_dir),
            max_content_length: lookup("MAX_CONTENT_LENGTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_content_length),
            allowed_extensions: lookup("ALLOWED_EXTENSIONS")
                .map(|s| split_list(&s))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.allowed_extensions),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| split_list_keep_case(&s))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.cors_origins),
        }
    }

    /// Socket address string to bind to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    split_list_keep_case(raw)
        .into_iter()
        .map(|s| s.to_lowercase())
        .collect()
}

fn split_list_keep_case(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
