use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .pycourserc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Defaults plus the given pairs, without reading the rc file or the environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: default_config_path() }
    }

    /// Override a value for this process (CLI flags).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from)
    }

    /// Comma separated list; `none` or an empty value yields an empty list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        let Some(raw) = self.get(key) else {
            return Vec::new();
        };
        if raw.trim().eq_ignore_ascii_case("none") {
            return Vec::new();
        }
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Seconds value where `0` means "no limit".
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        match self.get_u64(key) {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn python_path(&self) -> String {
        self.get("PYTHON_PATH").unwrap_or_else(|| "python3".into())
    }

    /// API key for the tutor endpoint. `API_KEY` wins over the provider-specific names.
    pub fn api_key(&self) -> Option<String> {
        ["API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .filter_map(|k| self.get(k))
            .find(|v| !v.trim().is_empty())
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or PYCOURSE_* for forward-compat
    const KEYS: &[&str] = &[
        "PYTHON_PATH",
        "PACKAGE_MANAGER",
        "PRELOAD_PACKAGES",
        "INSTALL_PACKAGES",
        "EXECUTION_TIMEOUT",
        "BOOTSTRAP_TIMEOUT",
        "AUTO_RETRY_BOOTSTRAP",
        "PRESERVE_PARTIAL_OUTPUT",
        "API_KEY",
        "GEMINI_API_KEY",
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "DEFAULT_MODEL",
        "IMAGE_MODEL",
        "REQUEST_TIMEOUT",
        "COURSE_PATH",
        "PRETTIFY_MARKDOWN",
        "LOG_FILTER",
    ];

    KEYS.contains(&k) || k.starts_with("PYCOURSE_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pycourse").join(".pycourserc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Interpreter
    m.insert("PYTHON_PATH".into(), "python3".into());
    m.insert("PACKAGE_MANAGER".into(), "pip".into());
    m.insert("PRELOAD_PACKAGES".into(), "pandas".into());
    m.insert("INSTALL_PACKAGES".into(), "openpyxl".into());

    // Numbers (seconds)
    m.insert("EXECUTION_TIMEOUT".into(), "30".into());
    m.insert("BOOTSTRAP_TIMEOUT".into(), "300".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());

    // Strings
    m.insert(
        "API_BASE_URL".into(),
        "https://generativelanguage.googleapis.com/v1beta/openai".into(),
    );
    m.insert("DEFAULT_MODEL".into(), "gemini-2.5-flash".into());
    m.insert("IMAGE_MODEL".into(), "imagen-3.0-generate-002".into());
    m.insert("LOG_FILTER".into(), "warn".into());

    // Bools as strings
    m.insert("AUTO_RETRY_BOOTSTRAP".into(), "false".into());
    m.insert("PRESERVE_PARTIAL_OUTPUT".into(), "true".into());
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
