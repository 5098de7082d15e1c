//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`APP_SEARCH__PRIMARY_URL` sets `search.primary_url`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same layering as [`Config::load`], reading the TOML files from `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn search(&self) -> anyhow::Result<SearchSettings> {
        self.get("search")
    }

    pub fn data(&self) -> anyhow::Result<DataSettings> {
        self.get("data")
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let search = self.search()?;
        search.validate().map_err(|e| anyhow::anyhow!("{} ({} environment)", e, env))?;
        if matches!(env, "prod" | "production") && search.secondary_url.starts_with("http://") {
            return Err(anyhow::anyhow!("Prod config must reach the secondary service over https"));
        }
        Ok(())
    }
}

/// Whole-file shape, used only to seed figment with defaults.
#[derive(Debug, Default, Serialize)]
struct Settings {
    search: SearchSettings,
    data: DataSettings,
}

/// Tunables of the federated search layer (`[search]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub primary_url: String,
    pub secondary_url: String,
    pub books_timeout_ms: u64,
    pub secondary_version: String,
    pub secondary_owned_category: String,
    pub synthetic_date_base: f64,
    pub pivot_tolerance: f64,
    pub fuzzy_slop: u32,
    pub default_size: usize,
    pub cache_capacity: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            primary_url: "https://www.sefaria.org/api/search-wrapper".to_string(),
            secondary_url: "https://sefaria.loadbalancer.dicta.org.il".to_string(),
            books_timeout_ms: 3000,
            secondary_version: "Tanach with Ta'amei Hamikra".to_string(),
            secondary_owned_category: "Tanakh".to_string(),
            synthetic_date_base: -10000.0,
            pivot_tolerance: 1e-3,
            fuzzy_slop: 10,
            default_size: 10,
            cache_capacity: 256,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        if self.primary_url.is_empty() || self.secondary_url.is_empty() {
            return Err(Error::InvalidConfig("backend URLs must not be empty".into()));
        }
        if self.books_timeout_ms == 0 {
            return Err(Error::InvalidConfig("books_timeout_ms must be positive".into()));
        }
        if self.pivot_tolerance.is_nan() || self.pivot_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!("pivot_tolerance must be >= 0, got {}", self.pivot_tolerance)));
        }
        if self.default_size == 0 {
            return Err(Error::InvalidConfig("default_size must be positive".into()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidConfig("cache_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Local data files (`[data]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSettings {
    pub toc_path: String,
}

impl Default for DataSettings {
    fn default() -> Self { Self { toc_path: "data/search_toc.json".to_string() } }
}

impl DataSettings {
    pub fn toc_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.toc_path) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
