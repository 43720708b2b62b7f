//! Configuration for restock.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (RESTOCK_HOME, RESTOCK_WORKBOOK)
//! 2. Config file (.restock/config.yaml)
//! 3. Defaults (~/.restock)
//!
//! Config file discovery:
//! - Searches current directory and parents for .restock/config.yaml
//! - Paths in config file are relative to the project root (the parent of .restock/)
//!
//! The resolved [`Settings`] value is passed explicitly to the coordinator;
//! nothing is cached process-wide.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const DEFAULT_PRODUCT_COUNT: usize = 6;
const DEFAULT_MARGIN: f64 = 0.10;
const DEFAULT_WINDOW: usize = 5;

/// Settings that cannot drive a run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("product_count must be at least 1")]
    NoProducts,

    #[error("window must be at least 1")]
    EmptyWindow,

    #[error("margin must be a finite, non-negative fraction (got {0})")]
    InvalidMargin(f64),

    #[error("table names must be non-empty and distinct")]
    InvalidTableNames,
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub forecast: Option<ForecastConfig>,
    #[serde(default)]
    pub tables: Option<TableNames>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory holding the run journal
    pub home: Option<String>,
    /// Workbook directory
    pub workbook: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    pub product_count: Option<usize>,
    pub margin: Option<f64>,
    pub window: Option<usize>,
}

/// Names of the three tables sharing the product column layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_sales_table")]
    pub sales: String,
    #[serde(default = "default_surplus_table")]
    pub surplus: String,
    #[serde(default = "default_stock_table")]
    pub stock: String,
}

fn default_sales_table() -> String {
    "sales".to_string()
}
fn default_surplus_table() -> String {
    "surplus".to_string()
}
fn default_stock_table() -> String {
    "stock".to_string()
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            sales: default_sales_table(),
            surplus: default_surplus_table(),
            stock: default_stock_table(),
        }
    }
}

impl TableNames {
    pub fn all(&self) -> [&str; 3] {
        [&self.sales, &self.surplus, &self.stock]
    }
}

/// Resolved settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Number of product columns in every record
    pub product_count: usize,
    /// Proportional buffer added to mean sales
    pub margin: f64,
    /// How many recent sales rows feed the forecast
    pub window: usize,
    /// Workbook directory
    pub workbook: PathBuf,
    /// Run journal file
    pub journal: PathBuf,
    /// Table names
    pub tables: TableNames,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Defaults rooted at `home`
    pub fn with_home(home: &Path) -> Self {
        Self {
            product_count: DEFAULT_PRODUCT_COUNT,
            margin: DEFAULT_MARGIN,
            window: DEFAULT_WINDOW,
            workbook: home.join("workbook"),
            journal: home.join("runs.jsonl"),
            tables: TableNames::default(),
            config_file: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.product_count == 0 {
            return Err(ConfigError::NoProducts);
        }
        if self.window == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::InvalidMargin(self.margin));
        }

        let [sales, surplus, stock] = self.tables.all();
        if sales.is_empty()
            || surplus.is_empty()
            || stock.is_empty()
            || sales == surplus
            || sales == stock
            || surplus == stock
        {
            return Err(ConfigError::InvalidTableNames);
        }

        Ok(())
    }

    /// Load settings from env vars, the discovered config file and defaults
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let settings = load_settings(find_config_file(&cwd), Env::from_process())?;
        settings.validate()?;

        debug!(
            workbook = %settings.workbook.display(),
            product_count = settings.product_count,
            window = settings.window,
            margin = settings.margin,
            "Loaded settings"
        );
        Ok(settings)
    }
}

/// Environment overrides, captured once so resolution stays testable
#[derive(Debug, Clone, Default)]
struct Env {
    home: Option<PathBuf>,
    workbook: Option<PathBuf>,
}

impl Env {
    fn from_process() -> Self {
        Self {
            home: std::env::var("RESTOCK_HOME").ok().map(PathBuf::from),
            workbook: std::env::var("RESTOCK_WORKBOOK").ok().map(PathBuf::from),
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".restock").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".restock"))
}

fn load_settings(config_file: Option<PathBuf>, env: Env) -> Result<Settings> {
    let Some(config_path) = config_file else {
        let home = match env.home {
            Some(home) => home,
            None => default_home()?,
        };
        let mut settings = Settings::with_home(&home);
        if let Some(workbook) = env.workbook {
            settings.workbook = workbook;
        }
        return Ok(settings);
    };

    let config = load_config_file(&config_path)?;

    // Project root is the parent of .restock/
    let base_dir = config_path
        .parent()
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let home = match (env.home, config.paths.home.as_deref()) {
        (Some(home), _) => home,
        (None, Some(home)) => resolve_path(&base_dir, home),
        (None, None) => default_home()?,
    };

    let mut settings = Settings::with_home(&home);

    settings.workbook = match (env.workbook, config.paths.workbook.as_deref()) {
        (Some(workbook), _) => workbook,
        (None, Some(workbook)) => resolve_path(&base_dir, workbook),
        (None, None) => settings.workbook,
    };

    if let Some(forecast) = config.forecast {
        settings.product_count = forecast.product_count.unwrap_or(settings.product_count);
        settings.margin = forecast.margin.unwrap_or(settings.margin);
        settings.window = forecast.window.unwrap_or(settings.window);
    }

    if let Some(tables) = config.tables {
        settings.tables = tables;
    }

    settings.config_file = Some(config_path);
    Ok(settings)
}
