//! Application configuration module / 应用配置模块
//!
//! Manages configuration loaded from estsearch.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::condition::SearchOptions;
use crate::database::OpenMode;
use crate::error::{Error, Result};
use crate::ffi::library::{default_crt_library, default_library_name};

/// Config file name in the working directory / 配置文件名
pub const CONFIG_FILE: &str = "estsearch.json";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine library configuration / 引擎库配置
    #[serde(default)]
    pub engine: EngineConfig,
    /// Database configuration / 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Search configuration / 搜索配置
    #[serde(default)]
    pub search: SearchConfig,
}

/// Engine library configuration / 引擎库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path or file name of the engine dynamic library / 动态库路径
    pub library: String,
    /// C runtime providing `free` for result arrays, null = linked runtime / 释放结果数组所用的 C 运行时
    #[serde(default = "default_crt")]
    pub crt_library: Option<String>,
}

fn default_crt() -> Option<String> {
    default_crt_library().map(str::to_string)
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Index directory / 索引目录
    pub path: String,
    /// Open without locking / 不加锁打开
    #[serde(default)]
    pub no_lock: bool,
    /// Fail instead of waiting for the lock / 非阻塞加锁
    #[serde(default)]
    pub lock_nonblocking: bool,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Option names applied to every search, e.g. ["union"] / 默认搜索选项
    #[serde(default)]
    pub options: Vec<String>,
    /// Maximum hits to print, 0 = unlimited / 最大输出条数
    #[serde(default)]
    pub max_results: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library: default_library_name().to_string(),
            crt_library: default_crt(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "casket".to_string(),
            no_lock: false,
            lock_nonblocking: false,
        }
    }
}

impl AppConfig {
    /// Open mode derived from the database section / 获取打开模式
    pub fn open_mode(&self) -> OpenMode {
        let mut mode = OpenMode::READER;
        if self.database.no_lock {
            mode = mode | OpenMode::NO_LOCK;
        }
        if self.database.lock_nonblocking {
            mode = mode | OpenMode::LOCK_NONBLOCKING;
        }
        mode
    }

    /// Parsed default search options / 解析默认搜索选项
    pub fn search_options(&self) -> std::result::Result<SearchOptions, crate::condition::UnknownOption> {
        SearchOptions::parse_list(&self.search.options)
    }

    /// Reject values that would only fail later / 校验配置
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.engine.library.trim().is_empty() {
            return Err(config_error(path, "engine.library is empty"));
        }
        if matches!(&self.engine.crt_library, Some(crt) if crt.trim().is_empty()) {
            return Err(config_error(path, "engine.crt_library is empty"));
        }
        if self.database.path.trim().is_empty() {
            return Err(config_error(path, "database.path is empty"));
        }
        self.search_options()
            .map_err(|e| config_error(path, &e.to_string()))?;
        Ok(())
    }
}

fn config_error(path: &Path, reason: &str) -> Error {
    Error::Config {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(CONFIG_FILE)
}

/// Load configuration from the working directory / 从工作目录加载配置
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&get_config_path())
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig> {
    if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(config_path)?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| config_error(config_path, &format!("failed to parse: {}", e)))?;
        config.validate(config_path)?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config_to(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config_to(config_path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| config_error(config_path, &format!("failed to serialize: {}", e)))?;

    std::fs::write(config_path, content)?;

    Ok(())
}
