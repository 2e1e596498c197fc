use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::HooklineConfig;

const CONFIG_FILE: &str = "hookline.toml";

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// 加载配置，文件不存在时返回默认配置
    ///
    /// `HOOKLINE__ENGINE__ENABLED=false` style environment variables override
    /// scalar values from the file.
    pub fn load(&self) -> Result<HooklineConfig> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Ok(HooklineConfig::default());
        }

        let config = Config::builder()
            .add_source(File::new(
                config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ))
            .add_source(
                Environment::with_prefix("HOOKLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 从 TOML 字符串加载
    pub fn load_from_str(content: &str) -> Result<HooklineConfig> {
        Ok(toml::from_str(content)?)
    }

    /// 加载并验证配置
    pub fn load_validated(&self) -> Result<HooklineConfig> {
        let config = self.load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(config: &HooklineConfig) -> Result<()> {
        if config.engine.bus_capacity == 0 {
            return Err(anyhow!("bus_capacity must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for rule in &config.rules {
            if rule.name.trim().is_empty() {
                return Err(anyhow!("rule name cannot be empty"));
            }
            if rule.event.trim().is_empty() {
                return Err(anyhow!("rule {} has an empty event name", rule.name));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(anyhow!("duplicate rule name: {}", rule.name));
            }
        }

        Ok(())
    }
}
