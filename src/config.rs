use crate::store;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pm";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub wallet_dir: PathBuf,
    pub wallet_default: String,
    pub password_length: usize,
    pub password_letter: bool,
    pub password_digit: bool,
    pub password_special: bool,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            wallet_dir: base.join(APP_DIR),
            wallet_default: "default".to_string(),
            password_length: 16,
            password_letter: true,
            password_digit: true,
            password_special: false,
        }
    }
}

impl Config {
    /// Читает конфиг; если файла нет — значения по умолчанию.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let s = serde_json::to_string_pretty(self)?;
        std::fs::write(path, s)
            .with_context(|| format!("cannot write config file {}", path.display()))?;
        Ok(())
    }

    /// Путь к файлу хранилища `<wallet_dir>/<name>.vault`.
    pub fn wallet_path(&self, name: &str) -> PathBuf {
        store::vault_path(&self.wallet_dir, name)
    }
}

/// `~/.config/pm/config.json` (или аналог для платформы).
pub fn config_path() -> anyhow::Result<PathBuf> {
    let mut dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("cannot get config dir"))?;
    dir.push(APP_DIR);
    Ok(dir.join("config.json"))
}
