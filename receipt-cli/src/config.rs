use anyhow::{Context, Result, anyhow};
use receipt_client::extract::{DEFAULT_GEMINI_BASE, DEFAULT_MODEL};
use receipt_client::store::{DEFAULT_COLLECTION, DEFAULT_FIRESTORE_BASE};
use receipt_client::{ExtractionClient, FirestoreConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_receipt_home;

pub const NO_STORE_HINT: &str =
    "no record store configured; set [store] project_id to persist records";

/// Environment override for `[webhook] url`.
pub const WEBHOOK_URL_ENV: &str = "RECEIPT_WEBHOOK_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub webhook: WebhookSection,
    pub display: DisplaySection,
    pub extraction: ExtractionSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSection {
    /// Automation-service endpoint receiving the multipart upload.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// Used for records that do not carry their own currency.
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    pub enabled: bool,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Firestore project. Unset means records stay in memory.
    pub project_id: Option<String>,
    pub api_key_env: String,
    pub collection: String,
    pub base_url: String,
    pub recent_limit: usize,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 60,
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
        }
    }
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            project_id: None,
            api_key_env: "FIREBASE_API_KEY".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            base_url: DEFAULT_FIRESTORE_BASE.to_string(),
            recent_limit: 20,
        }
    }
}

impl Config {
    /// Endpoint precedence: flag, then `RECEIPT_WEBHOOK_URL`, then the file.
    pub fn webhook_url(
        &self,
        flag: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        flag.filter(|u| !u.trim().is_empty())
            .or_else(|| env(WEBHOOK_URL_ENV))
            .or_else(|| self.webhook.url.clone().filter(|u| !u.trim().is_empty()))
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook.timeout_secs.max(1))
    }

    /// Extraction client, when enabled and its key is present.
    pub fn extraction_client(&self, env: impl Fn(&str) -> Option<String>) -> Option<ExtractionClient> {
        let x = &self.extraction;
        if !x.enabled {
            return None;
        }
        let key = env(&x.api_key_env)?;
        Some(ExtractionClient::with_base_url(key, &x.model, &x.base_url))
    }

    /// Firestore settings, present only when a project is configured.
    pub fn firestore_config(&self, env: impl Fn(&str) -> Option<String>) -> Option<FirestoreConfig> {
        let s = &self.store;
        let project_id = s.project_id.clone().filter(|p| !p.trim().is_empty())?;
        Some(FirestoreConfig {
            project_id,
            api_key: env(&s.api_key_env),
            collection: s.collection.clone(),
            base_url: s.base_url.clone(),
        })
    }

    /// Firestore settings for commands that are useless without a
    /// persistent store.
    pub fn require_firestore(&self, env: impl Fn(&str) -> Option<String>) -> Result<FirestoreConfig> {
        self.firestore_config(env).ok_or_else(|| anyhow!(NO_STORE_HINT))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_receipt_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    println!("Next: set [webhook] url, or export {WEBHOOK_URL_ENV}");
    Ok(())
}

pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let cfg = load_config_from(&p)?;
    let source = if p.exists() { "file" } else { "defaults" };
    println!("# {} ({source})", p.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
