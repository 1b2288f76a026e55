// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use examdesk_app::{DEFAULT_DEBOUNCE, HistoryPolicy, PageSettings};
use log::LevelFilter;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "examdesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_API_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "warn";
const TOKEN_ENV: &str = "EXAMDESK_API_TOKEN";
const MAX_API_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const MAX_SEARCH_DEBOUNCE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub token: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_API_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_API_TIMEOUT.to_owned()),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub search_debounce: Option<String>,
    pub history: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            search_debounce: Some("300ms".to_owned()),
            history: Some(HistoryPolicy::default().as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("EXAMDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set EXAMDESK_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [api], [ui], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.api_base_url().is_empty() {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        for (name, value, max) in [
            ("api.timeout", &self.api.timeout, MAX_API_TIMEOUT),
            (
                "ui.search_debounce",
                &self.ui.search_debounce,
                MAX_SEARCH_DEBOUNCE,
            ),
        ] {
            if let Some(raw) = value {
                let parsed = parse_duration(raw)?;
                if parsed <= Duration::ZERO {
                    bail!(
                        "{name} in {} must be positive, got {raw}",
                        path.display()
                    );
                }
                if parsed > max {
                    bail!(
                        "{name} in {} must be at most {}s, got {raw}",
                        path.display(),
                        max.as_secs()
                    );
                }
            }
        }

        if let Some(history) = &self.ui.history
            && HistoryPolicy::parse(history).is_none()
        {
            bail!(
                "ui.history in {} must be one of push, replace, mixed; got {history:?}",
                path.display()
            );
        }

        if let Some(level) = &self.logging.level
            && level.parse::<LevelFilter>().is_err()
        {
            bail!(
                "logging.level in {} must be one of error, warn, info, debug, trace, off; got {level:?}",
                path.display()
            );
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim()
            .trim_end_matches('/')
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    pub fn api_token(&self) -> Option<String> {
        let present = |token: &String| !token.trim().is_empty();
        env::var(TOKEN_ENV)
            .ok()
            .filter(present)
            .or_else(|| self.api.token.clone().filter(present))
    }

    pub fn page_settings(&self) -> Result<PageSettings> {
        let debounce = match &self.ui.search_debounce {
            Some(raw) => parse_duration(raw)?,
            None => DEFAULT_DEBOUNCE,
        };
        let history = match &self.ui.history {
            Some(raw) => HistoryPolicy::parse(raw)
                .ok_or_else(|| anyhow!("unknown history policy {raw:?}"))?,
            None => HistoryPolicy::default(),
        };
        Ok(PageSettings { debounce, history })
    }

    pub fn log_level(&self) -> LevelFilter {
        self.logging
            .level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::Warn)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# examdesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# Prefer the {} environment variable over storing the token here.\n# token = \"\"\n\n[ui]\nsearch_debounce = \"300ms\"\n# push | replace | mixed\nhistory = \"mixed\"\n\n[logging]\n# error | warn | info | debug | trace | off\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            DEFAULT_API_TIMEOUT,
            TOKEN_ENV,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 300ms or 10s)")
}
