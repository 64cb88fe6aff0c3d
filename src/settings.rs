use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which remote sink the sync driver writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// Log and succeed after a fixed latency
    #[default]
    Simulated,
    /// JSON over HTTP against `remote_endpoint`
    Http,
}

impl RemoteKind {
    pub fn as_str(&self) -> &str {
        match self {
            RemoteKind::Simulated => "simulated",
            RemoteKind::Http => "http",
        }
    }
}

impl std::str::FromStr for RemoteKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(RemoteKind::Simulated),
            "http" => Ok(RemoteKind::Http),
            other => bail!("Unknown remote kind '{other}' (expected simulated or http)"),
        }
    }
}

/// Persistent settings for the sync driver, cache and tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Failed attempts after which an operation is marked failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Default TTL for cache writes, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Interval between background flushes, in seconds
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Daily hydration goal in liters
    #[serde(default = "default_hydration_goal")]
    pub hydration_goal_liters: f64,

    /// Remote sink used by the sync driver
    #[serde(default)]
    pub remote: RemoteKind,

    /// Base URL for the HTTP remote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<String>,

    /// Bearer token sent to the HTTP remote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_token: Option<String>,

    /// Latency of the simulated remote, in milliseconds
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,

    /// Override for the generative-language endpoint used by the coach
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_endpoint: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_cache_ttl_secs() -> u64 {
    5 * 60
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_hydration_goal() -> f64 {
    2.5
}

fn default_simulated_latency_ms() -> u64 {
    500
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_retries: default_max_retries(),
            cache_ttl_secs: default_cache_ttl_secs(),
            flush_interval_secs: default_flush_interval_secs(),
            hydration_goal_liters: default_hydration_goal(),
            remote: RemoteKind::default(),
            remote_endpoint: None,
            remote_token: None,
            simulated_latency_ms: default_simulated_latency_ms(),
            coach_endpoint: None,
        }
    }
}

impl SyncSettings {
    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: SyncSettings =
            toml::from_str(&content).context("Failed to parse config file")?;
        settings.validate()?;

        Ok(settings)
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    /// Save settings to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn settings_path() -> Result<PathBuf> {
        crate::config::ConfigManager::settings_path()
    }

    /// Reject settings the driver cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            bail!("max_retries must be at least 1");
        }
        if self.flush_interval_secs == 0 {
            bail!("flush_interval_secs must be at least 1");
        }
        if !(self.hydration_goal_liters.is_finite() && self.hydration_goal_liters > 0.0) {
            bail!("hydration_goal_liters must be a positive number");
        }
        if self.remote == RemoteKind::Http && self.remote_endpoint.is_none() {
            bail!("remote = \"http\" requires remote_endpoint");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

/// Individual changes requested through `vitality-sync config`
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub max_retries: Option<u32>,
    pub cache_ttl_secs: Option<u64>,
    pub flush_interval_secs: Option<u64>,
    pub hydration_goal_liters: Option<f64>,
    pub remote: Option<RemoteKind>,
    pub remote_endpoint: Option<String>,
    pub remote_token: Option<String>,
    pub simulated_latency_ms: Option<u64>,
    pub coach_endpoint: Option<String>,
}

impl SettingsUpdate {
    /// Apply every set field, returning a description of each change
    pub fn apply(self, settings: &mut SyncSettings) -> Vec<String> {
        let mut changes = Vec::new();

        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
            changes.push(format!("Set max_retries to {retries}"));
        }
        if let Some(ttl) = self.cache_ttl_secs {
            settings.cache_ttl_secs = ttl;
            changes.push(format!("Set cache_ttl_secs to {ttl}"));
        }
        if let Some(interval) = self.flush_interval_secs {
            settings.flush_interval_secs = interval;
            changes.push(format!("Set flush_interval_secs to {interval}"));
        }
        if let Some(goal) = self.hydration_goal_liters {
            settings.hydration_goal_liters = goal;
            changes.push(format!("Set hydration_goal_liters to {goal}"));
        }
        if let Some(remote) = self.remote {
            settings.remote = remote;
            changes.push(format!("Set remote to {}", remote.as_str()));
        }
        if let Some(endpoint) = self.remote_endpoint {
            changes.push(format!("Set remote_endpoint to {endpoint}"));
            settings.remote_endpoint = Some(endpoint);
        }
        if let Some(token) = self.remote_token {
            settings.remote_token = Some(token);
            changes.push("Set remote_token".to_string());
        }
        if let Some(latency) = self.simulated_latency_ms {
            settings.simulated_latency_ms = latency;
            changes.push(format!("Set simulated_latency_ms to {latency}"));
        }
        if let Some(endpoint) = self.coach_endpoint {
            changes.push(format!("Set coach_endpoint to {endpoint}"));
            settings.coach_endpoint = Some(endpoint);
        }

        changes
    }
}

/// Update the persisted settings
pub fn update_config(update: SettingsUpdate) -> Result<()> {
    let mut settings = SyncSettings::load()?;

    let changes = update.apply(&mut settings);
    if changes.is_empty() {
        println!("{}", "No settings given. Configuration unchanged.".yellow());
        return Ok(());
    }

    for change in &changes {
        println!("{}", change.green());
    }

    settings.save()?;
    println!("{}", "Configuration saved successfully!".green().bold());

    Ok(())
}

/// Show the current settings
pub fn show_config() -> Result<()> {
    let settings = SyncSettings::load()?;

    println!("{}", "Current Configuration:".bold());
    println!("  {}: {}", "Max retries".cyan(), settings.max_retries);
    println!("  {}: {}s", "Cache TTL".cyan(), settings.cache_ttl_secs);
    println!(
        "  {}: {}s",
        "Flush interval".cyan(),
        settings.flush_interval_secs
    );
    println!(
        "  {}: {} L",
        "Hydration goal".cyan(),
        settings.hydration_goal_liters
    );
    println!("  {}: {}", "Remote".cyan(), settings.remote.as_str());
    println!(
        "  {}: {}",
        "Remote endpoint".cyan(),
        settings
            .remote_endpoint
            .as_deref()
            .unwrap_or("Not set")
    );
    println!(
        "  {}: {}",
        "Remote token".cyan(),
        if settings.remote_token.is_some() {
            "Configured".green()
        } else {
            "Not set".yellow()
        }
    );
    println!(
        "  {}: {}ms",
        "Simulated latency".cyan(),
        settings.simulated_latency_ms
    );
    println!(
        "  {}: {}",
        "Coach endpoint".cyan(),
        settings
            .coach_endpoint
            .as_deref()
            .unwrap_or("Default")
    );

    Ok(())
}
