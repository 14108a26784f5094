use crate::error::{config_error, env_error, BotResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::IpAddr;
use tracing::debug;
use url::Url;

/// Default activity text for the bot
pub const DEFAULT_ACTIVITY: &str = "Syncing the calendar";

/// Default GroupMe API base URL
pub const DEFAULT_GROUPME_API_URL: &str = "https://api.groupme.com/v3";

/// Default calendar sync interval in minutes
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 10;

/// Component toggles file, `name = true|false`
pub const COMPONENTS_FILE: &str = "config/components.toml";

/// Main configuration structure for the bot
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Discord guild ID (server) the bot manages
    pub guild_id: u64,
    /// Address the HTTP API binds to
    pub api_host: IpAddr,
    /// Port the HTTP API listens on
    pub api_port: u16,
    /// Bearer token required by the HTTP API, if any
    pub api_token: Option<String>,
    /// ICS feed to mirror into scheduled events
    pub calendar_ics_url: Option<String>,
    /// Minutes between calendar sync passes
    pub calendar_sync_interval_minutes: u64,
    /// Timezone for floating and all-day feed times
    pub timezone: Tz,
    /// GroupMe bot used for the relay
    pub groupme_bot_id: Option<String>,
    /// GroupMe API base URL
    pub groupme_api_url: String,
    /// Shared secret expected on GroupMe callbacks
    pub groupme_callback_token: Option<String>,
    /// Discord channel mirrored with GroupMe
    pub relay_channel_id: Option<u64>,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Bot activity status text
    pub activity: String,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;

        match fs::read_to_string(COMPONENTS_FILE) {
            Ok(content) => config.merge_components(&content)?,
            Err(e) => debug!("No {} loaded: {}", COMPONENTS_FILE, e),
        }

        Ok(config)
    }

    /// Apply `name = true|false` toggles over the defaults
    pub fn merge_components(&mut self, content: &str) -> BotResult<()> {
        let file_components: HashMap<String, bool> = toml::from_str(content)?;
        self.components.extend(file_components);
        Ok(())
    }

    /// Build the configuration from a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or_else(|| env_error("DISCORD_TOKEN"))?;

        let guild_id = get("GUILD_ID")
            .ok_or_else(|| env_error("GUILD_ID"))?
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| config_error("Invalid GUILD_ID format"))?;

        let api_host = match get("API_HOST") {
            Some(host) => host
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| config_error(&format!("Invalid API_HOST: {}", host)))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let api_port = match get("API_PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|_| config_error(&format!("Invalid API_PORT: {}", port)))?,
            None => 3000,
        };

        let calendar_sync_interval_minutes = match get("CALENDAR_SYNC_INTERVAL_MINUTES") {
            Some(minutes) => minutes
                .trim()
                .parse::<u64>()
                .map_err(|_| {
                    config_error(&format!("Invalid CALENDAR_SYNC_INTERVAL_MINUTES: {}", minutes))
                })?
                .max(1),
            None => DEFAULT_SYNC_INTERVAL_MINUTES,
        };

        let timezone_name = get("TIMEZONE").unwrap_or_else(|| String::from("UTC"));
        let timezone = timezone_name
            .trim()
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown TIMEZONE: {}", timezone_name)))?;

        let relay_channel_id = get("RELAY_CHANNEL_ID")
            .map(|id| {
                id.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .ok_or_else(|| config_error("Invalid RELAY_CHANNEL_ID format"))
            })
            .transpose()?;

        let groupme_api_url = get("GROUPME_API_URL")
            .unwrap_or_else(|| DEFAULT_GROUPME_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let calendar_ics_url = get("CALENDAR_ICS_URL")
            .map(|raw| {
                let raw = raw.trim().to_string();
                match Url::parse(&raw) {
                    Ok(url) if matches!(url.scheme(), "http" | "https" | "webcal") => Ok(raw),
                    _ => Err(config_error(&format!("Invalid CALENDAR_ICS_URL: {}", raw))),
                }
            })
            .transpose()?;

        if Url::parse(&groupme_api_url).is_err() {
            return Err(config_error(&format!(
                "Invalid GROUPME_API_URL: {}",
                groupme_api_url
            )));
        }

        let mut components = HashMap::new();
        components.insert("calendar_sync".to_string(), true);
        components.insert("groupme_relay".to_string(), true);

        Ok(Config {
            discord_token,
            guild_id,
            api_host,
            api_port,
            api_token: get("API_TOKEN"),
            calendar_ics_url,
            calendar_sync_interval_minutes,
            timezone,
            groupme_bot_id: get("GROUPME_BOT_ID"),
            groupme_api_url,
            groupme_callback_token: get("GROUPME_CALLBACK_TOKEN"),
            relay_channel_id,
            components,
            activity: get("BOT_ACTIVITY").unwrap_or_else(|| String::from(DEFAULT_ACTIVITY)),
        })
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }

    /// Whether the GroupMe relay has everything it needs
    pub fn relay_configured(&self) -> bool {
        self.groupme_bot_id.is_some() && self.relay_channel_id.is_some()
    }
}
