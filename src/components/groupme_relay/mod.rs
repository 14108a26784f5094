mod client;
pub mod format;

pub use client::GroupMeClient;
pub use format::{format_inbound, format_outbound, GroupMeCallback};

use crate::config::Config;
use crate::error::BotResult;
use crate::guild::GuildGateway;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Relay endpoints: the GroupMe bot and the mirrored Discord channel
#[derive(Debug, Clone)]
pub struct RelayHandle {
    groupme: GroupMeClient,
    channel_id: u64,
}

impl RelayHandle {
    pub fn new(groupme: GroupMeClient, channel_id: u64) -> Self {
        Self {
            groupme,
            channel_id,
        }
    }

    /// The mirrored Discord channel
    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    /// Send a Discord message to GroupMe. Returns whether anything was sent.
    pub async fn forward_to_groupme(
        &self,
        author: &str,
        content: &str,
        attachment_urls: &[String],
    ) -> BotResult<bool> {
        let Some(text) = format_outbound(author, content, attachment_urls) else {
            return Ok(false);
        };
        self.groupme.send(&text).await?;
        Ok(true)
    }

    /// Post a GroupMe callback to the Discord channel. Returns whether anything was posted.
    pub async fn forward_to_discord(
        &self,
        gateway: &dyn GuildGateway,
        callback: &GroupMeCallback,
    ) -> BotResult<bool> {
        let Some(text) = format_inbound(callback) else {
            debug!(
                "Ignoring GroupMe callback from {} ({})",
                callback.name, callback.sender_type
            );
            return Ok(false);
        };
        gateway.post_message(self.channel_id, &text).await?;
        Ok(true)
    }
}

/// Mirrors a Discord channel with a GroupMe group
#[derive(Default)]
pub struct GroupMeRelay {
    handle: RwLock<Option<RelayHandle>>,
}

impl GroupMeRelay {
    /// Create a new relay component
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle if the relay is configured
    pub async fn get_handle(&self) -> Option<RelayHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }

    /// Install the relay endpoints
    pub async fn set_handle(&self, handle: RelayHandle) {
        *self.handle.write().await = Some(handle);
    }

    /// Forward a gateway message if it was posted by a person in the relay channel
    pub async fn handle_message(&self, message: &serenity::Message) {
        let Some(handle) = self.get_handle().await else {
            return;
        };
        if message.author.bot || message.channel_id.get() != handle.channel_id() {
            return;
        }

        let author = message
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .or_else(|| message.author.global_name.clone())
            .unwrap_or_else(|| message.author.name.clone());
        let attachments: Vec<String> = message.attachments.iter().map(|a| a.url.clone()).collect();

        match handle
            .forward_to_groupme(&author, &message.content, &attachments)
            .await
        {
            Ok(true) => debug!("Relayed message {} to GroupMe", message.id),
            Ok(false) => {}
            Err(e) => error!("Failed to relay message {} to GroupMe: {}", message.id, e),
        }
    }
}

#[async_trait]
impl super::Component for GroupMeRelay {
    fn name(&self) -> &'static str {
        "groupme_relay"
    }

    async fn init(&self, _ctx: &serenity::Context, config: Arc<RwLock<Config>>) -> BotResult<()> {
        let config = config.read().await;
        let (Some(bot_id), Some(channel_id)) =
            (config.groupme_bot_id.clone(), config.relay_channel_id)
        else {
            warn!("GroupMe relay disabled: set GROUPME_BOT_ID and RELAY_CHANNEL_ID.");
            return Ok(());
        };

        let client = GroupMeClient::new(reqwest::Client::new(), &config.groupme_api_url, bot_id);
        self.set_handle(RelayHandle::new(client, channel_id)).await;
        info!("Relaying channel {} with GroupMe", channel_id);

        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        *self.handle.write().await = None;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
