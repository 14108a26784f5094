use crate::error::{relay_error, BotResult};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

/// Body of a GroupMe bot post
#[derive(Debug, Serialize)]
struct BotPost<'a> {
    text: &'a str,
    bot_id: &'a str,
}

/// Client for posting as a GroupMe bot
#[derive(Debug, Clone)]
pub struct GroupMeClient {
    client: Client,
    api_url: String,
    bot_id: String,
}

impl GroupMeClient {
    /// Create a client for `bot_id` against the API at `api_url`
    pub fn new(client: Client, api_url: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_id: bot_id.into(),
        }
    }

    /// Post `text` to the bot's group
    pub async fn send(&self, text: &str) -> BotResult<()> {
        let url = format!("{}/bots/post", self.api_url);

        let response = self
            .client
            .post(&url)
            .json(&BotPost {
                text,
                bot_id: &self.bot_id,
            })
            .send()
            .await
            .map_err(|e| relay_error(&format!("Failed to post to GroupMe: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(relay_error(&format!(
                "Failed to post to GroupMe: HTTP {} - {}",
                status, error_body
            )));
        }

        debug!("Posted {} characters to GroupMe", text.chars().count());
        Ok(())
    }
}
