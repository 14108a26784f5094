//! Access to the managed guild over Discord's REST API.
//!
//! The HTTP API and the relay only need a handful of calls, collected in
//! [`GuildGateway`] so they can run against a fake in tests.

use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Name of the implicit role every member has
pub const EVERYONE_ROLE: &str = "@everyone";

/// Audit log reason attached to role changes
const AUDIT_REASON: &str = "Role change requested through the HTTP API";

/// A guild member, reduced to what the API reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: u64,
    pub username: String,
    /// `username#discriminator`, or the bare username for migrated accounts
    pub tag: String,
    pub display_name: String,
    pub role_ids: Vec<u64>,
}

impl MemberInfo {
    pub fn has_role(&self, role_id: u64) -> bool {
        self.role_ids.contains(&role_id)
    }
}

/// A guild role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleInfo {
    #[serde(serialize_with = "serialize_id")]
    pub id: u64,
    pub name: String,
    /// `#rrggbb`
    pub color: String,
}

/// Snowflakes go over the wire as strings
fn serialize_id<S: serde::Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}

/// Find a role by case-insensitive name
pub fn find_role<'a>(roles: &'a [RoleInfo], name: &str) -> Option<&'a RoleInfo> {
    let wanted = name.trim().to_lowercase();
    roles.iter().find(|r| r.name.to_lowercase() == wanted)
}

/// The guild operations the bot performs outside the gateway
#[async_trait]
pub trait GuildGateway: Send + Sync {
    /// Look up a member; `None` if the user is not in the guild
    async fn member(&self, user_id: u64) -> BotResult<Option<MemberInfo>>;

    /// All roles of the guild, highest first
    async fn roles(&self) -> BotResult<Vec<RoleInfo>>;

    async fn add_role(&self, user_id: u64, role_id: u64) -> BotResult<()>;

    async fn remove_role(&self, user_id: u64, role_id: u64) -> BotResult<()>;

    /// Post a plain message with mentions disabled
    async fn post_message(&self, channel_id: u64, content: &str) -> BotResult<()>;
}

/// [`GuildGateway`] backed by serenity's HTTP client
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<serenity::Http>,
    guild_id: serenity::GuildId,
}

impl SerenityGateway {
    pub fn new(http: Arc<serenity::Http>, guild_id: u64) -> Self {
        Self {
            http,
            guild_id: serenity::GuildId::new(guild_id),
        }
    }
}

#[async_trait]
impl GuildGateway for SerenityGateway {
    async fn member(&self, user_id: u64) -> BotResult<Option<MemberInfo>> {
        if user_id == 0 {
            return Ok(None);
        }

        let member = match self
            .guild_id
            .member(&*self.http, serenity::UserId::new(user_id))
            .await
        {
            Ok(member) => member,
            Err(e) => {
                debug!("Member {} lookup failed: {}", user_id, e);
                return Ok(None);
            }
        };

        Ok(Some(MemberInfo {
            id: member.user.id.get(),
            username: member.user.name.clone(),
            tag: member.user.tag(),
            display_name: member.display_name().to_string(),
            role_ids: member.roles.iter().map(|r| r.get()).collect(),
        }))
    }

    async fn roles(&self) -> BotResult<Vec<RoleInfo>> {
        let mut roles: Vec<serenity::Role> =
            self.guild_id.roles(&*self.http).await?.into_values().collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position));

        Ok(roles
            .into_iter()
            .map(|role| RoleInfo {
                id: role.id.get(),
                name: role.name,
                color: format!("#{}", role.colour.hex().to_lowercase()),
            })
            .collect())
    }

    async fn add_role(&self, user_id: u64, role_id: u64) -> BotResult<()> {
        self.http
            .add_member_role(
                self.guild_id,
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some(AUDIT_REASON),
            )
            .await?;
        Ok(())
    }

    async fn remove_role(&self, user_id: u64, role_id: u64) -> BotResult<()> {
        self.http
            .remove_member_role(
                self.guild_id,
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some(AUDIT_REASON),
            )
            .await?;
        Ok(())
    }

    async fn post_message(&self, channel_id: u64, content: &str) -> BotResult<()> {
        serenity::ChannelId::new(channel_id)
            .send_message(
                &*self.http,
                serenity::CreateMessage::new()
                    .content(content)
                    .allowed_mentions(serenity::CreateAllowedMentions::new()),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_role_ignores_case() {
        let roles = vec![
            RoleInfo {
                id: 1,
                name: "Members".to_string(),
                color: "#000000".to_string(),
            },
            RoleInfo {
                id: 2,
                name: "Alumni".to_string(),
                color: "#ff0000".to_string(),
            },
        ];

        assert_eq!(find_role(&roles, "alumni").map(|r| r.id), Some(2));
        assert_eq!(find_role(&roles, "MEMBERS").map(|r| r.id), Some(1));
        assert!(find_role(&roles, "officers").is_none());
    }
}
