use crate::utils::text::truncate_chars;
use serde::Deserialize;

/// GroupMe's limit for a bot post
pub const GROUPME_MAX_CHARS: usize = 1000;

/// Discord's limit for a message
pub const DISCORD_MAX_CHARS: usize = 2000;

/// A message pushed to the bot's callback URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupMeCallback {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: Option<String>,
    /// `user`, `bot` or `system`
    #[serde(default)]
    pub sender_type: String,
    #[serde(default)]
    pub attachments: Vec<GroupMeAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupMeAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Text to post to GroupMe for a Discord message, `None` if there is nothing to send
pub fn format_outbound(author: &str, content: &str, attachment_urls: &[String]) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let content = content.trim();
    if !content.is_empty() {
        parts.push(content);
    }
    parts.extend(attachment_urls.iter().map(String::as_str));

    if parts.is_empty() {
        return None;
    }

    let text = format!("{}: {}", author, parts.join("\n"));
    Some(truncate_chars(&text, GROUPME_MAX_CHARS))
}

/// Discord message for a GroupMe callback, `None` for bot, system or empty posts
pub fn format_inbound(callback: &GroupMeCallback) -> Option<String> {
    if callback.sender_type == "bot" || callback.sender_type == "system" {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    if let Some(text) = callback.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(text);
    }
    parts.extend(
        callback
            .attachments
            .iter()
            .filter(|a| a.kind == "image")
            .filter_map(|a| a.url.as_deref()),
    );

    if parts.is_empty() {
        return None;
    }

    let name = match callback.name.trim() {
        "" => "GroupMe",
        name => name,
    };
    let text = format!("**{}**: {}", escape_markdown(name), parts.join("\n"));
    Some(truncate_chars(&text, DISCORD_MAX_CHARS))
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '_' | '~' | '`' | '|' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_includes_attachments() {
        let text = format_outbound(
            "Alice",
            " hello ",
            &["https://cdn.example/a.png".to_string()],
        );
        assert_eq!(
            text.as_deref(),
            Some("Alice: hello\nhttps://cdn.example/a.png")
        );
    }

    #[test]
    fn test_outbound_skips_empty_and_truncates() {
        assert!(format_outbound("Alice", "   ", &[]).is_none());

        let long = "y".repeat(3000);
        let text = format_outbound("Alice", &long, &[]).unwrap();
        assert_eq!(text.chars().count(), GROUPME_MAX_CHARS);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn test_inbound_ignores_bots() {
        let callback = GroupMeCallback {
            name: "Relay".to_string(),
            text: Some("echo".to_string()),
            sender_type: "bot".to_string(),
            attachments: Vec::new(),
        };
        assert!(format_inbound(&callback).is_none());
    }

    #[test]
    fn test_inbound_formats_user_messages() {
        let callback: GroupMeCallback = serde_json::from_value(serde_json::json!({
            "name": "Bob_the_builder",
            "text": "see you there",
            "sender_type": "user",
            "attachments": [
                { "type": "image", "url": "https://i.groupme.com/x.jpeg" },
                { "type": "mentions", "user_ids": ["1"] }
            ]
        }))
        .unwrap();

        assert_eq!(
            format_inbound(&callback).as_deref(),
            Some("**Bob\\_the\\_builder**: see you there\nhttps://i.groupme.com/x.jpeg")
        );
    }
}
