use async_trait::async_trait;
use guildbridge::components::groupme_relay::{GroupMeCallback, GroupMeClient};
use guildbridge::components::RelayHandle;
use guildbridge::error::BotResult;
use guildbridge::guild::{GuildGateway, MemberInfo, RoleInfo};
use serde_json::json;
use std::sync::Mutex;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Gateway that only records posted messages
#[derive(Default)]
struct RecordingGateway {
    posts: Mutex<Vec<(u64, String)>>,
}

#[async_trait]
impl GuildGateway for RecordingGateway {
    async fn member(&self, _user_id: u64) -> BotResult<Option<MemberInfo>> {
        Ok(None)
    }

    async fn roles(&self) -> BotResult<Vec<RoleInfo>> {
        Ok(Vec::new())
    }

    async fn add_role(&self, _user_id: u64, _role_id: u64) -> BotResult<()> {
        Ok(())
    }

    async fn remove_role(&self, _user_id: u64, _role_id: u64) -> BotResult<()> {
        Ok(())
    }

    async fn post_message(&self, channel_id: u64, content: &str) -> BotResult<()> {
        self.posts
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }
}

fn relay_against(server: &MockServer) -> RelayHandle {
    let client = GroupMeClient::new(
        reqwest::Client::new(),
        format!("{}/v3/", server.uri()),
        "bot-123",
    );
    RelayHandle::new(client, 555)
}

#[tokio::test]
async fn test_discord_message_is_posted_as_bot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/bots/post"))
        .and(body_json(json!({
            "text": "Alex: see you at 7\nhttps://cdn.example.com/flyer.png",
            "bot_id": "bot-123",
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_against(&server);
    let sent = relay
        .forward_to_groupme(
            "Alex",
            "see you at 7",
            &["https://cdn.example.com/flyer.png".to_string()],
        )
        .await
        .unwrap();

    assert!(sent);
}

#[tokio::test]
async fn test_empty_message_is_not_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let relay = relay_against(&server);

    assert!(!relay.forward_to_groupme("Alex", "   ", &[]).await.unwrap());
}

#[tokio::test]
async fn test_groupme_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/bots/post"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad bot"))
        .mount(&server)
        .await;

    let relay = relay_against(&server);

    assert!(relay.forward_to_groupme("Alex", "hi", &[]).await.is_err());
}

#[tokio::test]
async fn test_groupme_callback_is_posted_to_channel() {
    let server = MockServer::start().await;
    let relay = relay_against(&server);
    let gateway = RecordingGateway::default();

    let callback: GroupMeCallback = serde_json::from_value(json!({
        "name": "Sam",
        "text": "running late",
        "sender_type": "user",
        "attachments": [],
    }))
    .unwrap();
    assert!(relay.forward_to_discord(&gateway, &callback).await.unwrap());

    let own_post: GroupMeCallback = serde_json::from_value(json!({
        "name": "Relay Bot",
        "text": "Alex: hello",
        "sender_type": "bot",
    }))
    .unwrap();
    assert!(!relay.forward_to_discord(&gateway, &own_post).await.unwrap());

    let posts = gateway.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0], (555, "**Sam**: running late".to_string()));
}
