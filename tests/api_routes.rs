use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use guildbridge::api::{router, AppState};
use guildbridge::components::calendar_sync::{
    CalendarEntry, CalendarSyncHandle, EntrySource, RemoteEvent, ScheduledEventStore,
};
use guildbridge::components::groupme_relay::GroupMeClient;
use guildbridge::components::{CalendarSync, ComponentManager, GroupMeRelay, RelayHandle};
use guildbridge::config::Config;
use guildbridge::error::{calendar_error, BotResult};
use guildbridge::guild::{GuildGateway, MemberInfo, RoleInfo};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tower::ServiceExt;

const MEMBER_ID: u64 = 42;
const BROKEN_MEMBER_ID: u64 = 99;
const MEMBERS_ROLE: u64 = 10;
const ALUMNI_ROLE: u64 = 20;

/// A guild with one member who holds the Members role
#[derive(Default)]
struct FakeGuild {
    changes: Mutex<Vec<(&'static str, u64, u64)>>,
    posts: Mutex<Vec<(u64, String)>>,
}

#[async_trait]
impl GuildGateway for FakeGuild {
    async fn member(&self, user_id: u64) -> BotResult<Option<MemberInfo>> {
        match user_id {
            MEMBER_ID => Ok(Some(MemberInfo {
                id: MEMBER_ID,
                username: "alex".to_string(),
                tag: "alex".to_string(),
                display_name: "Alex".to_string(),
                role_ids: vec![MEMBERS_ROLE],
            })),
            BROKEN_MEMBER_ID => Err(calendar_error("discord unavailable")),
            _ => Ok(None),
        }
    }

    async fn roles(&self) -> BotResult<Vec<RoleInfo>> {
        Ok(vec![
            RoleInfo {
                id: ALUMNI_ROLE,
                name: "Alumni".to_string(),
                color: "#ff0000".to_string(),
            },
            RoleInfo {
                id: MEMBERS_ROLE,
                name: "Members".to_string(),
                color: "#00ff00".to_string(),
            },
            RoleInfo {
                id: 1,
                name: "@everyone".to_string(),
                color: "#000000".to_string(),
            },
        ])
    }

    async fn add_role(&self, user_id: u64, role_id: u64) -> BotResult<()> {
        self.changes.lock().unwrap().push(("add", user_id, role_id));
        Ok(())
    }

    async fn remove_role(&self, user_id: u64, role_id: u64) -> BotResult<()> {
        self.changes
            .lock()
            .unwrap()
            .push(("remove", user_id, role_id));
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

struct EmptyFeed;

#[async_trait]
impl EntrySource for EmptyFeed {
    async fn fetch_entries(&self) -> BotResult<Vec<CalendarEntry>> {
        Ok(Vec::new())
    }
}

struct EmptyStore;

#[async_trait]
impl ScheduledEventStore for EmptyStore {
    async fn list(&self) -> BotResult<Vec<RemoteEvent>> {
        Ok(Vec::new())
    }

    async fn create(&self, _entry: &CalendarEntry) -> BotResult<RemoteEvent> {
        Err(calendar_error("read-only"))
    }

    async fn update(&self, _id: u64, _entry: &CalendarEntry) -> BotResult<RemoteEvent> {
        Err(calendar_error("read-only"))
    }

    async fn delete(&self, _id: u64) -> BotResult<()> {
        Err(calendar_error("read-only"))
    }
}

struct TestApp {
    router: Router,
    guild: Arc<FakeGuild>,
}

#[derive(Default)]
struct Options {
    api_token: Option<&'static str>,
    callback_token: Option<&'static str>,
    calendar: bool,
    relay: bool,
}

async fn app(options: Options) -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "DISCORD_TOKEN" => Some("token".to_string()),
        "GUILD_ID" => Some("1".to_string()),
        _ => None,
    })
    .unwrap();

    let calendar = CalendarSync::new();
    if options.calendar {
        let handle = CalendarSyncHandle::new(Box::new(EmptyFeed), Arc::new(EmptyStore));
        calendar.start(handle, None).await;
    }
    let relay = GroupMeRelay::new();
    if options.relay {
        let client = GroupMeClient::new(reqwest::Client::new(), "http://127.0.0.1:9", "bot");
        relay.set_handle(RelayHandle::new(client, 555)).await;
    }

    let mut components = ComponentManager::new(Arc::new(RwLock::new(config)));
    components.register(calendar);
    components.register(relay);

    let guild = Arc::new(FakeGuild::default());
    let state = AppState {
        gateway: guild.clone(),
        components: Arc::new(components),
        bot_tag: Arc::new(RwLock::new(Some("Bridge#0001".to_string()))),
        api_token: options.api_token.map(String::from),
        callback_token: options.callback_token.map(String::from),
    };

    TestApp {
        router: router(state),
        guild,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_bot() {
    let app = app(Options::default()).await;

    let (status, body) = send(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["bot"], "Bridge#0001");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_get_roles_requires_user_id() {
    let app = app(Options::default()).await;

    let (status, body) = send(&app.router, get("/roles")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "userId query parameter is required");
}

#[tokio::test]
async fn test_get_roles_for_unknown_user() {
    let app = app(Options::default()).await;

    for uri in ["/roles?userId=7", "/roles?userId=not-a-snowflake"] {
        let (status, body) = send(&app.router, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found in guild");
    }
}

#[tokio::test]
async fn test_get_roles_lists_member_roles() {
    let app = app(Options::default()).await;

    let (status, body) = send(&app.router, get("/roles?userId=42")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["userId"], "42");
    assert_eq!(body["username"], "alex");
    assert_eq!(body["displayName"], "Alex");
    assert_eq!(
        body["roles"],
        json!([{ "id": "10", "name": "Members", "color": "#00ff00" }])
    );
}

#[tokio::test]
async fn test_gateway_failure_is_internal_error() {
    let app = app(Options::default()).await;

    let (status, body) = send(&app.router, get("/roles?userId=99")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_manage_requires_both_fields() {
    let app = app(Options::default()).await;

    let (status, body) = send(
        &app.router,
        json_request("PUT", "/roles/manage", json!({ "userId": "42" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "userId and roleName are required");

    let malformed = Request::builder()
        .method("DELETE")
        .uri("/roles/manage")
        .header("content-type", "application/json")
        .body(Body::from("{"))
        .unwrap();
    let (status, _) = send(&app.router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_role_by_case_insensitive_name() {
    let app = app(Options::default()).await;

    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/roles/manage",
            json!({ "userId": "42", "roleName": "alumni" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully added alumni role");
    assert_eq!(body["roleName"], "alumni");
    assert_eq!(
        *app.guild.changes.lock().unwrap(),
        vec![("add", MEMBER_ID, ALUMNI_ROLE)]
    );
}

#[tokio::test]
async fn test_add_role_already_held_is_a_no_op() {
    let app = app(Options::default()).await;

    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/roles/manage",
            json!({ "userId": "42", "roleName": "Members" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User already has the Members role");
    assert!(app.guild.changes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_role() {
    let app = app(Options::default()).await;

    let (status, body) = send(
        &app.router,
        json_request(
            "DELETE",
            "/roles/manage",
            json!({ "userId": "42", "roleName": "Members" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully removed Members role");

    let (status, body) = send(
        &app.router,
        json_request(
            "DELETE",
            "/roles/manage",
            json!({ "userId": "42", "roleName": "Alumni" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User doesn't have the Alumni role");

    assert_eq!(
        *app.guild.changes.lock().unwrap(),
        vec![("remove", MEMBER_ID, MEMBERS_ROLE)]
    );
}

#[tokio::test]
async fn test_unknown_role_is_not_found() {
    let app = app(Options::default()).await;

    let (status, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/roles/manage",
            json!({ "userId": "42", "roleName": "Officers" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Role 'Officers' not found in guild");
    assert_eq!(body["userId"], "42");
}

#[tokio::test]
async fn test_api_token_guards_role_routes_only() {
    let app = app(Options {
        api_token: Some("secret"),
        ..Options::default()
    })
    .await;

    let (status, _) = send(&app.router, get("/roles?userId=42")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .uri("/roles?userId=42")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, authorized).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_calendar_sync_not_configured() {
    let app = app(Options::default()).await;

    let (status, body) = send(&app.router, json_request("POST", "/calendar/sync", json!({}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["started"], false);
    assert_eq!(
        body["message"],
        "Calendar sync not configured. Set CALENDAR_ICS_URL and GUILD_ID."
    );
}

#[tokio::test]
async fn test_calendar_sync_runs_a_pass() {
    let app = app(Options {
        calendar: true,
        ..Options::default()
    })
    .await;

    let (status, body) = send(&app.router, json_request("POST", "/calendar/sync", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["started"], true);
    assert_eq!(body["message"], "Calendar sync triggered.");
    assert_eq!(body["report"]["entries"], 0);
    assert_eq!(body["report"]["skippedPast"], 0);
}

#[tokio::test]
async fn test_groupme_callback_checks_token_and_configuration() {
    let app = app(Options {
        callback_token: Some("hook"),
        ..Options::default()
    })
    .await;
    let callback = json!({ "name": "Sam", "text": "hi", "sender_type": "user" });

    let (status, _) = send(
        &app.router,
        json_request("POST", "/groupme/callback", callback.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app.router,
        json_request("POST", "/groupme/callback?token=hook", callback),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Relay not configured");
}

#[tokio::test]
async fn test_groupme_callback_is_relayed() {
    let app = app(Options {
        relay: true,
        ..Options::default()
    })
    .await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/groupme/callback",
            json!({ "name": "Sam", "text": "hi all", "sender_type": "user" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "relayed": true }));
    assert_eq!(
        *app.guild.posts.lock().unwrap(),
        vec![(555, "**Sam**: hi all".to_string())]
    );
}
