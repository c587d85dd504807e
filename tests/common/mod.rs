#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use secureload::router::init_router;
use secureload::state::AppState;
use secureload_auth::{Claims, encode_claims};
use secureload_config::{
    AppConfig, CorsConfig, JwtConfig, ProviderKind, ServerConfig, UnknownUserPolicy,
    UpstreamConfig,
};
use secureload_core::hash_password;
use secureload_db::{IdentityStore, MemoryIdentityStore};
use secureload_models::{LocalUser, NewLocalUser};
use secureload_upstream::build_provider;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JWT_SECRET: &str = "integration-test-secret";

/// 2100-01-01T00:00:00Z
const FAR_FUTURE: u64 = 4_102_444_800;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryIdentityStore>,
    pub upstream: MockServer,
}

impl TestApp {
    /// Sends `request` through a fresh clone of the router and returns the
    /// status with the decoded JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: JWT_SECRET.to_string(),
        algorithm: "HS256".to_string(),
        leeway: 0,
    }
}

pub fn app_config(upstream_url: &str, policy: UnknownUserPolicy) -> AppConfig {
    AppConfig {
        jwt: jwt_config(),
        upstream: UpstreamConfig {
            provider: ProviderKind::Generic,
            base_url: upstream_url.to_string(),
            api_version: "v1".to_string(),
            client_id: "base_client".to_string(),
            client_secret: "client-secret".to_string(),
            grant_type: "password".to_string(),
            scope: "identity:users,identity:roles".to_string(),
            header_type: "JWT".to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 2,
            max_retries: 0,
            retry_backoff_ms: 10,
            unknown_user_policy: policy,
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            database_url: None,
            log_dir: "logs".to_string(),
        },
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_policy(UnknownUserPolicy::Provision).await
}

pub async fn spawn_app_with_policy(policy: UnknownUserPolicy) -> TestApp {
    let upstream = MockServer::start().await;
    let config = app_config(&upstream.uri(), policy);
    let store = Arc::new(MemoryIdentityStore::new());
    let provider = build_provider(&config.upstream).unwrap();

    let state = AppState::new(&config, store.clone(), provider).unwrap();

    TestApp {
        router: init_router(state),
        store,
        upstream,
    }
}

pub fn access_token(username: &str) -> String {
    encode_claims(&Claims::for_user(username, FAR_FUTURE), &jwt_config()).unwrap()
}

pub fn expired_token(username: &str) -> String {
    encode_claims(&Claims::for_user(username, 1_000_000), &jwt_config()).unwrap()
}

pub fn profile_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "first_name": "Alice",
        "last_name": "Liddell",
        "email": format!("{}@example.com", username),
        "is_active": true
    })
}

/// Authorization server confirms `token` with the profile of `username`.
pub async fn mount_profile(server: &MockServer, token: &str, username: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/profile/"))
        .and(header("authorization", format!("JWT {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(username)))
        .mount(server)
        .await;
}

/// Inserts a local user directly. A `None` password stores the unusable
/// marker and skips bcrypt.
pub async fn seed_user(store: &MemoryIdentityStore, username: &str, password: Option<&str>) -> LocalUser {
    let password_hash = match password {
        Some(password) => hash_password(password).unwrap(),
        None => secureload_core::unusable_password(),
    };
    store
        .create_user(
            NewLocalUser {
                username: username.to_string(),
                password_hash,
                email: format!("{}@example.com", username),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                is_active: true,
            },
            &[],
        )
        .await
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("JWT {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}
