use secureload_config::{ProviderKind, UnknownUserPolicy, UpstreamConfig};
use secureload_models::{Credentials, NewRemoteUser};
use secureload_upstream::{AuthProvider, GENERIC_DETAIL, HttpAuthProvider, UpstreamAuthError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        provider: ProviderKind::Generic,
        base_url: base_url.to_string(),
        api_version: "v1".to_string(),
        client_id: "base_client".to_string(),
        client_secret: "client-secret".to_string(),
        grant_type: "password".to_string(),
        scope: "identity:users,identity:roles".to_string(),
        header_type: "JWT".to_string(),
        timeout_secs: 5,
        connect_timeout_secs: 2,
        max_retries: 2,
        retry_backoff_ms: 10,
        unknown_user_policy: UnknownUserPolicy::Provision,
    }
}

fn provider(server: &MockServer) -> HttpAuthProvider {
    HttpAuthProvider::new(test_config(&server.uri())).unwrap()
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_issue_token_posts_password_grant_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/login/"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=base_client"))
        .and(body_string_contains("client_secret=client-secret"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=p%40ss1"))
        .and(body_string_contains("scope=identity%3Ausers%2Cidentity%3Aroles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "access-token",
            "refresh": "refresh-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pair = provider(&server)
        .issue_token(&credentials("alice", "p@ss1"))
        .await
        .unwrap();

    assert_eq!(pair.access, "access-token");
    assert_eq!(pair.refresh, "refresh-token");
}

#[tokio::test]
async fn test_issue_token_rejection_carries_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/login/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"detail": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .issue_token(&credentials("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        UpstreamAuthError::Rejected {
            status: 400,
            detail: "invalid_grant".to_string()
        }
    );
}

#[tokio::test]
async fn test_issue_token_does_not_retry_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/login/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .issue_token(&credentials("alice", "p@ss1"))
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamAuthError::Rejected { status: 503, .. }));
    assert_eq!(err.detail(), GENERIC_DETAIL);
}

#[tokio::test]
async fn test_issue_token_invalid_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .issue_token(&credentials("alice", "p@ss1"))
        .await
        .unwrap_err();

    assert_eq!(err, UpstreamAuthError::InvalidResponse);
}

#[tokio::test]
async fn test_refresh_token_posts_refresh_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token/refresh/"))
        .and(body_string_contains("refresh=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "new-access",
            "refresh": "new-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pair = provider(&server).refresh_token("old-refresh").await.unwrap();
    assert_eq!(pair.access, "new-access");
}

#[tokio::test]
async fn test_fetch_user_profile_sends_configured_scheme() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/profile/"))
        .and(header("authorization", "JWT token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "username": "alice",
            "first_name": "Alice",
            "last_name": "Liddell",
            "email": "alice@example.com",
            "is_active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = provider(&server).fetch_user_profile("token-123").await.unwrap();
    assert_eq!(profile.username.as_deref(), Some("alice"));
    assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn test_fetch_user_profile_retries_on_500() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/profile/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/profile/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"username": "alice"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let profile = provider(&server).fetch_user_profile("token-123").await.unwrap();
    assert_eq!(profile.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_fetch_user_profile_gives_up_after_max_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/profile/"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let err = provider(&server).fetch_user_profile("token-123").await.unwrap_err();
    assert!(matches!(err, UpstreamAuthError::Rejected { status: 502, .. }));
}

#[tokio::test]
async fn test_fetch_user_profile_does_not_retry_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/profile/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(
            serde_json::json!({"detail": "Given token not valid for any token type"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server).fetch_user_profile("revoked").await.unwrap_err();
    assert_eq!(err.detail(), "Given token not valid for any token type");
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    // Nothing listens on port 9 of the loopback interface.
    let provider = HttpAuthProvider::new(UpstreamConfig {
        max_retries: 0,
        ..test_config("http://127.0.0.1:9")
    })
    .unwrap();

    let err = provider.fetch_user_profile("token-123").await.unwrap_err();
    assert_eq!(err, UpstreamAuthError::Unavailable);
}

#[tokio::test]
async fn test_create_remote_user_uses_acting_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .and(header("authorization", "JWT admin-token"))
        .and(body_string_contains("username=bob"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "username": "bob",
            "email": "bob@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = NewRemoteUser {
        username: "bob".to_string(),
        password: "secret".to_string(),
        email: Some("bob@example.com".to_string()),
        first_name: None,
        last_name: None,
    };
    let profile = provider(&server)
        .create_remote_user("admin-token", &user)
        .await
        .unwrap();
    assert_eq!(profile.username.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_update_remote_password_patches_user() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/users/alice/"))
        .and(header("authorization", "JWT token-123"))
        .and(body_string_contains("password=n3w"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server)
        .update_remote_password("token-123", "alice", "n3w")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_remote_password_escapes_username() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/users/ops%2Fadmin%3Fx/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/users/ops/admin/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    provider(&server)
        .update_remote_password("token-123", "ops/admin?x", "n3w")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_provider_name_follows_preset() {
    let server = MockServer::start().await;
    let provider = HttpAuthProvider::new(UpstreamConfig {
        provider: ProviderKind::Hoppe,
        ..test_config(&server.uri())
    })
    .unwrap();

    assert_eq!(provider.name(), "Hoppe-Auth-Backend");
    assert_eq!(provider.base_url(), server.uri());
}
