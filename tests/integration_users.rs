mod common;

use axum::http::StatusCode;
use common::{access_token, get_request, json_request, mount_profile, seed_user, spawn_app};
use secureload_core::verify_password;
use secureload_db::IdentityStore;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_create_user_acts_upstream_with_caller_token() {
    let app = spawn_app().await;
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .and(header("authorization", format!("JWT {}", token).as_str()))
        .and(body_string_contains("username=bob"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "username": "bob",
            "email": "bob@example.com",
            "first_name": "Bob",
            "last_name": "Builder",
            "is_active": true
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users",
            json!({"username": "bob", "password": "s3cret", "email": "bob@example.com"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["email"], "bob@example.com");
    // Names the caller left out come from the upstream record.
    assert_eq!(body["first_name"], "Bob");
    assert_eq!(body["last_name"], "Builder");

    let bob = app.store.find_user_by_username("bob").await.unwrap().unwrap();
    assert!(verify_password("s3cret", &bob.password_hash).unwrap());
}

#[tokio::test]
async fn test_create_user_requires_authentication() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users",
            json!({"username": "bob", "password": "s3cret"}),
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");
    assert!(app.store.find_user_by_username("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_user_surfaces_upstream_rejection() {
    let app = spawn_app().await;
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "A user with that username already exists."})),
        )
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users",
            json!({"username": "bob", "password": "s3cret"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A user with that username already exists.");
    assert!(app.store.find_user_by_username("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_user_conflicts_with_local_username() {
    let app = spawn_app().await;
    seed_user(&app.store, "bob", None).await;
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users",
            json!({"username": "bob", "password": "s3cret"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Username already exists");
}

#[tokio::test]
async fn test_create_user_with_unknown_role_touches_nothing() {
    let app = spawn_app().await;
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"username": "bob"})))
        .expect(0)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users",
            json!({"username": "bob", "password": "pw", "roles": [uuid::Uuid::new_v4()]}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Group not found");
    assert!(app.store.find_user_by_username("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_user_with_roles() {
    let app = spawn_app().await;
    let editors = app.store.create_group("Editors", &[]).await.unwrap();
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    Mock::given(method("POST"))
        .and(path("/v1/users/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"username": "bob"})))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users",
            json!({"username": "bob", "password": "pw", "roles": [editors.id]}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["roles"][0]["name"], "Editors");
}

#[tokio::test]
async fn test_users_exists() {
    let app = spawn_app().await;
    seed_user(&app.store, "carol", None).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users-exists",
            json!({"username": "carol"}),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detail"], "Exists");

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/v1/users-exists",
            json!({"username": "nobody"}),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not Exists");
}

#[tokio::test]
async fn test_get_users_and_user_by_id() {
    let app = spawn_app().await;
    let carol = seed_user(&app.store, "carol", None).await;
    seed_user(&app.store, "dave", None).await;

    let (status, body) = app.send(get_request("/api/v1/users", None)).await;
    assert_eq!(status, StatusCode::OK);
    let usernames: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["carol", "dave"]);

    let (status, body) = app
        .send(get_request(&format!("/api/v1/users/{}", carol.id), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "carol");

    let (status, body) = app
        .send(get_request(
            &format!("/api/v1/users/{}", uuid::Uuid::new_v4()),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");
}

#[tokio::test]
async fn test_update_user_changes_fields_and_roles() {
    let app = spawn_app().await;
    let carol = seed_user(&app.store, "carol", None).await;
    let group = app.store.create_group("Editors", &[]).await.unwrap();
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/api/v1/users/{}", carol.id),
            json!({"first_name": "Caroline", "is_active": false, "roles": [group.id]}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Caroline");
    assert_eq!(body["last_name"], "User");
    assert_eq!(body["is_active"], false);
    assert_eq!(body["roles"][0]["name"], "Editors");
}

#[tokio::test]
async fn test_update_user_refuses_rename() {
    let app = spawn_app().await;
    let carol = seed_user(&app.store, "carol", None).await;
    let token = access_token("admin");
    mount_profile(&app.upstream, &token, "admin").await;

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/api/v1/users/{}", carol.id),
            json!({"username": "caroline", "first_name": "Caroline"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username cannot be changed");
    let stored = app.store.find_user_by_id(carol.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "carol");
    assert_eq!(stored.first_name, "Test");
}

#[tokio::test]
async fn test_update_profile_names() {
    let app = spawn_app().await;
    let token = access_token("alice");
    mount_profile(&app.upstream, &token, "alice").await;

    let (status, body) = app
        .send(json_request(
            "PATCH",
            "/api/v1/profile",
            json!({"first_name": "Alicia"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Alicia");
    assert_eq!(body["last_name"], "Liddell");
}

#[tokio::test]
async fn test_change_password_updates_upstream_then_local() {
    let app = spawn_app().await;
    seed_user(&app.store, "alice", Some("old-pass")).await;
    let token = access_token("alice");
    mount_profile(&app.upstream, &token, "alice").await;

    Mock::given(method("PATCH"))
        .and(path("/v1/users/alice/"))
        .and(header("authorization", format!("JWT {}", token).as_str()))
        .and(body_string_contains("password=new-pass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, _) = app
        .send(json_request(
            "PATCH",
            "/api/v1/profile",
            json!({"password": "new-pass", "old_password": "old-pass"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let alice = app.store.find_user_by_username("alice").await.unwrap().unwrap();
    assert!(verify_password("new-pass", &alice.password_hash).unwrap());
}

#[tokio::test]
async fn test_change_password_with_wrong_old_password() {
    let app = spawn_app().await;
    seed_user(&app.store, "alice", Some("old-pass")).await;
    let token = access_token("alice");
    mount_profile(&app.upstream, &token, "alice").await;

    Mock::given(method("PATCH"))
        .and(path("/v1/users/alice/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "PATCH",
            "/api/v1/profile",
            json!({"password": "new-pass", "old_password": "guess"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Old password is incorrect");
}

#[tokio::test]
async fn test_change_password_when_upstream_refuses() {
    let app = spawn_app().await;
    seed_user(&app.store, "alice", Some("old-pass")).await;
    let token = access_token("alice");
    mount_profile(&app.upstream, &token, "alice").await;

    Mock::given(method("PATCH"))
        .and(path("/v1/users/alice/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Forbidden"})))
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .send(json_request(
            "PATCH",
            "/api/v1/profile",
            json!({"password": "new-pass", "old_password": "old-pass"}),
            Some(&token),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Can't change password now");
    let alice = app.store.find_user_by_username("alice").await.unwrap().unwrap();
    assert!(verify_password("old-pass", &alice.password_hash).unwrap());
}
