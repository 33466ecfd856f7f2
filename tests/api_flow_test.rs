use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tinta::config::Config;
use tinta::db;
use tinta::routes;
use tinta::session::MemorySessionCache;
use tinta::state::AppState;
use tinta::storage::MemoryBlobStore;

const BOUNDARY: &str = "tinta-test-boundary";

struct TestApp {
    app: Router,
    blobs: Arc<MemoryBlobStore>,
    _tmp: TempDir,
}

fn test_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
    db::init_schema(&pool).unwrap();

    let blobs = Arc::new(MemoryBlobStore::new());
    let state = AppState {
        db: pool,
        config: Config::default(),
        sessions: Arc::new(MemorySessionCache::new()),
        blobs: blobs.clone(),
    };

    TestApp {
        app: routes::api_router().with_state(state),
        blobs,
        _tmp: tmp,
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn multipart_request(uri: &str, method: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn json_request(uri: &str, method: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(uri: &str, method: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn signup(app: &Router, name: &str, email: &str) -> String {
    let (status, json) = send(
        app,
        multipart_request(
            "/users",
            "POST",
            None,
            &[
                Part::Text("name", name),
                Part::Text("email", email),
                Part::Text("password", "secret"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn connect(app: &Router, email: &str) -> String {
    let (status, json) = send(
        app,
        json_request(
            "/connect",
            "POST",
            None,
            serde_json::json!({ "email": email, "password": "secret" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn full_blog_flow() {
    let t = test_app();
    let user_id = signup(&t.app, "Ann", "ann@example.com").await;
    let token = connect(&t.app, "ann@example.com").await;

    // Create a post with one attached image
    let (status, json) = send(
        &t.app,
        multipart_request(
            "/posts",
            "POST",
            Some(&token),
            &[
                Part::Text("name", "first"),
                Part::Text("type", "games"),
                Part::Text("content", "the content"),
                Part::File("pictures", "shot.png", b"png-bytes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = json["id"].as_str().unwrap().to_string();
    assert_eq!(t.blobs.stored_names().len(), 1);

    // Like, then switch to dislike, then comment
    let (status, _) = send(
        &t.app,
        empty_request(&format!("/posts/{post_id}/like"), "PUT", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &t.app,
        empty_request(&format!("/posts/{post_id}/dislike"), "PUT", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &t.app,
        json_request(
            &format!("/posts/{post_id}/comments"),
            "POST",
            Some(&token),
            serde_json::json!({ "comment": "wow, very nice post here" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Observe it all through GET /posts
    let (status, json) = send(&t.app, empty_request("/posts", "GET", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let posts = json.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post["name"], "first");
    assert_eq!(post["type"], "games");
    assert_eq!(post["owner"]["id"].as_str().unwrap(), user_id);
    assert_eq!(post["likes"].as_array().unwrap().len(), 0);
    assert_eq!(post["dislikes"][0]["id"].as_str().unwrap(), user_id);
    assert_eq!(post["comments"][0]["comment"], "wow, very nice post here");
    assert!(post.get("created_at").is_none());
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let t = test_app();
    let (status, _) = send(&t.app, empty_request("/posts", "GET", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, empty_request("/posts", "GET", Some("bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_signup_is_conflict() {
    let t = test_app();
    signup(&t.app, "Ann", "ann@example.com").await;

    let (status, _) = send(
        &t.app,
        multipart_request(
            "/users",
            "POST",
            None,
            &[
                Part::Text("name", "Imposter"),
                Part::Text("email", "ann@example.com"),
                Part::Text("password", "secret"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn connect_with_wrong_password_is_unauthorized() {
    let t = test_app();
    signup(&t.app, "Ann", "ann@example.com").await;

    let (status, _) = send(
        &t.app,
        json_request(
            "/connect",
            "POST",
            None,
            serde_json::json!({ "email": "ann@example.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        json_request(
            "/connect",
            "POST",
            None,
            serde_json::json!({ "email": "ghost@example.com", "password": "secret" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_edit_propagates_to_owner_snapshots() {
    let t = test_app();
    let user_id = signup(&t.app, "Ann", "ann@example.com").await;
    let token = connect(&t.app, "ann@example.com").await;

    let (status, _) = send(
        &t.app,
        multipart_request(
            "/posts",
            "POST",
            Some(&token),
            &[Part::Text("name", "first")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &t.app,
        json_request(
            &format!("/users/{user_id}"),
            "PUT",
            Some(&token),
            serde_json::json!({ "name": "Anna" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = send(&t.app, empty_request("/posts", "GET", Some(&token))).await;
    assert_eq!(json[0]["owner"]["name"], "Anna");
}

#[tokio::test]
async fn editing_someone_elses_account_is_unauthorized() {
    let t = test_app();
    signup(&t.app, "Ann", "ann@example.com").await;
    let other_id = signup(&t.app, "Bob", "bob@example.com").await;
    let token = connect(&t.app, "ann@example.com").await;

    let (status, _) = send(
        &t.app,
        json_request(
            &format!("/users/{other_id}"),
            "PUT",
            Some(&token),
            serde_json::json!({ "name": "Hacked" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        empty_request(&format!("/users/{other_id}"), "DELETE", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_deletion_cascades_and_closes_the_door() {
    let t = test_app();
    let user_id = signup(&t.app, "Ann", "ann@example.com").await;
    let token = connect(&t.app, "ann@example.com").await;

    // A post with an image that must disappear with the account
    let (status, _) = send(
        &t.app,
        multipart_request(
            "/posts",
            "POST",
            Some(&token),
            &[
                Part::Text("name", "doomed"),
                Part::File("pictures", "shot.png", b"png-bytes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(t.blobs.stored_names().len(), 1);

    let (status, _) = send(
        &t.app,
        empty_request(&format!("/users/{user_id}"), "DELETE", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(t.blobs.stored_names().is_empty());

    // Credentials no longer resolve
    let (status, _) = send(
        &t.app,
        json_request(
            "/connect",
            "POST",
            None,
            serde_json::json!({ "email": "ann@example.com", "password": "secret" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The old session is dead because the record is gone
    let (status, _) = send(&t.app, empty_request("/posts", "GET", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disconnect_invalidates_the_token() {
    let t = test_app();
    signup(&t.app, "Ann", "ann@example.com").await;
    let token = connect(&t.app, "ann@example.com").await;

    let (status, _) = send(&t.app, empty_request("/disconnect", "POST", Some(&token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, empty_request("/posts", "GET", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Second disconnect finds nothing
    let (status, _) = send(&t.app, empty_request("/disconnect", "POST", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn uploads_are_served_back() {
    let t = test_app();
    signup(&t.app, "Ann", "ann@example.com").await;
    let token = connect(&t.app, "ann@example.com").await;

    let (status, _) = send(
        &t.app,
        multipart_request(
            "/posts",
            "POST",
            Some(&token),
            &[
                Part::Text("name", "with image"),
                Part::File("pictures", "shot.png", b"png-bytes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let name = t.blobs.stored_names().pop().unwrap();
    let resp = t
        .app
        .clone()
        .oneshot(empty_request(&format!("/uploads/{name}"), "GET", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"png-bytes");
}
