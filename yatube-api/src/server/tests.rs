//! End-to-end tests through the router. They need a PostgreSQL database reachable through
//! `DATABASE_URL` and are skipped unless run with `cargo test -- --ignored`.

use crate::server::{ServerState, Settings, routes};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::{num::NonZeroU32, sync::Arc};
use tower::ServiceExt;
use yatube_common::model::{
    group::{CreateGroup, Group},
    image::MAX_IMAGE_SIZE,
    user::{CreateUser, Username},
};
use yatube_db::client::DbClient;

struct TestApp {
    router: Router,
    db: Arc<DbClient>,
}

struct TestUser {
    id: i64,
    username: String,
    token: String,
}

fn unique(prefix: &str) -> String {
    format!("{prefix}_{:08x}", rand::random::<u32>())
}

impl TestApp {
    async fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = DbClient::connect(&database_url, 5).await.unwrap();
        db.migrate().await.unwrap();
        let db = Arc::new(db);

        let state = ServerState {
            db_client: Arc::clone(&db),
            settings: Settings {
                default_page_size: NonZeroU32::new(10).unwrap(),
                token_lifetime: None,
            },
        };

        Self {
            router: routes().with_state(state),
            db,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&body).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    async fn register(&self, prefix: &str) -> TestUser {
        let username = unique(prefix);
        let (status, body) = self
            .request(
                Method::POST,
                "/users",
                None,
                Some(json!({ "username": username })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            username,
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    async fn create_post(&self, user: &TestUser, body: Value) -> Value {
        let (status, post) = self
            .request(Method::POST, "/posts", Some(user), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{post}");
        post
    }

    async fn create_group(&self) -> Group {
        self.db
            .create_group(&CreateGroup {
                title: "Cats".to_owned(),
                slug: unique("cats"),
                description: "All about cats".to_owned(),
            })
            .await
            .unwrap()
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn author_is_taken_from_the_token() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    let post = app
        .create_post(&alice, json!({ "text": "hello", "author": "mallory" }))
        .await;

    assert_eq!(post["author"], alice.username);
    assert_eq!(post["text"], "hello");
    assert_eq!(post["image"], Value::Null);
    assert_eq!(post["group"], Value::Null);
    assert!(post["pub_date"].is_string());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn anonymous_and_bad_tokens_cannot_post() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(Method::POST, "/posts", None, Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut impostor = app.register("impostor").await;
    impostor.token = format!("{}:AAAA:AAAA", impostor.id);
    let (status, _) = app
        .request(Method::POST, "/posts", Some(&impostor), Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn post_validation() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;

    for text in ["", "   ", "\n"] {
        let (status, body) = app
            .request(Method::POST, "/posts", Some(&alice), Some(json!({ "text": text })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "text");
        assert_eq!(body["detail"], "Text cannot be empty");
    }

    let (status, body) = app
        .request(Method::POST, "/posts", Some(&alice), Some(json!({ "text": "a\u{0}b" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "text");
    assert_eq!(body["detail"], "Null characters are not allowed.");

    for image in [
        "data:image/svg+xml;base64,PHN2ZyBvbmxvYWQ9ImFsZXJ0KDEpIi8+",
        "data:image/a\nb;base64,AAAA",
        "aGVsbG8gd29ybGQ=",
    ] {
        let (status, body) = app
            .request(
                Method::POST,
                "/posts",
                Some(&alice),
                Some(json!({ "text": "hi", "image": image })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{image:?}");
        assert_eq!(body["field"], "image");
    }

    let (status, body) = app
        .request(
            Method::POST,
            "/posts",
            Some(&alice),
            Some(json!({ "text": "hi", "group": i64::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "group");

    let oversized = "AAAA".repeat(MAX_IMAGE_SIZE / 3 + 1);
    let (status, body) = app
        .request(
            Method::POST,
            "/posts",
            Some(&alice),
            Some(json!({ "text": "hi", "image": oversized })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Image size cannot exceed 2MB");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn images_and_groups() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let group = app.create_group().await;

    let post = app
        .create_post(
            &alice,
            json!({
                "text": "look",
                "image": "data:image/gif;base64,R0lGODlh",
                "group": group.id,
            }),
        )
        .await;
    assert_eq!(post["group"], json!(group.id));

    let image_url = post["image"].as_str().unwrap().to_owned();
    assert_eq!(image_url, format!("/posts/{}/image", post["id"]));

    let response = app
        .router
        .clone()
        .oneshot(Request::get(&image_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"GIF89a");

    let (status, listed) = app
        .request(Method::GET, &format!("/posts?group={}", group.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], post["id"]);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn only_the_author_may_change_a_post() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let post = app.create_post(&alice, json!({ "text": "original" })).await;
    let uri = format!("/posts/{}", post["id"]);

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(&bob), Some(json!({ "text": "hijacked" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .request(Method::PUT, &uri, None, Some(json!({ "text": "anonymous" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&alice), Some(json!({ "group": null })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "text");

    for method in [Method::PATCH, Method::PUT] {
        let (status, body) = app
            .request(method, &uri, Some(&alice), Some(json!({ "text": null })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "This field may not be null.");
    }

    let (status, updated) = app
        .request(Method::PATCH, &uri, Some(&alice), Some(json!({ "text": "edited" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "edited");
    assert_eq!(updated["author"], alice.username);

    let (status, fetched) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["text"], "edited");

    let (status, _) = app.request(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn pagination_only_when_asked() {
    let app = TestApp::new().await;
    let carol = app.register("carol").await;
    for text in ["first", "second", "third"] {
        app.create_post(&carol, json!({ "text": text })).await;
    }

    let (status, all) = app
        .request(Method::GET, &format!("/posts?author={}", carol.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["text"], "third");

    let (status, page) = app
        .request(
            Method::GET,
            &format!("/posts?author={}&limit=2", carol.id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(
        page["next"],
        format!("/posts?author={}&limit=2&offset=2", carol.id)
    );
    assert_eq!(page["previous"], Value::Null);

    let (_, last) = app
        .request(
            Method::GET,
            &format!("/posts?author={}&offset=2", carol.id),
            None,
            None,
        )
        .await;
    assert_eq!(last["count"], 3);
    assert_eq!(last["results"].as_array().unwrap().len(), 1);
    assert_eq!(last["results"][0]["text"], "first");
    assert_eq!(last["next"], Value::Null);
    assert_eq!(last["previous"], format!("/posts?author={}&limit=10", carol.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn comments() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let post = app.create_post(&alice, json!({ "text": "discuss" })).await;
    let comments_uri = format!("/posts/{}/comments", post["id"]);

    let (status, _) = app
        .request(Method::GET, &format!("/posts/{}/comments", i64::MAX), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::POST, &comments_uri, None, Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(Method::POST, &comments_uri, Some(&bob), Some(json!({ "text": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "text");

    let (status, comment) = app
        .request(
            Method::POST,
            &comments_uri,
            Some(&bob),
            Some(json!({ "text": "nice", "post": i64::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], bob.username);
    assert_eq!(comment["post"], post["id"]);

    let (status, listed) = app.request(Method::GET, &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let comment_uri = format!("{comments_uri}/{}", comment["id"]);
    let (status, _) = app
        .request(Method::PATCH, &comment_uri, Some(&alice), Some(json!({ "text": "no" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(Method::PUT, &comment_uri, Some(&bob), Some(json!({ "text": "nicer" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "nicer");

    let (status, _) = app.request(Method::DELETE, &comment_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request(Method::DELETE, &comment_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request(Method::GET, &comment_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn follows() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let barbara = app.register("barbara").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/follow",
            Some(&alice),
            Some(json!({ "following": alice.username })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You can't follow yourself");

    let (status, body) = app
        .request(
            Method::POST,
            "/follow",
            Some(&alice),
            Some(json!({ "following": unique("nobody") })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "following");

    for followed in [&bob, &barbara] {
        let (status, follow) = app
            .request(
                Method::POST,
                "/follow",
                Some(&alice),
                Some(json!({ "following": followed.username })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(follow, json!({ "user": alice.username, "following": followed.username }));
    }

    let (status, body) = app
        .request(
            Method::POST,
            "/follow",
            Some(&alice),
            Some(json!({ "following": bob.username })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You are already following this user");

    let (status, all) = app.request(Method::GET, "/follow", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let search = bob.username.to_uppercase();
    let (status, found) = app
        .request(Method::GET, &format!("/follow?search={search}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([{ "user": alice.username, "following": bob.username }]));

    let (status, all_again) = app
        .request(Method::GET, "/follow?search=%00", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all_again.as_array().unwrap().len(), 2);

    let (status, none) = app.request(Method::GET, "/follow", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none, json!([]));

    let (status, _) = app.request(Method::GET, "/follow", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn groups_are_read_only() {
    let app = TestApp::new().await;
    let group = app.create_group().await;

    let (status, fetched) = app
        .request(Method::GET, &format!("/groups/{}", group.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["slug"], group.slug);
    assert_eq!(fetched["title"], "Cats");

    let (status, listed) = app.request(Method::GET, "/groups", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        listed
            .as_array()
            .unwrap()
            .iter()
            .any(|listed| listed["id"] == json!(group.id))
    );

    let (status, _) = app
        .request(Method::GET, &format!("/groups/{}", i64::MAX), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::POST, "/groups", None, Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["status"], 405);
    assert_eq!(body["detail"], "Method \"POST\" not allowed.");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn users_and_unknown_routes() {
    let app = TestApp::new().await;
    let dave = app.register("dave").await;

    let (status, user) = app
        .request(Method::GET, &format!("/users/{}", dave.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], dave.username);

    let (status, body) = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({ "username": dave.username })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A user with that username already exists.");

    let (status, body) = app.request(Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn unfinished_registration_leaves_no_user() {
    let app = TestApp::new().await;
    let username = Username::new(unique("erin")).unwrap();

    let mut transaction = app.db.begin().await.unwrap();
    let user = transaction
        .create_user(&CreateUser {
            username: username.clone(),
        })
        .await
        .unwrap();
    drop(transaction);

    assert_eq!(app.db.fetch_user(user.id).await.unwrap(), None);
    assert_eq!(app.db.fetch_user_by_username(&username).await.unwrap(), None);

    let (status, body) = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({ "username": username.get() })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}
