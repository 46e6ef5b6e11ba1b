use crate::assets;
use crate::state;
use crate::uploads::MAX_ATTACHMENT_BYTES;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post, put};

mod admin;
mod auth;
mod documents;
mod files;
mod notifications;
mod push;

/// Room for the JSON part and multipart framing around the largest attachment.
const CREATE_BODY_LIMIT: usize = MAX_ATTACHMENT_BYTES + 256 * 1024;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/api/users", get(auth::list_users))
        .route(
            "/api/documents",
            get(documents::list)
                .post(documents::create)
                .layer(DefaultBodyLimit::max(CREATE_BODY_LIMIT)),
        )
        .route(
            "/api/documents/{id}",
            get(documents::detail).delete(documents::delete),
        )
        .route("/api/documents/{id}/approval", put(documents::set_approval))
        .route(
            "/api/documents/{id}/signatories/{signatory_id}",
            put(documents::set_signature),
        )
        .route("/api/documents/{id}/comments", post(documents::add_comment))
        .route(
            "/api/documents/{id}/comments/{comment_id}",
            delete(documents::delete_comment),
        )
        .route("/files/{*path}", get(files::attachment))
        .route(
            "/api/notifications",
            get(notifications::list).delete(notifications::delete_all),
        )
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route("/api/notifications/live", get(notifications::live))
        .route(
            "/api/notifications/{id}",
            delete(notifications::delete),
        )
        .route(
            "/api/notifications/{id}/read",
            post(notifications::mark_read),
        )
        .route("/api/push/public-key", get(push::push_public_key))
        .route(
            "/api/push/subscriptions",
            post(push::subscribe).delete(push::unsubscribe),
        )
        .route("/api/push/test", post(push::push_test))
        .route("/api/admin/notify", post(admin::notify))
        .route("/push", get(push::push_settings))
        .route("/static/push.js", get(assets::push_script))
        .route("/static/icon.svg", get(assets::icon))
        .route("/static/manifest.json", get(assets::manifest))
        .route("/sw.js", get(assets::service_worker))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::config;
    use crate::db::Store;
    use crate::db::queries::fixtures;
    use crate::push::PushQueue;
    use crate::seed::{self, SeedUser};
    use crate::types::model::{Role, User};
    use crate::uploads::tests::{PDF_BYTES, create_temp_root};
    use axum::body::Body;
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::response::Response;
    use serde_json::Value as JsonValue;
    use serde_json::json;
    use tower::ServiceExt;

    use std::path::PathBuf;

    struct TestClub {
        state: state::AppState,
        root: PathBuf,
    }

    impl TestClub {
        fn new(test_name: &str) -> Self {
            let root = create_temp_root(test_name);
            let config = config::AppConfig {
                root: root.clone(),
                ..Default::default()
            };
            let store = Store::open_memory().expect("store");
            let state =
                state::AppState::new(config, store, PushQueue::disabled()).expect("app state");
            Self { state, root }
        }

        fn member(&self, name: &str, role: Role) -> (User, String) {
            let user = {
                let conn = self.state.store.lock();
                fixtures::user(&conn, name, role)
            };
            let token = self.state.auth.issue_token(&user.id).expect("token");
            (user, token)
        }

        async fn send(&self, request: Request<Body>) -> Response {
            app(self.state.clone())
                .oneshot(request)
                .await
                .expect("request failed")
        }
    }

    impl Drop for TestClub {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    fn get_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, token: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(token: &str, document: JsonValue, file: Option<&[u8]>) -> Request<Body> {
        const BOUNDARY: &str = "clubsign-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document\"\r\n\r\n{document}\r\n"
            )
            .as_bytes(),
        );
        if let Some(bytes) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"budget.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/documents")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> JsonValue {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("parse json")
    }

    fn budget_request() -> JsonValue {
        json!({
            "name": "Budget Request",
            "description": "Spring season",
            "requires_approval": false,
            "signatories": [{ "name": "Dana", "position": "Treasurer" }],
        })
    }

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let club = TestClub::new("app-health");

        // When
        let response = club
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn auth_middleware__should_return_json_unauthorized_for_api() {
        // Given
        let club = TestClub::new("app-unauthorized");

        // When
        let response = club
            .send(
                Request::builder()
                    .uri("/api/documents")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = json_body(response).await;
        assert_eq!(payload["error"], "unauthorized");
    }

    #[tokio::test]
    async fn auth_middleware__should_reject_token_for_unknown_user() {
        // Given
        let club = TestClub::new("app-unknown-subject");
        let token = club.state.auth.issue_token("ghost").expect("token");

        // When
        let response = club.send(get_request("/api/me", &token)).await;

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login__should_set_cookie_that_authenticates() {
        // Given
        let club = TestClub::new("app-login");
        {
            let conn = club.state.store.lock();
            seed::add_user(
                &conn,
                &SeedUser {
                    email: "ada@club.example".to_string(),
                    display_name: "Ada".to_string(),
                    role: Role::Admin,
                    password: "correct horse".to_string(),
                },
            )
            .expect("add user");
        }

        // When
        let response = club
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "email": "ADA@club.example", "password": "correct horse" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("set-cookie")
            .to_str()
            .expect("cookie header")
            .to_string();
        assert!(cookie.starts_with("clubsign_auth="));
        assert!(cookie.contains("HttpOnly"));
        let payload = json_body(response).await;
        assert_eq!(payload["user"]["display_name"], "Ada");

        let session = cookie.split(';').next().expect("cookie pair").to_string();
        let me = club
            .send(
                Request::builder()
                    .uri("/api/me")
                    .header(COOKIE, session)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(json_body(me).await["role"], "admin");
    }

    #[tokio::test]
    async fn login__should_reject_invalid_credentials() {
        // Given
        let club = TestClub::new("app-login-failure");
        club.member("Ada", Role::Member);

        // When
        let response = club
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "email": "ada@club.example", "password": "wrong" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid email or password.");
    }

    #[tokio::test]
    async fn create_document__should_store_attachment_and_notify_others() {
        // Given
        let club = TestClub::new("app-create");
        let (_, ada_token) = club.member("Ada", Role::Member);
        let (_, bob_token) = club.member("Bob", Role::Member);

        // When
        let response = club
            .send(multipart_request(&ada_token, budget_request(), Some(PDF_BYTES)))
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::CREATED);
        let detail = json_body(response).await;
        assert_eq!(detail["name"], "Budget Request");
        assert_eq!(detail["signatories"][0]["name"], "Dana");
        let url = detail["attachment"]["url"]
            .as_str()
            .expect("attachment url")
            .to_string();

        let file = club.send(get_request(&url, &bob_token)).await;
        assert_eq!(file.status(), StatusCode::OK);
        assert_eq!(
            file.headers().get(CONTENT_TYPE).expect("content-type"),
            "application/pdf"
        );
        let bytes = to_bytes(file.into_body(), usize::MAX)
            .await
            .expect("read file");
        assert_eq!(bytes.as_ref(), PDF_BYTES);

        let inbox = json_body(club.send(get_request("/api/notifications", &bob_token)).await).await;
        assert_eq!(inbox["unread"], 1);
        assert_eq!(inbox["notifications"][0]["kind"], "document_created");
        let own = json_body(club.send(get_request("/api/notifications", &ada_token)).await).await;
        assert_eq!(own["unread"], 0);
    }

    #[tokio::test]
    async fn create_document__should_reject_missing_signatories() {
        // Given
        let club = TestClub::new("app-create-invalid");
        let (_, token) = club.member("Ada", Role::Member);
        let request = json!({ "name": "Budget", "signatories": [] });

        // When
        let response = club.send(multipart_request(&token, request, None)).await;

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Add at least one signatory.");
        let list = json_body(club.send(get_request("/api/documents", &token)).await).await;
        assert_eq!(list.as_array().expect("list").len(), 0);
    }

    #[tokio::test]
    async fn set_approval__should_hide_documents_from_members() {
        // Given
        let club = TestClub::new("app-approval");
        let (_, token) = club.member("Ada", Role::Member);
        let created =
            json_body(club.send(multipart_request(&token, budget_request(), None)).await).await;
        let id = created["id"].as_str().expect("id");

        // When
        let response = club
            .send(json_request(
                "PUT",
                &format!("/api/documents/{id}/approval"),
                &token,
                json!({ "approval": "approved" }),
            ))
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn notifications__should_mark_read_and_clear_over_http() {
        // Given
        let club = TestClub::new("app-inbox");
        let (_, ada_token) = club.member("Ada", Role::Member);
        let (_, bob_token) = club.member("Bob", Role::Member);
        club.send(multipart_request(&ada_token, budget_request(), None))
            .await;
        let inbox = json_body(club.send(get_request("/api/notifications", &bob_token)).await).await;
        let id = inbox["notifications"][0]["id"].as_str().expect("id").to_string();

        // When
        let read = club
            .send(json_request(
                "POST",
                &format!("/api/notifications/{id}/read"),
                &bob_token,
                json!({}),
            ))
            .await;
        let count =
            json_body(club.send(get_request("/api/notifications/unread-count", &bob_token)).await)
                .await;
        let foreign = club
            .send(json_request(
                "POST",
                &format!("/api/notifications/{id}/read"),
                &ada_token,
                json!({}),
            ))
            .await;
        let cleared = club
            .send(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/notifications")
                    .header(AUTHORIZATION, format!("Bearer {bob_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        // Then
        assert_eq!(read.status(), StatusCode::NO_CONTENT);
        assert_eq!(count["unread"], 0);
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(cleared).await["count"], 1);
    }

    #[tokio::test]
    async fn admin_notify__should_require_admin() {
        // Given
        let club = TestClub::new("app-admin-notify");
        let (_, admin_token) = club.member("Ada", Role::Admin);
        let (_, member_token) = club.member("Bob", Role::Member);
        let notice = json!({ "title": "Meeting", "message": "Friday at six" });

        // When
        let sent = club
            .send(json_request(
                "POST",
                "/api/admin/notify",
                &admin_token,
                notice.clone(),
            ))
            .await;
        let refused = club
            .send(json_request("POST", "/api/admin/notify", &member_token, notice))
            .await;

        // Then
        assert_eq!(sent.status(), StatusCode::CREATED);
        assert_eq!(json_body(sent).await["sent"], 1);
        assert_eq!(refused.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn push_endpoints__should_report_unconfigured_push() {
        // Given
        let club = TestClub::new("app-push");
        let (_, token) = club.member("Ada", Role::Member);

        // When
        let key = club.send(get_request("/api/push/public-key", &token)).await;
        let test = club
            .send(json_request("POST", "/api/push/test", &token, json!({})))
            .await;
        let subscribed = club
            .send(json_request(
                "POST",
                "/api/push/subscriptions",
                &token,
                json!({ "endpoint": "https://push.example/1", "p256dh": "p", "auth": "a" }),
            ))
            .await;

        // Then
        assert_eq!(key.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(test.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(subscribed.status(), StatusCode::CREATED);
        assert_eq!(json_body(subscribed).await["endpoint"], "https://push.example/1");
    }

    #[tokio::test]
    async fn live__should_open_event_stream() {
        // Given
        let club = TestClub::new("app-live");
        let (_, token) = club.member("Ada", Role::Member);

        // When
        let response = club
            .send(get_request("/api/notifications/live", &token))
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).expect("content-type"),
            "text/event-stream"
        );
    }

    #[tokio::test]
    async fn service_worker__should_be_public_javascript() {
        // Given
        let club = TestClub::new("app-sw");

        // When
        let response = club
            .send(Request::builder().uri("/sw.js").body(Body::empty()).unwrap())
            .await;

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).expect("content-type"),
            "application/javascript"
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = std::str::from_utf8(&body).expect("utf8 body");
        assert!(body.contains("const APP_NAME = \"Clubsign\";"));
    }
}
