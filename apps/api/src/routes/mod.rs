pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::attachments::handlers as attachments;
use crate::auth::handlers as auth;
use crate::profile::handlers as profile;
use crate::public::handlers as public;
use crate::state::AppState;

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.attachments.policy().max_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Session
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/session", get(auth::handle_session))
        .route(
            "/api/v1/preferences",
            get(auth::handle_get_preferences).put(auth::handle_update_preferences),
        )
        // Profile editor
        .route("/api/v1/profile", get(profile::handle_get_profile))
        .route(
            "/api/v1/profile/fields",
            patch(profile::handle_update_field),
        )
        .route(
            "/api/v1/profile/save-status",
            get(profile::handle_save_status),
        )
        .route("/api/v1/profile/flush", post(profile::handle_flush))
        .route("/api/v1/profile/photo", post(profile::handle_upload_photo))
        .route(
            "/api/v1/profile/sections/:section/draft",
            post(profile::handle_draft_entry),
        )
        .route(
            "/api/v1/profile/sections/:section/entries",
            put(profile::handle_save_entry),
        )
        .route(
            "/api/v1/profile/sections/:section/entries/:id",
            delete(profile::handle_delete_entry),
        )
        .route(
            "/api/v1/profile/sections/:section/entries/:id/move",
            post(profile::handle_move_entry),
        )
        .route(
            "/api/v1/profile/tabs",
            get(profile::handle_list_tabs).post(profile::handle_add_tab),
        )
        .route(
            "/api/v1/profile/tabs/:id",
            patch(profile::handle_rename_tab).delete(profile::handle_delete_tab),
        )
        .route(
            "/api/v1/profile/tabs/:id/move",
            post(profile::handle_move_tab),
        )
        .route(
            "/api/v1/profile/custom-fields/:id/file",
            post(profile::handle_custom_field_file),
        )
        .route(
            "/api/v1/profile/custom-fields/:id/url",
            put(profile::handle_custom_field_url),
        )
        // Attachments
        .route("/api/v1/attachments", post(attachments::handle_upload))
        .route(
            "/api/v1/attachments/url",
            post(attachments::handle_accept_url),
        )
        // Public homepage
        .route(
            "/api/v1/public/profile",
            get(public::handle_public_profile),
        )
        .route(
            "/api/v1/public/profile/export",
            get(public::handle_export),
        )
        .route("/api/v1/public/profile/copy", get(public::handle_copy))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DEMO_PASSWORD, DEMO_USERNAME};
    use crate::test_support::{test_app, TestApp};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn call(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn multipart(file_name: &str, mime: &str, content: &str) -> (String, Body) {
        let boundary = "cv-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {mime}\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        (
            format!("multipart/form-data; boundary={boundary}"),
            Body::from(body),
        )
    }

    fn upload(uri: &str, token: &str, file_name: &str, mime: &str, content: &str) -> Request<Body> {
        let (content_type, body) = multipart(file_name, mime, content);
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap()
    }

    async fn save_skill(router: &Router, token: &str, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let res = call(
            router,
            request(
                Method::PUT,
                "/api/v1/profile/sections/skills/entries",
                Some(token),
                Some(json!({ "id": id, "name": name })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        id
    }

    async fn setup() -> (TestApp, Router) {
        let app = test_app();
        let router = build_router(app.state.clone());
        (app, router)
    }

    async fn login(router: &Router) -> String {
        let res = call(
            router,
            request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": DEMO_USERNAME, "password": DEMO_PASSWORD })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        json_body(res).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (_app, router) = setup().await;
        let res = call(&router, request(Method::GET, "/health", None, None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_demo_login_unlocks_profile() {
        let (_app, router) = setup().await;
        let token = login(&router).await;

        let res = call(&router, request(Method::GET, "/api/v1/profile", Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert!(body["document"]["tabs"].as_array().unwrap().len() >= 11);

        let res = call(&router, request(Method::GET, "/api/v1/auth/session", Some(&token), None)).await;
        let body = json_body(res).await;
        assert_eq!(body["state"], "logged_in");
        assert_eq!(body["session"]["subject_name"], "Demo User");
    }

    #[tokio::test]
    async fn test_bad_login_is_generic() {
        let (_app, router) = setup().await;
        let res = call(
            &router,
            request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": "owner", "password": "nope" })),
            ),
        )
        .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_protected_route_requires_login() {
        let (_app, router) = setup().await;

        let res = call(&router, request(Method::GET, "/api/v1/profile", None, None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(res).await;
        assert_eq!(body["error"]["code"], "LOGIN_REQUIRED");
        assert!(body.get("document").is_none());

        let garbage = Uuid::new_v4().to_string();
        let res = call(&router, request(Method::GET, "/api/v1/profile", Some(&garbage), None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_tampered_flag_requires_login() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let key = format!("session:{token}:authenticated");
        app.flags.insert_raw(&key, "true");

        let res = call(&router, request(Method::GET, "/api/v1/profile", Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"]["code"], "LOGIN_REQUIRED");
        assert!(app.flags.keys().iter().all(|k| !k.contains(&token)));
    }

    #[tokio::test]
    async fn test_logout_flushes_pending_edits() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let res = call(
            &router,
            request(
                Method::PATCH,
                "/api/v1/profile/fields",
                Some(&token),
                Some(json!({ "path": "/basic_info/full_name", "value": "Ada Lovelace" })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(app.profiles.writes().is_empty());

        let res = call(&router, request(Method::POST, "/api/v1/auth/logout", Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::OK);

        let writes = app.profiles.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].basic_info.full_name, "Ada Lovelace");

        let res = call(&router, request(Method::GET, "/api/v1/profile", Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_view_shows_only_persisted_data() {
        let (_app, router) = setup().await;
        let token = login(&router).await;

        call(
            &router,
            request(
                Method::PATCH,
                "/api/v1/profile/fields",
                Some(&token),
                Some(json!({ "path": "/basic_info/headline", "value": "Engineer" })),
            ),
        )
        .await;

        let res = call(&router, request(Method::GET, "/api/v1/public/profile", None, None)).await;
        assert_eq!(json_body(res).await["basic_info"]["headline"], "");

        let res = call(&router, request(Method::POST, "/api/v1/profile/flush", Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["state"], "saved");

        let res = call(&router, request(Method::GET, "/api/v1/public/profile", None, None)).await;
        assert_eq!(json_body(res).await["basic_info"]["headline"], "Engineer");

        let res = call(
            &router,
            request(
                Method::GET,
                "/api/v1/public/profile/copy?path=/basic_info/headline",
                None,
                None,
            ),
        )
        .await;
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Engineer");
    }

    #[tokio::test]
    async fn test_markdown_export_is_a_download() {
        let (_app, router) = setup().await;
        let res = call(
            &router,
            request(Method::GET, "/api/v1/public/profile/export?format=markdown", None, None),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment"));

        let res = call(
            &router,
            request(Method::GET, "/api/v1/public/profile/export?format=pdf", None, None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_section_entry_lifecycle() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let res = call(
            &router,
            request(Method::POST, "/api/v1/profile/sections/skills/draft", Some(&token), None),
        )
        .await;
        let mut draft = json_body(res).await;
        assert_eq!(draft["order"], 0);
        assert_eq!(app.state.profile.snapshot().await.skills.len(), 0);

        draft["name"] = json!("   ");
        let res = call(
            &router,
            request(
                Method::PUT,
                "/api/v1/profile/sections/skills/entries",
                Some(&token),
                Some(draft.clone()),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.state.profile.snapshot().await.skills.len(), 0);

        draft["name"] = json!("Rust");
        let res = call(
            &router,
            request(
                Method::PUT,
                "/api/v1/profile/sections/skills/entries",
                Some(&token),
                Some(draft.clone()),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let id = draft["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/profile/sections/skills/entries/{id}");
        let res = call(&router, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let res = call(&router, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejected_file_keeps_previous_custom_value() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let id = Uuid::new_v4();
        let res = call(
            &router,
            request(
                Method::PUT,
                "/api/v1/profile/sections/custom_fields/entries",
                Some(&token),
                Some(json!({
                    "id": id,
                    "label": "Portfolio",
                    "value": { "type": "url", "value": "https://example.com/old" }
                })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let (content_type, body) = multipart("payload.exe", "application/octet-stream", "MZ");
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/profile/custom-fields/{id}/file"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        let res = call(&router, req).await;
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        assert!(app.objects.puts().is_empty());
        let doc = app.state.profile.snapshot().await;
        assert_eq!(doc.custom_fields[0].value.display(), "https://example.com/old");
    }

    #[tokio::test]
    async fn test_custom_field_file_upload_stores_reference() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let id = Uuid::new_v4();
        call(
            &router,
            request(
                Method::PUT,
                "/api/v1/profile/sections/custom_fields/entries",
                Some(&token),
                Some(json!({ "id": id, "label": "CV", "value": { "type": "text", "value": "soon" } })),
            ),
        )
        .await;

        let (content_type, body) = multipart("cv.pdf", "application/pdf", "%PDF-1.7");
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/profile/custom-fields/{id}/file"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        let res = call(&router, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["data"]["value"]["type"], "file");

        assert_eq!(app.objects.puts().len(), 1);
    }

    #[tokio::test]
    async fn test_preferences_validate_tab() {
        let (_app, router) = setup().await;
        let token = login(&router).await;

        let res = call(
            &router,
            request(
                Method::PUT,
                "/api/v1/preferences",
                Some(&token),
                Some(json!({ "theme": "dark", "active_tab": "skills" })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["theme"], "dark");
        assert_eq!(body["active_tab"], "skills");

        let res = call(
            &router,
            request(
                Method::PUT,
                "/api/v1/preferences",
                Some(&token),
                Some(json!({ "active_tab": "no-such-tab" })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_field_patch_keeps_entry_rules() {
        let (app, router) = setup().await;
        let token = login(&router).await;
        let id = save_skill(&router, &token, "Rust").await;

        let res = call(
            &router,
            request(
                Method::PATCH,
                "/api/v1/profile/fields",
                Some(&token),
                Some(json!({ "path": format!("/skills/{id}/name"), "value": "  " })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(app.state.profile.snapshot().await.skills[0].name, "Rust");
    }

    #[tokio::test]
    async fn test_move_entry_reorders_section() {
        let (_app, router) = setup().await;
        let token = login(&router).await;
        let first = save_skill(&router, &token, "Rust").await;
        let second = save_skill(&router, &token, "SQL").await;
        let third = save_skill(&router, &token, "Go").await;

        let res = call(
            &router,
            request(
                Method::POST,
                &format!("/api/v1/profile/sections/skills/entries/{third}/move"),
                Some(&token),
                Some(json!({ "position": 0 })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        let entries = body["data"].as_array().unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec![third.as_str(), first.as_str(), second.as_str()]);
        let orders: Vec<u64> = entries.iter().map(|e| e["order"].as_u64().unwrap()).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        let res = call(
            &router,
            request(
                Method::POST,
                &format!("/api/v1/profile/sections/skills/entries/{}/move", Uuid::new_v4()),
                Some(&token),
                Some(json!({ "position": 0 })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_tab_add_move_delete() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let res = call(
            &router,
            request(Method::POST, "/api/v1/profile/tabs", Some(&token), Some(json!({ "label": "Projects" }))),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let tab_id = json_body(res).await["data"]["id"].as_str().unwrap().to_string();

        let res = call(
            &router,
            request(
                Method::POST,
                &format!("/api/v1/profile/tabs/{tab_id}/move"),
                Some(&token),
                Some(json!({ "position": 0 })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["data"][0]["id"], tab_id.as_str());

        let res = call(&router, request(Method::DELETE, "/api/v1/profile/tabs/skills", Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let uri = format!("/api/v1/profile/tabs/{tab_id}");
        let res = call(&router, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let res = call(&router, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let doc = app.state.profile.snapshot().await;
        assert!(doc.tabs.iter().all(|t| t.id != tab_id));
        assert!(doc.tabs.iter().any(|t| t.id == "skills"));
    }

    #[tokio::test]
    async fn test_photo_accepts_images_only() {
        let (app, router) = setup().await;
        let token = login(&router).await;

        let res = call(&router, upload("/api/v1/profile/photo", &token, "cv.pdf", "application/pdf", "%PDF")).await;
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(app.objects.puts().is_empty());
        assert!(app.state.profile.snapshot().await.basic_info.photo.is_none());

        let res = call(&router, upload("/api/v1/profile/photo", &token, "me.png", "image/png", "PNG")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(app.objects.puts().len(), 1);
        let photo = app.state.profile.snapshot().await.basic_info.photo.unwrap();
        assert_eq!(photo.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_attachment_url_must_be_absolute() {
        let (_app, router) = setup().await;
        let token = login(&router).await;

        let res = call(
            &router,
            request(
                Method::POST,
                "/api/v1/attachments/url",
                Some(&token),
                Some(json!({ "url": "not a url" })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"]["code"], "ATTACHMENT_ERROR");

        let res = call(
            &router,
            request(
                Method::POST,
                "/api/v1/attachments/url",
                Some(&token),
                Some(json!({ "url": "https://example.com/cv.pdf" })),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["content_type"], "application/pdf");
    }
}
