use std::net::SocketAddr;

use axum::{extract::MatchedPath, http::Request, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, products, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        route = route_of(req),
                        uri = %req.uri(),
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Route template the request matched, e.g. `/products/:id`.
fn route_of<B>(req: &Request<B>) -> &str {
    req.extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched")
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{images::services::MAX_UPLOAD_BYTES, storage::fake::FakeStorage};

    const BOUNDARY: &str = "storefront-boundary";

    fn app() -> (Router, Arc<FakeStorage>) {
        let (state, storage) = AppState::fake();
        (build_app(state), storage)
    }

    async fn json_body(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn multipart_request(uri: &str, token: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pic.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn registration(email: &str) -> Value {
        json!({
            "email": email,
            "password": "password123",
            "first_name": "John",
            "last_name": "Doe"
        })
    }

    fn chair(model: &str) -> Value {
        json!({
            "product_name": "Chair",
            "product_model": model,
            "price": 10.0,
            "description": "wooden chair"
        })
    }

    /// Registers a user, logs in and returns (token, user id).
    async fn signed_in(app: &Router, email: &str) -> (String, String) {
        let res = app
            .clone()
            .oneshot(json_request("POST", "/users", None, registration(email)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let id = json_body(res).await["data"]["_id"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/login",
                None,
                json!({ "email": email, "password": "password123" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let token = json_body(res).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string();
        (token, id)
    }

    async fn create_chair(app: &Router, token: &str, model: &str) -> String {
        let res = app
            .clone()
            .oneshot(json_request("POST", "/products", Some(token), chair(model)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        json_body(res).await["data"]["_id"].as_str().unwrap().to_string()
    }

    #[test]
    fn unrouted_request_is_labelled_unmatched() {
        let req = Request::builder().uri("/nowhere").body(()).unwrap();
        assert_eq!(route_of(&req), "unmatched");
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app();
        let res = app.oneshot(bare_request("GET", "/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn registration_returns_201_without_password() {
        let (app, _) = app();
        let res = app
            .clone()
            .oneshot(json_request("POST", "/users", None, registration("a@example.com")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let body = json_body(res).await;
        assert_eq!(body["data"]["email"], "a@example.com");
        assert!(body["data"].get("password").is_none());

        let again = app
            .oneshot(json_request("POST", "/users", None, registration("a@example.com")))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_registration_lists_every_field() {
        let (app, _) = app();
        let res = app
            .oneshot(json_request(
                "POST",
                "/users",
                None,
                json!({ "email": "nope", "password": "short", "first_name": "", "last_name": "Doe" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = json_body(res).await;
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Validation failed"));
        for field in ["email", "password", "first_name"] {
            assert!(message.contains(field), "{field} missing from {message}");
            assert!(body["errors"].get(field).is_some());
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, _) = app();
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_and_bad_tokens() {
        let (app, _) = app();

        let res = app.clone().oneshot(bare_request("GET", "/me", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["message"], "Authentication token missing");

        let res = app
            .clone()
            .oneshot(bare_request("GET", "/users", Some("not-a-jwt")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["message"], "Wrong authentication token");

        let req = Request::builder()
            .method("GET")
            .uri("/me")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_refused() {
        let (app, _) = app();
        let (token, id) = signed_in(&app, "gone@example.com").await;

        let res = app
            .clone()
            .oneshot(bare_request("DELETE", &format!("/users/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app.oneshot(bare_request("GET", "/me", Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["message"], "User no longer exists");
    }

    #[tokio::test]
    async fn login_sets_cookie_and_logout_clears_it() {
        let (app, _) = app();
        signed_in(&app, "cookie@example.com").await;

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/login",
                None,
                json!({ "email": "cookie@example.com", "password": "password123" }),
            ))
            .await
            .unwrap();
        let cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("Authorization="));
        let token = json_body(res).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let res = app
            .clone()
            .oneshot(bare_request("POST", "/auth/logout", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cleared = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let res = app
            .oneshot(json_request(
                "POST",
                "/auth/login",
                None,
                json!({ "email": "cookie@example.com", "password": "wrong-password" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_targets_the_caller() {
        let (app, _) = app();
        let (token, id) = signed_in(&app, "me@example.com").await;

        let res = app
            .clone()
            .oneshot(json_request("PUT", "/users", Some(&token), json!({ "first_name": "Jane" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(bare_request("GET", &format!("/users/{id}"), Some(&token)))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["data"]["first_name"], "Jane");
        assert_eq!(body["data"]["last_name"], "Doe");
    }

    #[tokio::test]
    async fn invalid_and_unknown_ids() {
        let (app, _) = app();
        let (token, _) = signed_in(&app, "ids@example.com").await;

        let res = app
            .clone()
            .oneshot(bare_request("GET", "/users/not-a-uuid", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(bare_request(
                "GET",
                &format!("/products/{}", uuid::Uuid::new_v4()),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn product_writes_require_auth_and_pair_is_unique() {
        let (app, _) = app();

        let res = app
            .clone()
            .oneshot(json_request("POST", "/products", None, chair("A1")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let (token, _) = signed_in(&app, "seller@example.com").await;
        create_chair(&app, &token, "A1").await;

        let res = app
            .clone()
            .oneshot(json_request("POST", "/products", Some(&token), chair("A1")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        create_chair(&app, &token, "A2").await;
        let res = app
            .oneshot(bare_request("GET", "/products/name/Chair", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_listing_is_ok_but_name_miss_is_not_found() {
        let (app, _) = app();

        let res = app.clone().oneshot(bare_request("GET", "/products", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["data"], json!([]));

        let res = app
            .oneshot(bare_request("GET", "/products/name/Lamp", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn review_defaults_to_caller_name_and_update_keeps_it() {
        let (app, _) = app();
        let (token, _) = signed_in(&app, "critic@example.com").await;
        let id = create_chair(&app, &token, "A1").await;

        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/products/{id}/review"),
                Some(&token),
                json!({ "review": "sturdy" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["data"]["reviews"][0]["name"], "John Doe");
        assert_eq!(body["data"]["reviews"][0]["review"], "sturdy");

        let res = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/products/{id}"),
                Some(&token),
                json!({ "price": 12.5, "reviews": [] }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["data"]["price"], 12.5);
        assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 1);

        let res = app
            .oneshot(json_request(
                "POST",
                &format!("/products/{id}/review"),
                Some(&token),
                json!({ "review": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_product_then_lookup_is_not_found() {
        let (app, _) = app();
        let (token, _) = signed_in(&app, "del@example.com").await;
        let id = create_chair(&app, &token, "A1").await;

        let res = app
            .clone()
            .oneshot(bare_request("DELETE", &format!("/products/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(bare_request("GET", &format!("/products/{id}"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_upload_stores_image_and_sets_url() {
        let (app, storage) = app();
        let (token, id) = signed_in(&app, "pic@example.com").await;

        let res = app
            .clone()
            .oneshot(multipart_request("/users/upload", &token, "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let key = format!("uploads/profile/{id}-pic.png");
        assert_eq!(storage.keys(), vec![key.clone()]);
        let body = json_body(res).await;
        assert_eq!(body["data"]["image"], format!("https://fake.local/{key}"));

        let res = app
            .oneshot(multipart_request("/users/upload", &token, "text/plain", b"hello"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["message"], "File must be of image type");
        assert_eq!(storage.keys().len(), 1);
    }

    #[tokio::test]
    async fn oversized_upload_is_refused_before_storage() {
        let (app, storage) = app();
        let (token, _) = signed_in(&app, "big@example.com").await;

        let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let res = app
            .oneshot(multipart_request("/users/upload", &token, "image/png", &oversized))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(res).await["message"], "File exceeds the 5 MiB limit");
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn product_upload_requires_existing_product() {
        let (app, storage) = app();
        let (token, _) = signed_in(&app, "shop@example.com").await;

        let missing = uuid::Uuid::new_v4();
        let res = app
            .clone()
            .oneshot(multipart_request(
                &format!("/products/upload/{missing}"),
                &token,
                "image/jpeg",
                b"jpeg",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(storage.keys().is_empty());

        let id = create_chair(&app, &token, "A1").await;
        let res = app
            .oneshot(multipart_request(
                &format!("/products/upload/{id}"),
                &token,
                "image/jpeg",
                b"jpeg",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(
            body["data"]["product_image"],
            format!("https://fake.local/uploads/products/{id}-pic.png")
        );
    }
}
