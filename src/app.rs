use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, feedback, paytypes, pos, products, transactions, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(pos::router())
                .merge(transactions::router())
                .merge(users::router())
                .merge(products::router())
                .merge(paytypes::router())
                .merge(feedback::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
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
        body::{to_bytes, Body},
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::{repo_types::Role, services::{create_account, JwtKeys}};
    use crate::memory::MemoryStore;
    use crate::paytypes::repo::PaytypeRepo;
    use crate::products::repo::ProductRepo;
    use crate::users::repo::UserRepo;

    fn demo_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::demo().unwrap());
        (AppState::from_store(AppState::test_config(), store.clone()), store)
    }

    fn token(state: &AppState, role: Role) -> String {
        JwtKeys::from_ref(state)
            .sign_access(Uuid::new_v4(), role)
            .unwrap()
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = build_app(AppState::fake());
        let (status, _) = send(&app, request("GET", "/api/v1/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn pos_routes_require_a_token() {
        let app = build_app(AppState::fake());
        let (status, _) = send(&app, request("GET", "/api/v1/posdata", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn posdata_returns_all_collections() {
        let (state, _) = demo_state();
        let t = token(&state, Role::Cashier);
        let app = build_app(state);

        let (status, body) = send(&app, request("GET", "/api/v1/posdata", Some(&t), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"].as_array().unwrap().len(), 3);
        assert_eq!(body["users"][0]["full_name"], "Jaan Kask");
        assert_eq!(body["users"][0]["status"]["name"], "member");
        assert_eq!(body["products"].as_array().unwrap().len(), 3);
        assert_eq!(body["paytypes"].as_array().unwrap().len(), 2);
        assert!(body["transactions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pay_then_void_over_http() {
        let (state, store) = demo_state();
        let t = token(&state, Role::Cashier);
        let mari = UserRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|u| u.first_name == "Mari")
            .unwrap();
        let account = PaytypeRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.affects_balance)
            .unwrap();
        let coffee = ProductRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == "Coffee")
            .unwrap();
        let app = build_app(state);

        let pay = json!({
            "user": mari.id,
            "paytype": account.id,
            "products": [{ "product": coffee.id, "quantity": "2" }],
        });
        let res = app
            .clone()
            .oneshot(request("POST", "/api/v1/transactions", Some(&t), Some(pay)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers()[header::LOCATION].to_str().unwrap().to_string();
        let body: Value =
            serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        let id = body["id"].as_str().unwrap().to_string();
        assert_eq!(location, format!("/api/v1/transactions/{id}"));
        assert_eq!(UserRepo::get(&*store, mari.id).await.unwrap().unwrap().balance, dec!(-3));

        let (status, view) = send(&app, request("GET", &location, Some(&t), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["user"], "Mari Tamm");

        let void_uri = format!("/api/v1/transactions/{id}/invalid");
        let (status, view) = send(&app, request("POST", &void_uri, Some(&t), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["invalid"], true);
        assert_eq!(UserRepo::get(&*store, mari.id).await.unwrap().unwrap().balance, dec!(0));
        assert_eq!(ProductRepo::get(&*store, coffee.id).await.unwrap().unwrap().quantity, 40);

        let (status, body) = send(&app, request("POST", &void_uri, Some(&t), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_invalid");
    }

    #[tokio::test]
    async fn unknown_transaction_is_404() {
        let state = AppState::fake();
        let t = token(&state, Role::Cashier);
        let app = build_app(state);
        let uri = format!("/api/v1/transactions/{}", Uuid::new_v4());
        let (status, body) = send(&app, request("GET", &uri, Some(&t), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn reset_is_admin_only() {
        let state = AppState::fake();
        let cashier = token(&state, Role::Cashier);
        let admin = token(&state, Role::Admin);
        let app = build_app(state);

        let (status, _) = send(&app, request("DELETE", "/api/v1/transactions", Some(&cashier), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, request("DELETE", "/api/v1/transactions", Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 0);
    }

    #[tokio::test]
    async fn login_and_me() {
        let state = AppState::fake();
        create_account(state.accounts.as_ref(), "kassa@leola.ee", "till-password", Role::Cashier)
            .await
            .unwrap();
        let app = build_app(state);

        let creds = json!({ "email": "Kassa@Leola.ee", "password": "till-password" });
        let (status, body) = send(&app, request("POST", "/api/v1/auth/login", None, Some(creds))).await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access_token"].as_str().unwrap().to_string();
        let refresh = body["refresh_token"].as_str().unwrap().to_string();

        let (status, me) = send(&app, request("GET", "/api/v1/me", Some(&access), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "kassa@leola.ee");
        assert_eq!(me["role"], "cashier");

        // refresh tokens are not accepted as bearer tokens
        let (status, _) = send(&app, request("GET", "/api/v1/me", Some(&refresh), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/auth/refresh", None, Some(json!({ "refresh_token": refresh }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].is_string());

        let wrong = json!({ "email": "kassa@leola.ee", "password": "nope-nope" });
        let (status, _) = send(&app, request("POST", "/api/v1/auth/login", None, Some(wrong))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn feedback_rejects_blank_and_stores_text() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::from_store(AppState::test_config(), store.clone());
        let t = token(&state, Role::Cashier);
        let app = build_app(state);

        let (status, _) = send(
            &app,
            request("POST", "/api/v1/feedback", Some(&t), Some(json!({ "content": "   " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/feedback", Some(&t), Some(json!({ "content": "More tea" }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["content"], "More tea");
        assert_eq!(store.feedback_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn user_stats_over_http() {
        let (state, store) = demo_state();
        let t = token(&state, Role::Cashier);
        let liis = UserRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|u| u.first_name == "Liis")
            .unwrap();
        let app = build_app(state);

        let uri = format!("/api/v1/users/{}/stats", liis.id);
        let (status, body) = send(&app, request("GET", &uri, Some(&t), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Liis Saar");
        assert_eq!(body["transaction_count"], 0);
    }

    fn id_of(body: &Value) -> String {
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn catalogue_writes_are_admin_only() {
        let state = AppState::fake();
        let cashier = token(&state, Role::Cashier);
        let app = build_app(state);

        let product = json!({ "name": "Tea", "price": "1.50" });
        let (status, _) = send(&app, request("POST", "/api/v1/products", Some(&cashier), Some(product))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, request("POST", "/api/v1/statuses", Some(&cashier), Some(json!({ "name": "x" })))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_sets_up_a_till_from_scratch() {
        let state = AppState::fake();
        let admin = token(&state, Role::Admin);
        let cashier = token(&state, Role::Cashier);
        let users = state.users.clone();
        let app = build_app(state);

        let (status, body) = send(&app, request("POST", "/api/v1/statuses", Some(&admin), Some(json!({ "name": "member" })))).await;
        assert_eq!(status, StatusCode::CREATED);
        let member = id_of(&body);
        let (status, _) = send(&app, request("POST", "/api/v1/statuses", Some(&admin), Some(json!({ "name": "member" })))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let stray = json!({ "first_name": "Jaan", "status": Uuid::new_v4() });
        let (status, _) = send(&app, request("POST", "/api/v1/users", Some(&admin), Some(stray))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mari = json!({ "first_name": "Mari", "last_name": "Tamm", "status": member });
        let (status, body) = send(&app, request("POST", "/api/v1/users", Some(&admin), Some(mari))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"]["name"], "member");
        let user = id_of(&body);

        let tea = json!({ "name": "Tea", "price": "1.50", "quantity": 5 });
        let (status, body) = send(&app, request("POST", "/api/v1/products", Some(&admin), Some(tea))).await;
        assert_eq!(status, StatusCode::CREATED);
        let tea = id_of(&body);

        let account = json!({ "name": "Account", "affects_balance": true, "allowed_statuses": [member] });
        let (status, body) = send(&app, request("POST", "/api/v1/paytypes", Some(&admin), Some(account))).await;
        assert_eq!(status, StatusCode::CREATED);
        let account = id_of(&body);

        let deposit_uri = format!("/api/v1/users/{user}/deposit");
        let (status, _) = send(&app, request("POST", &deposit_uri, Some(&admin), Some(json!({ "amount": 10 })))).await;
        assert_eq!(status, StatusCode::OK);

        let pay = json!({ "user": user, "paytype": account, "products": [{ "product": tea, "quantity": 2 }] });
        let (status, body) = send(&app, request("POST", "/api/v1/transactions", Some(&cashier), Some(pay))).await;
        assert_eq!(status, StatusCode::CREATED);
        let sale = id_of(&body);
        let user_id: Uuid = user.parse().unwrap();
        assert_eq!(users.get(user_id).await.unwrap().unwrap().balance, dec!(7));

        // referenced by a valid sale
        for uri in [
            format!("/api/v1/products/{tea}"),
            format!("/api/v1/paytypes/{account}"),
            format!("/api/v1/users/{user}"),
        ] {
            let (status, _) = send(&app, request("DELETE", &uri, Some(&admin), None)).await;
            assert_eq!(status, StatusCode::CONFLICT, "{uri}");
        }

        let void_uri = format!("/api/v1/transactions/{sale}/invalid");
        let (status, _) = send(&app, request("POST", &void_uri, Some(&cashier), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.get(user_id).await.unwrap().unwrap().balance, dec!(10));

        let tea_uri = format!("/api/v1/products/{tea}");
        let (status, _) = send(&app, request("DELETE", &tea_uri, Some(&admin), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("GET", &tea_uri, Some(&cashier), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let user_uri = format!("/api/v1/users/{user}");
        let renamed = json!({ "first_name": "Maria", "last_name": "Tamm", "status": member });
        let (status, body) = send(&app, request("PUT", &user_uri, Some(&admin), Some(renamed))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Maria Tamm");

        let status_uri = format!("/api/v1/statuses/{member}");
        let (status, _) = send(&app, request("DELETE", &status_uri, Some(&admin), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = send(&app, request("GET", &user_uri, Some(&cashier), None)).await;
        assert!(body["status"].is_null());

        let missing = format!("/api/v1/paytypes/{}", Uuid::new_v4());
        let (status, _) = send(&app, request("PUT", &missing, Some(&admin), Some(json!({ "name": "Card" })))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_quantity_is_rejected_over_http() {
        let (state, store) = demo_state();
        let t = token(&state, Role::Cashier);
        let mari = UserRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|u| u.first_name == "Mari")
            .unwrap();
        let cash = PaytypeRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|p| !p.affects_balance)
            .unwrap();
        let coffee = ProductRepo::list(&*store)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == "Coffee")
            .unwrap();
        let app = build_app(state);

        let pay = json!({
            "user": mari.id,
            "paytype": cash.id,
            "products": [{ "product": coffee.id, "quantity": i32::MAX }],
        });
        let (status, body) = send(&app, request("POST", "/api/v1/transactions", Some(&t), Some(pay))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(ProductRepo::get(&*store, coffee.id).await.unwrap().unwrap().quantity, 40);
    }
}
