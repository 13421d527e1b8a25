use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use axum::{
    Json, Router,
    extract::{FromRequestParts, Request, State},
    http::{self, HeaderName, HeaderValue, Method, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use platform_api::{ApiError, ApiResult};
use platform_authn::{Authenticator, Credentials, REFRESH_TOKEN_HEADER};
use platform_authz::ActorContext;
use platform_db::{
    AccountService, ChallengeService, DbPool, LikeService, ParticipantService, SessionService,
    TagService,
};
use policies::Policies;
use sea_orm::{ConnectionTrait, Statement};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{config::AppConfig, routes};

#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub sessions: SessionService,
    pub tags: TagService,
    pub challenges: ChallengeService,
    pub participants: ParticipantService,
    pub likes: LikeService,
}

impl Services {
    pub fn new(pool: DbPool) -> Self {
        Self {
            accounts: AccountService::new(pool.clone()),
            sessions: SessionService::new(pool.clone()),
            tags: TagService::new(pool.clone()),
            challenges: ChallengeService::new(pool.clone()),
            participants: ParticipantService::new(pool.clone()),
            likes: LikeService::new(pool),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub authn: Arc<Authenticator>,
    pub policies: Policies,
    pub services: Services,
}

impl AppState {
    pub fn new(pool: DbPool, config: Arc<AppConfig>) -> Self {
        let services = Services::new(pool.clone());
        let policies = Policies::new(Arc::new(services.challenges.clone()));
        let authn = Arc::new(Authenticator::new(config.auth.clone()));
        Self {
            pool,
            config,
            authn,
            policies,
            services,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "challenges api listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            HeaderName::from_static(REFRESH_TOKEN_HEADER),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let authenticated = routes::authenticated()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_actor));
    Router::new()
        .route("/health", get(health_handler))
        .merge(routes::public())
        .merge(authenticated)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Resolve the bearer token into the request's actor before any handler runs.
async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let credentials = match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => Credentials::bearer(bearer.token()),
        None => Credentials::default(),
    };
    let actor = state.authn.authenticate(&credentials)?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// The actor installed by [`require_actor`].
pub struct Actor(pub ActorContext);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActorContext>()
            .cloned()
            .map(Actor)
            .ok_or_else(|| {
                ApiError::internal(anyhow!(
                    "actor context missing; route is not behind authentication"
                ))
            })
    }
}

/// Credentials from the `refresh-token` header, used by refresh and sign-out.
pub fn refresh_credentials(headers: &http::HeaderMap) -> Credentials {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|token| Credentials::refresh(token.trim()))
        .unwrap_or_default()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.pool.get_database_backend();
    let db_ok = state
        .pool
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use platform_authn::AuthConfig;
    use sea_orm::{ConnectOptions, Database};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn test_router() -> Router {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let pool = Database::connect(options).await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        let config = AppConfig {
            auth: AuthConfig {
                jwt_secret: b"0123456789abcdef0123456789abcdef".to_vec(),
                ..AuthConfig::default()
            },
            cors_allowed_origins: Vec::new(),
        };
        build_router(AppState::new(pool, Arc::new(config)))
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Signs up and signs in; returns the account id and the token pair.
    async fn register(router: &Router, email: &str) -> (String, Value) {
        let (status, account) = send(
            router,
            "POST",
            "/auth/sign-up",
            None,
            Some(json!({
                "email": email,
                "password": "correct horse",
                "display_name": "Someone",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, tokens) = send(
            router,
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({ "email": email, "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (account["id"].as_str().unwrap().to_string(), tokens)
    }

    fn access(tokens: &Value) -> &str {
        tokens["access_token"].as_str().unwrap()
    }

    #[tokio::test]
    async fn health_reports_database() {
        let router = test_router().await;
        let (status, body) = send(&router, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["db_ok"], true);
    }

    #[tokio::test]
    async fn missing_bearer_is_unauthenticated() {
        let router = test_router().await;
        let (status, body) = send(&router, "GET", "/tags", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthenticated() {
        let router = test_router().await;
        register(&router, "ada@example.com").await;
        let (status, _) = send(
            &router,
            "POST",
            "/auth/sign-in",
            None,
            Some(json!({ "email": "ada@example.com", "password": "battery staple" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn owner_updates_own_account_but_not_others() {
        let router = test_router().await;
        let (ada, ada_tokens) = register(&router, "ada@example.com").await;
        let (grace, _) = register(&router, "grace@example.com").await;

        let (status, body) = send(
            &router,
            "PATCH",
            &format!("/accounts/{ada}"),
            Some(access(&ada_tokens)),
            Some(json!({ "display_name": "Ada", "bio": "engines" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Ada");
        assert_eq!(body["bio"], "engines");

        let (status, body) = send(
            &router,
            "PATCH",
            &format!("/accounts/{grace}"),
            Some(access(&ada_tokens)),
            Some(json!({ "display_name": "Mallory" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["resource"], "account");
        assert_eq!(body["action"], "update");

        let (status, _) = send(
            &router,
            "GET",
            &format!("/accounts/{grace}/sensitive"),
            Some(access(&ada_tokens)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn only_owner_edits_challenge_and_likes_are_unique() {
        let router = test_router().await;
        let (_, owner) = register(&router, "owner@example.com").await;
        let (other_id, other) = register(&router, "other@example.com").await;

        let (status, challenge) = send(
            &router,
            "POST",
            "/challenges",
            Some(access(&owner)),
            Some(json!({ "title": "Run 5k", "description": "every day" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = challenge["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            "PATCH",
            &format!("/challenges/{id}"),
            Some(access(&other)),
            Some(json!({ "title": "Run 1k" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["resource"], "challenge");

        let (status, _) = send(
            &router,
            "PUT",
            &format!("/challenges/{id}/likes"),
            Some(access(&other)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(
            &router,
            "PUT",
            &format!("/challenges/{id}/likes"),
            Some(access(&other)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _) = send(
            &router,
            "DELETE",
            &format!("/challenges/{id}/likes/{other_id}"),
            Some(access(&owner)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &router,
            "GET",
            &format!("/challenges/{id}"),
            Some(access(&other)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], 1);
    }

    #[tokio::test]
    async fn tag_connection_requires_challenge_owner() {
        let router = test_router().await;
        let (_, owner) = register(&router, "owner@example.com").await;
        let (_, other) = register(&router, "other@example.com").await;

        let (_, challenge) = send(
            &router,
            "POST",
            "/challenges",
            Some(access(&owner)),
            Some(json!({ "title": "Read daily" })),
        )
        .await;
        let id = challenge["id"].as_str().unwrap().to_string();
        let (status, tag) = send(
            &router,
            "POST",
            "/tags",
            Some(access(&other)),
            Some(json!({ "name": " Books " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(tag["name"], "books");
        let tag_id = tag["id"].as_str().unwrap().to_string();

        let uri = format!("/challenges/{id}/tags/{tag_id}");
        let (status, _) = send(&router, "PUT", &uri, Some(access(&other)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&router, "PUT", &uri, Some(access(&owner)), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &router,
            "DELETE",
            &format!("/tags/{tag_id}"),
            Some(access(&owner)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_out_refresh_token_is_rejected() {
        let router = test_router().await;
        let (_, tokens) = register(&router, "ada@example.com").await;
        let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();
        let refresh_request = |uri: &str| {
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(REFRESH_TOKEN_HEADER, refresh_token.as_str())
                .body(Body::empty())
                .unwrap()
        };

        let response = router
            .clone()
            .oneshot(refresh_request("/auth/refresh"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(refresh_request("/auth/sign-out"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .clone()
            .oneshot(refresh_request("/auth/refresh"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_bearer() {
        let router = test_router().await;
        let (_, tokens) = register(&router, "ada@example.com").await;
        let refresh_token = tokens["refresh_token"].as_str().unwrap();
        let (status, _) = send(&router, "GET", "/tags", Some(refresh_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
