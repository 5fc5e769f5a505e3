#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Router fixture: migrated in-memory database, the CRM routes and the real
//! auth middleware in front of them.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::middleware::from_fn_with_state;
use chrono::Utc;
use clinic_auth::{AuthConfig, AuthState, JwtCodec, auth_middleware};
use clinic_crm::infra::storage::entities::{clinic, user};
use clinic_crm::{CrmConfig, CrmModule};
use clinic_db::{DbConfig, connect};
use clinic_security::{Actor, Role};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestContext {
    pub router: Router,
    pub db: DatabaseConnection,
    pub codec: Arc<JwtCodec>,
    pub config: CrmConfig,
}

pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Value,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(CrmConfig::default()).await
    }

    pub async fn with_config(config: CrmConfig) -> Self {
        let db = connect(&DbConfig::in_memory()).await.expect("sqlite");
        CrmModule::migrate(&db).await.expect("migrations");

        let auth = AuthConfig::default();
        let codec = Arc::new(JwtCodec::new(&auth));
        let module = CrmModule::init(db.clone(), config.clone());
        let router = module
            .register_rest(Router::new())
            .layer(from_fn_with_state(
                AuthState::new(Arc::clone(&codec), module.actor_resolver(), &auth.ip_hash_salt),
                auth_middleware,
            ));

        Self {
            router,
            db,
            codec,
            config,
        }
    }

    pub async fn clinic(&self, slug: &str) -> clinic::Model {
        let now = Utc::now();
        clinic::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(slug.to_owned()),
            slug: Set(slug.to_owned()),
            logo_url: Set(None),
            country: Set("Albania".to_owned()),
            timezone: Set("Europe/Tirane".to_owned()),
            default_currency: Set("EUR".to_owned()),
            default_language: Set("en".to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    /// Insert a user and mint a bearer token for them.
    pub async fn token(&self, clinic_id: Uuid, role: Role) -> String {
        self.member(clinic_id, role).await.1
    }

    /// Like [`Self::token`], also returning the new user's id.
    pub async fn member(&self, clinic_id: Uuid, role: Role) -> (Uuid, String) {
        let now = Utc::now();
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            clinic_id: Set(clinic_id),
            full_name: Set(format!("{} user", role.as_str())),
            email: Set(format!("{id}@clinic.test")),
            role: Set(role.as_str().to_owned()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .unwrap();
        (id, self.codec.issue(&Actor::new(id, clinic_id, role)).unwrap())
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        self.send(method, uri, token, &[], body).await
    }

    /// Send `body` verbatim, for requests that are not valid JSON.
    pub async fn send_raw(&self, method: Method, uri: &str, token: Option<&str>, body: &'static str) -> Reply {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.dispatch(req.body(Body::from(body)).unwrap()).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        self.dispatch(req).await
    }

    async fn dispatch(&self, req: Request<Body>) -> Reply {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            content_type,
            body,
        }
    }
}
