// Test helpers for unit and integration testing

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::AppConfig;
use crate::domain::session::PersistedSession;
use crate::repository::{database::init_test_database, Repository, SessionPersistence};
use crate::services::api_client::{ApiClient, ApiError, ApiRequest, ApiResponse, HttpTransport};
use crate::services::auth_store::AuthStore;
use crate::services::events::EventBus;

/// Build a bearer token the way the backend shapes them. The signature is
/// never checked client side.
pub fn mint_token(username: &str, user_id: Option<i64>, exp: DateTime<Utc>) -> String {
    let mut claims = serde_json::json!({ "sub": username, "exp": exp.timestamp() });
    if let Some(id) = user_id {
        claims["user_id"] = serde_json::json!(id);
    }

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.signature", header, payload)
}

/// Auth store backed by an in-memory database, already hydrated.
pub async fn memory_auth_store() -> Result<AuthStore> {
    let repository = Repository::new(init_test_database().await?);
    let store = AuthStore::new(Arc::new(repository.sessions));
    store.hydrate().await;
    Ok(store)
}

/// Session persistence kept in memory. Avoids the database in tests that
/// run on a paused clock.
#[derive(Default)]
pub struct MemorySessionPersistence {
    record: Mutex<Option<PersistedSession>>,
}

impl MemorySessionPersistence {
    pub fn stored(&self) -> Option<PersistedSession> {
        self.record.lock().clone()
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionPersistence {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.record.lock().clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.record.lock() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if let Some(record) = self.record.lock().as_mut() {
            *record = PersistedSession {
                active_sessions: record.active_sessions,
                ..Default::default()
            };
        }
        Ok(())
    }
}

type Scripted = std::result::Result<ApiResponse, ApiError>;

/// Transport that records every request and answers from a script.
///
/// Responses registered for a path win over the shared queue. The last
/// response registered for a path keeps answering once the others are used.
#[derive(Default)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Scripted>>,
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: ApiResponse) {
        self.queue.lock().push_back(Ok(response));
    }

    pub fn respond(&self, status: u16, body: serde_json::Value) {
        self.push(ApiResponse::json(status, &body));
    }

    pub fn fail(&self, error: ApiError) {
        self.queue.lock().push_back(Err(error));
    }

    pub fn route(&self, path: &str, status: u16, body: serde_json::Value) {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(ApiResponse::json(status, &body)));
    }

    pub fn route_error(&self, path: &str, error: ApiError) {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Hold every response until the returned gate is notified once per request.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn next_for(&self, path: &str) -> Scripted {
        if let Some(scripted) = self.routes.lock().get_mut(path) {
            if scripted.len() > 1 {
                if let Some(next) = scripted.pop_front() {
                    return next;
                }
            } else if let Some(last) = scripted.front() {
                return last.clone();
            }
        }

        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport(format!("no scripted response for {}", path))))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, _base_url: &str, request: ApiRequest) -> std::result::Result<ApiResponse, ApiError> {
        let path = request.path.clone();
        self.requests.lock().push(request);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next_for(&path)
    }
}

pub struct TestContext {
    pub config: AppConfig,
    pub persistence: Arc<MemorySessionPersistence>,
    pub auth: AuthStore,
    pub transport: Arc<ScriptedTransport>,
    pub api: ApiClient,
    pub events: EventBus,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::default();
        let persistence = Arc::new(MemorySessionPersistence::default());
        let auth = AuthStore::new(persistence.clone());
        auth.hydrate().await;
        let transport = Arc::new(ScriptedTransport::new());
        let api = ApiClient::new(
            "http://backend.test",
            config.public_endpoints.clone(),
            transport.clone(),
            auth.clone(),
        );

        Ok(Self {
            config,
            persistence,
            auth,
            transport,
            api,
            events: EventBus::new(),
        })
    }

    /// Context with a live session for user 1 ("asha").
    pub async fn logged_in() -> Result<Self> {
        let ctx = Self::new().await?;
        let token = mint_token("asha", Some(1), Utc::now() + Duration::hours(1));
        if !ctx.auth.set_token(Some(&token)).await {
            anyhow::bail!("freshly minted token was rejected");
        }
        Ok(ctx)
    }
}
