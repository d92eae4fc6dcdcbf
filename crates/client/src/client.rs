//! HTTP client for the tracker API with transparent token refresh.

use std::sync::{Arc, RwLock};

use futures::FutureExt;
use pomo_core::work_session::SessionStatus;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::models::{AuthSession, FinishSession, NewSession, TokenPair, User, WorkSession};
use crate::refresh::RefreshGate;

const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Client for one user's session against one server.
///
/// The refresh token lives in the client's own cookie store, so two
/// `ApiClient`s never interfere with each other's credentials.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Arc<RwLock<Option<String>>>,
    refresh: RefreshGate,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url`, e.g. `http://localhost:4000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(None)),
            refresh: RefreshGate::new(),
        })
    }

    /// The access token currently attached to requests.
    pub fn access_token(&self) -> Option<String> {
        read_token(&self.access_token)
    }

    pub fn set_access_token(&self, token: Option<String>) {
        write_token(&self.access_token, token);
    }

    // ---- auth ----

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError> {
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        });
        self.sign_in("/api/v1/auth/register", &body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.sign_in("/api/v1/auth/login", &body).await
    }

    /// Revoke the refresh cookie server-side and forget the access token.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/v1/auth/logout"))
            .send()
            .await?;
        self.set_access_token(None);
        ensure_success(response).await.map(|_| ())
    }

    /// Exchange the refresh cookie for a new access token.
    ///
    /// Concurrent calls on the same client result in a single request.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let http = self.http.clone();
        let url = self.url(REFRESH_PATH);
        let slot = Arc::clone(&self.access_token);

        self.refresh
            .run(move || {
                async move {
                    tracing::debug!("Refreshing access token");
                    let outcome = match http.post(url).send().await {
                        Ok(response) => into_data::<TokenPair>(response).await,
                        Err(err) => Err(err.into()),
                    };
                    match outcome {
                        Ok(pair) => {
                            write_token(&slot, Some(pair.access_token.clone()));
                            Ok(pair.access_token)
                        }
                        Err(err) => {
                            if err.status() == Some(401) {
                                write_token(&slot, None);
                            }
                            Err(err)
                        }
                    }
                }
                .boxed()
            })
            .await
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        let response = self.execute(Method::GET, "/api/v1/auth/me", None).await?;
        into_data(response).await
    }

    // ---- sessions ----

    pub async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<WorkSession>, ClientError> {
        let mut query = Vec::new();
        if let Some(status) = status {
            query.push(format!("status={status}"));
        }
        if let Some(limit) = limit {
            query.push(format!("limit={limit}"));
        }
        let path = if query.is_empty() {
            "/api/v1/sessions".to_string()
        } else {
            format!("/api/v1/sessions?{}", query.join("&"))
        };
        let response = self.execute(Method::GET, &path, None).await?;
        into_data(response).await
    }

    pub async fn start_session(&self, input: &NewSession) -> Result<WorkSession, ClientError> {
        let body = to_json(input)?;
        let response = self
            .execute(Method::POST, "/api/v1/sessions", Some(&body))
            .await?;
        into_data(response).await
    }

    pub async fn get_session(&self, id: i64) -> Result<WorkSession, ClientError> {
        let response = self
            .execute(Method::GET, &format!("/api/v1/sessions/{id}"), None)
            .await?;
        into_data(response).await
    }

    pub async fn pause_session(&self, id: i64) -> Result<WorkSession, ClientError> {
        let response = self
            .execute(Method::PATCH, &format!("/api/v1/sessions/{id}/pause"), None)
            .await?;
        into_data(response).await
    }

    pub async fn resume_session(&self, id: i64) -> Result<WorkSession, ClientError> {
        let response = self
            .execute(Method::PATCH, &format!("/api/v1/sessions/{id}/resume"), None)
            .await?;
        into_data(response).await
    }

    pub async fn finish_session(
        &self,
        id: i64,
        input: &FinishSession,
    ) -> Result<WorkSession, ClientError> {
        let body = to_json(input)?;
        let response = self
            .execute(Method::PUT, &format!("/api/v1/sessions/{id}"), Some(&body))
            .await?;
        into_data(response).await
    }

    pub async fn delete_session(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .execute(Method::DELETE, &format!("/api/v1/sessions/{id}"), None)
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn sign_in(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<AuthSession, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let session: AuthSession = into_data(response).await?;
        self.set_access_token(Some(session.access_token.clone()));
        Ok(session)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send an authenticated request, refreshing and retrying once on 401.
    ///
    /// If the token changed while this request was in flight, another caller
    /// already refreshed and the retry uses the new token directly.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ClientError> {
        let used = self.access_token();
        let response = self
            .send(method.clone(), path, body, used.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let current = self.access_token();
        let token = match current {
            Some(token) if current_differs(&used, &token) => token,
            _ => match self.refresh().await {
                Ok(token) => token,
                Err(err) if err.status() == Some(401) => return Err(ClientError::Unauthorized),
                Err(err) => return Err(err),
            },
        };

        tracing::debug!(path, "Retrying request with refreshed token");
        self.send(method, path, body, Some(&token)).await
    }
}

fn current_differs(used: &Option<String>, current: &str) -> bool {
    used.as_deref() != Some(current)
}

fn read_token(slot: &RwLock<Option<String>>) -> Option<String> {
    slot.read().map(|t| t.clone()).unwrap_or_default()
}

fn write_token(slot: &RwLock<Option<String>>, token: Option<String>) {
    if let Ok(mut guard) = slot.write() {
        *guard = token;
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Encode(e.to_string()))
}

/// Turn a non-2xx response into [`ClientError::Api`].
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(env) => (env.error.code, env.error.message),
        Err(_) => ("unknown".to_string(), text),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn into_data<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    let envelope: Envelope<T> = response.json().await?;
    Ok(envelope.data)
}
