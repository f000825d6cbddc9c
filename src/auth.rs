//! OAuth credential storage and the browser consent flow
//!
//! Implements the installed-app authorization code flow with PKCE: a
//! loopback listener receives the redirect, the code is exchanged for
//! tokens, and tokens are cached on disk for later sessions.

use crate::error::{AuthError, Result};
use crate::logger::ActivityLog;
use crate::types::{AppSecrets, Credentials};
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// OAuth scope granting upload-only access
const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// How long the consent flow waits for the browser callback
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str =
    "<html><body><h2>Authorization complete</h2><p>You can close this tab and return to the terminal.</p></body></html>";
const FAILURE_PAGE: &str =
    "<html><body><h2>Authorization failed</h2><p>Return to the terminal for details.</p></body></html>";

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Stores OAuth tokens and drives the consent flow
#[derive(Clone)]
pub struct CredentialStore {
    http: Client,
    cache_path: PathBuf,
    secrets_path: PathBuf,
    log: ActivityLog,
}

impl CredentialStore {
    /// Create a store using the default cache and secrets locations
    pub fn new(log: ActivityLog) -> Result<Self> {
        Ok(Self::with_paths(
            crate::paths::get_token_cache_path()?,
            crate::paths::get_client_secrets_path(),
            log,
        ))
    }

    /// Create a store with explicit cache and secrets locations
    pub fn with_paths(cache_path: PathBuf, secrets_path: PathBuf, log: ActivityLog) -> Self {
        Self {
            http: Client::new(),
            cache_path,
            secrets_path,
            log,
        }
    }

    /// Return credentials, running the consent flow only when the cache
    /// is empty
    ///
    /// Cached tokens are returned as-is; an expired access token is
    /// handled by refreshing when the API rejects it. Every attempt is
    /// recorded in the activity log.
    pub async fn authorize(&self) -> Result<Credentials> {
        self.log.auth_start();

        match self.try_authorize().await {
            Ok(creds) => {
                self.log.auth_success();
                Ok(creds)
            }
            Err(e) => {
                self.log.auth_error(&e);
                Err(e)
            }
        }
    }

    async fn try_authorize(&self) -> Result<Credentials> {
        if let Some(creds) = self.load_cached().await? {
            debug!("Using cached credentials");
            return Ok(creds);
        }

        self.consent().await
    }

    /// Load cached credentials, if any
    ///
    /// A present cache file must parse; a corrupt cache surfaces as an
    /// error rather than falling through to the consent flow.
    pub async fn load_cached(&self) -> Result<Option<Credentials>> {
        if !self.cache_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.cache_path).await?;
        let creds = serde_json::from_str(&content)
            .map_err(|e| AuthError::UnreadableCache(e.to_string()))?;

        Ok(Some(creds))
    }

    /// Persist credentials to the cache file
    pub async fn store(&self, creds: &Credentials) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(creds)?;
        fs::write(&self.cache_path, json).await?;

        Ok(())
    }

    /// Exchange the refresh token for a new access token
    ///
    /// Google omits `refresh_token` from refresh responses, so the old
    /// one is carried forward. The refreshed credentials are persisted.
    pub async fn refresh(&self) -> Result<Credentials> {
        let cached = self
            .load_cached()
            .await?
            .ok_or_else(|| AuthError::Exchange("no cached credentials to refresh".to_string()))?;
        let refresh_token = cached
            .refresh_token
            .ok_or_else(|| AuthError::Exchange("no refresh token in the cache".to_string()))?;

        let secrets = self.load_secrets().await?;
        let app = &secrets.installed;

        debug!("Refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", app.client_id.as_str()),
            ("client_secret", app.client_secret.as_str()),
        ];

        let response = self.http.post(&app.token_uri).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("{}: {}", status, body)).into());
        }

        let token: TokenResponse = response.json().await?;
        let creds = credentials_from(token, Some(refresh_token))?;
        self.store(&creds).await?;

        Ok(creds)
    }

    /// Run the browser consent flow and cache the resulting tokens
    async fn consent(&self) -> Result<Credentials> {
        let secrets = self.load_secrets().await?;
        let app = &secrets.installed;

        let state_token = generate_state();
        let verifier = generate_verifier();
        let challenge = code_challenge(&verifier);

        // Ephemeral port; Google accepts any loopback redirect port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let mut auth_url = reqwest::Url::parse(&app.auth_uri)
            .map_err(|e| AuthError::Consent(format!("invalid auth_uri: {}", e)))?;
        auth_url
            .query_pairs_mut()
            .append_pair("client_id", &app.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", UPLOAD_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &state_token)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let callback_state = CallbackState {
            tx: Arc::new(Mutex::new(Some(code_tx))),
            expected_state: state_token,
        };

        let router = Router::new()
            .route("/", get(oauth_callback))
            .with_state(callback_state);

        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!("Callback listener error: {}", e);
            }
        });

        println!();
        println!("Open this URL in your browser to grant access:");
        println!();
        println!("  {}", auth_url);
        println!();

        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("Could not open browser: {}", e);
            println!("(could not open a browser automatically; copy the URL above)");
        }

        println!("Waiting for authorization...");

        let outcome = tokio::time::timeout(CONSENT_TIMEOUT, code_rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        let code = match outcome {
            Err(_) => {
                return Err(AuthError::Consent(
                    "timed out waiting for the browser callback".to_string(),
                )
                .into())
            }
            Ok(Err(_)) => {
                return Err(
                    AuthError::Consent("callback listener closed unexpectedly".to_string()).into(),
                )
            }
            Ok(Ok(Err(msg))) => return Err(AuthError::Consent(msg).into()),
            Ok(Ok(Ok(code))) => code,
        };

        let creds = self
            .exchange_code(&secrets, &code, &redirect_uri, &verifier)
            .await?;
        self.store(&creds).await?;

        Ok(creds)
    }

    /// Exchange an authorization code for tokens
    async fn exchange_code(
        &self,
        secrets: &AppSecrets,
        code: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<Credentials> {
        let app = &secrets.installed;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", app.client_id.as_str()),
            ("client_secret", app.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
        ];

        let response = self.http.post(&app.token_uri).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("{}: {}", status, body)).into());
        }

        let token: TokenResponse = response.json().await?;
        credentials_from(token, None)
    }

    /// Load the OAuth client descriptor from `client_secrets.json`
    async fn load_secrets(&self) -> Result<AppSecrets> {
        if !self.secrets_path.exists() {
            return Err(AuthError::CredentialsFileNotFound(self.secrets_path.clone()).into());
        }

        let content = fs::read_to_string(&self.secrets_path).await?;
        let secrets: AppSecrets = serde_json::from_str(&content)?;

        Ok(secrets)
    }
}

fn credentials_from(token: TokenResponse, previous_refresh: Option<String>) -> Result<Credentials> {
    if token.access_token.is_empty() {
        return Err(AuthError::MissingToken.into());
    }

    Ok(Credentials {
        access_token: token.access_token,
        refresh_token: token.refresh_token.or(previous_refresh),
        expiry: Utc::now() + chrono::Duration::seconds(token.expires_in),
        scope: token.scope,
    })
}

fn generate_state() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

fn generate_verifier() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[derive(Clone)]
struct CallbackState {
    tx: Arc<Mutex<Option<oneshot::Sender<std::result::Result<String, String>>>>>,
    expected_state: String,
}

/// Handle the OAuth redirect on the loopback listener
async fn oauth_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let outcome = if let Some(err) = params.get("error") {
        Err(format!("consent denied: {}", err))
    } else if params.get("state") != Some(&state.expected_state) {
        Err("state parameter mismatch".to_string())
    } else if let Some(code) = params.get("code") {
        Ok(code.clone())
    } else {
        Err("callback missing authorization code".to_string())
    };

    let page = if outcome.is_ok() {
        SUCCESS_PAGE
    } else {
        FAILURE_PAGE
    };

    if let Ok(mut guard) = state.tx.lock() {
        if let Some(tx) = guard.take() {
            let _ = tx.send(outcome);
        }
    }

    Html(page)
}
