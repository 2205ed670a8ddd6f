//! OAuth 2.0 credentials for the Blogger API.
//!
//! Client secrets come from the JSON file the Google console hands out for
//! an "installed app". The access token is cached in a small JSON file next
//! to it and refreshed when it expires. Obtaining the first token requires a
//! one-time interactive consent (see [`TokenSource::authorization_url`] and
//! [`TokenSource::exchange_code`]).

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::AuthError;
use crate::utils::truncate_for_log;

pub const BLOGGER_SCOPE: &str = "https://www.googleapis.com/auth/blogger";
pub const REDIRECT_URI: &str = "http://localhost:8080/";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let file: SecretsFile = read_json(path)?;
        file.installed.or(file.web).ok_or(AuthError::NoClientSection)
    }
}

/// Cached token as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, AuthError> {
    let bytes = std::fs::read(path).map_err(|source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| AuthError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Hands out access tokens, refreshing and persisting them as needed.
#[derive(Debug)]
pub struct TokenSource {
    http: Client,
    secrets: ClientSecrets,
    token_path: PathBuf,
    token: Mutex<Option<StoredToken>>,
}

impl TokenSource {
    /// Load client secrets and any cached token.
    ///
    /// A missing or unreadable token file is not an error here; it only
    /// means [`access_token`](Self::access_token) will ask for authorization.
    pub fn load(http: Client, credentials_path: &Path, token_path: &Path) -> Result<Self, AuthError> {
        let secrets = ClientSecrets::load(credentials_path)?;
        let token = if token_path.exists() {
            match read_json::<StoredToken>(token_path) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable token file");
                    None
                }
            }
        } else {
            None
        };
        Ok(Self::new(http, secrets, token_path.to_path_buf(), token))
    }

    pub fn new(
        http: Client,
        secrets: ClientSecrets,
        token_path: PathBuf,
        token: Option<StoredToken>,
    ) -> Self {
        Self {
            http,
            secrets,
            token_path,
            token: Mutex::new(token),
        }
    }

    /// A currently valid access token.
    ///
    /// Refreshes an expired token when a refresh token is available and
    /// saves the result. Fails with [`AuthError::AuthorizationRequired`]
    /// when there is nothing to refresh.
    #[instrument(level = "debug", skip_all)]
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.token.lock().await;
        let refresh_token = match guard.as_ref() {
            Some(token) if token.is_valid_at(Utc::now()) => return Ok(token.access_token.clone()),
            Some(StoredToken {
                refresh_token: Some(refresh),
                ..
            }) => refresh.clone(),
            _ => return Err(AuthError::AuthorizationRequired),
        };

        let fresh = self.refresh(&refresh_token).await?;
        let access = fresh.access_token.clone();
        // The refreshed token is still usable this run even if the cache write fails.
        if let Err(e) = self.save(&fresh).await {
            warn!(error = %e, "Failed to save refreshed token");
        }
        *guard = Some(fresh);
        Ok(access)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, AuthError> {
        info!("Refreshing access token");
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.secrets.client_id),
                ("client_secret", &self.secrets.client_secret),
            ])
            .await?;
        Ok(StoredToken {
            access_token: response.access_token,
            // Google only returns a refresh token on the first exchange.
            refresh_token: response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: Utc::now() + Duration::seconds(response.expires_in),
        })
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        Ok(response.json().await?)
    }

    async fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec_pretty(token).map_err(|source| AuthError::Malformed {
            path: self.token_path.clone(),
            source,
        })?;
        tokio::fs::write(&self.token_path, bytes)
            .await
            .map_err(|source| AuthError::Io {
                path: self.token_path.clone(),
                source,
            })?;
        info!(path = %self.token_path.display(), "Saved token");
        Ok(())
    }

    /// Consent URL the operator opens in a browser.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt=consent",
            self.secrets.auth_uri,
            urlencoding::encode(&self.secrets.client_id),
            urlencoding::encode(REDIRECT_URI),
            urlencoding::encode(BLOGGER_SCOPE),
        )
    }

    /// Exchange the code from the consent redirect for a token and store it.
    #[instrument(level = "info", skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, AuthError> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code.trim()),
                ("redirect_uri", REDIRECT_URI),
                ("client_id", &self.secrets.client_id),
                ("client_secret", &self.secrets.client_secret),
            ])
            .await?;
        let token = StoredToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in),
        };
        self.save(&token).await?;
        *self.token.lock().await = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
pub(crate) fn test_secrets(token_uri: &str) -> ClientSecrets {
    ClientSecrets {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        auth_uri: default_auth_uri(),
        token_uri: token_uri.to_string(),
    }
}
