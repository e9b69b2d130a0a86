//! Access token lifecycle: memory cache, then file cache, then a fresh grant

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::KisError;
use super::types::{TokenRequest, TokenResponse};

const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Tokens this close to expiry are treated as expired
const EXPIRY_BUFFER_MINUTES: i64 = 5;
/// KIS reports expiry in Korea Standard Time
const KST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    /// `YYYY-MM-DD HH:MM:SS`, KST
    pub expires_at: String,
}

impl TokenData {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        parse_expiry(&self.expires_at)
            .map(|expiry| now < expiry - Duration::minutes(EXPIRY_BUFFER_MINUTES))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub valid: bool,
    pub expires_at: Option<String>,
    pub remaining_minutes: Option<i64>,
}

pub fn parse_expiry(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), EXPIRY_FORMAT).ok()?;
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS)?;
    kst.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct TokenManager {
    http: reqwest::Client,
    base_url: String,
    app_key: String,
    app_secret: String,
    path: PathBuf,
    cached: Mutex<Option<TokenData>>,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// A valid token, refreshed when neither cache holds one
    pub async fn get_token(&self) -> Result<String, KisError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(token.access_token.clone());
        }

        if let Some(token) = load_from_file(&self.path).await {
            if token.is_valid_at(now) {
                let access_token = token.access_token.clone();
                *cached = Some(token);
                return Ok(access_token);
            }
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Force a new grant, bypassing both caches
    pub async fn refresh_token(&self) -> Result<String, KisError> {
        let mut cached = self.cached.lock().await;
        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    pub async fn status(&self) -> TokenStatus {
        let Some(token) = load_from_file(&self.path).await else {
            return TokenStatus {
                valid: false,
                expires_at: None,
                remaining_minutes: None,
            };
        };

        let now = Utc::now();
        let remaining = parse_expiry(&token.expires_at).map(|e| (e - now).num_minutes().max(0));
        TokenStatus {
            valid: token.is_valid_at(now),
            expires_at: Some(token.expires_at),
            remaining_minutes: remaining,
        }
    }

    async fn request_token(&self) -> Result<TokenData, KisError> {
        info!("Requesting KIS access token");

        let response = self
            .http
            .post(format!("{}/oauth2/tokenP", self.base_url))
            .json(&TokenRequest {
                grant_type: "client_credentials",
                appkey: &self.app_key,
                appsecret: &self.app_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let grant: TokenResponse = response.json().await?;
        if parse_expiry(&grant.access_token_token_expired).is_none() {
            return Err(KisError::Token(format!(
                "unrecognised expiry {:?}",
                grant.access_token_token_expired
            )));
        }

        let token = TokenData {
            access_token: grant.access_token,
            expires_at: grant.access_token_token_expired,
        };
        save_to_file(&self.path, &token).await?;

        info!(expires_at = %token.expires_at, "KIS access token issued");
        Ok(token)
    }
}

async fn load_from_file(path: &Path) -> Option<TokenData> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&content) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Ignoring unreadable token cache");
            None
        }
    }
}

async fn save_to_file(path: &Path, token: &TokenData) -> Result<(), KisError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, serde_json::to_vec_pretty(token)?).await?;
    Ok(())
}
