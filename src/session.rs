use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SyncError};
use crate::model::Session;

/// Default location of the persisted session next to the input files.
pub const SESSION_FILE: &str = "merchant-session.json";

/// Authentication endpoint of the merchant portal.
pub const LOGIN_URL: &str = "https://merchant.grab.com/mex-core-api/user-profile/v1/login";

/// Loads and persists the authenticated session so later runs skip the
/// login prompt. No freshness check happens here; a revoked token surfaces
/// as an authorization failure on the first catalog call.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the session is stored at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored session, or `None` when no session file exists.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Persists the session as pretty-printed JSON.
    pub fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)?;
        info!(file = %self.path.display(), "session saved");
        Ok(())
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    without_force_logout: bool,
    login_source: &'a str,
    session_data: SessionData<'a>,
}

#[derive(Serialize)]
struct SessionData<'a> {
    web_session_data: WebSessionData<'a>,
}

#[derive(Serialize)]
struct WebSessionData<'a> {
    user_agent: &'a str,
    human_readable_user_agent: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    data: LoginEnvelope,
}

#[derive(Deserialize)]
struct LoginEnvelope {
    data: LoginData,
}

#[derive(Deserialize)]
struct LoginData {
    jwt: String,
    user_profile: UserProfile,
}

#[derive(Deserialize)]
struct UserProfile {
    grab_food_entity_id: String,
    #[serde(default)]
    links: Vec<ProfileLink>,
}

#[derive(Deserialize)]
struct ProfileLink {
    link_entity_id: String,
}

/// Submits credentials to the portal's login endpoint and builds a session
/// from the response. Rejected credentials come back as
/// [`SyncError::Auth`]; the caller decides whether to prompt again.
pub fn login(username: &str, password: &str) -> Result<Session> {
    let body = LoginRequest {
        username,
        password,
        without_force_logout: true,
        login_source: "TROY_PORTAL_MAIN_USERNAME_PASSWORD",
        session_data: SessionData {
            web_session_data: WebSessionData {
                user_agent: "Mozilla/5.0",
                human_readable_user_agent: "CLI",
            },
        },
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let response = client
        .post(LOGIN_URL)
        .header("x-agent", "mexapp")
        .header("x-app-platform", "web")
        .header("x-app-version", "1.2(v67)")
        .header("x-client-id", "GrabMerchant-Portal")
        .header("x-language", "id")
        .header("x-user-type", "user-profile")
        .header("content-type", "application/json")
        .json(&body)
        .send()?;

    let status = response.status();
    let text = response.text()?;
    if !status.is_success() {
        return Err(SyncError::Auth(login_error_message(status.as_u16(), &text)));
    }

    let parsed: LoginResponse = serde_json::from_str(&text)?;
    let profile = parsed.data.data.user_profile;
    let group = profile
        .links
        .first()
        .map(|link| link.link_entity_id.clone())
        .ok_or_else(|| SyncError::Auth("profile has no linked merchant group".to_string()))?;

    Ok(Session {
        auth_token: parsed.data.data.jwt,
        merchant_entity_id: profile.grab_food_entity_id,
        merchant_group_entity_id: group,
        login_time: Utc::now(),
    })
}

fn login_error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("msg"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.trim())
    }
}
