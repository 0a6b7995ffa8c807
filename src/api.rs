//! qBittorrent WebUI v2 API boundary.
//!
//! `ControlPlane` is the seam the session controller and swarm scanner
//! talk through; `QbitClient` is its production implementation on top
//! of a blocking `ureq` agent. The agent's cookie store carries the
//! SID session cookie issued by `auth/login`, so authentication state
//! lives entirely in the transport. An optional basic-auth pair covers
//! deployments with a reverse proxy in front of the WebUI.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

/// Path prefix of the WebUI v2 API.
const API_BASE_PATH: &str = "/api/v2";

/// Body returned by `auth/login` when the credentials are rejected.
const LOGIN_REJECTED_MARKER: &str = "Fails.";

/// Errors from the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[source] Box<ureq::Error>),
    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),
    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(Box::new(err))
    }
}

/// One torrent as reported by `torrents/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentSummary {
    pub hash: String,
    #[serde(default)]
    pub name: String,
}

/// One swarm peer as reported by `sync/torrentPeers`.
///
/// Fields the classifier depends on are mandatory: a payload missing
/// them surfaces as a decode error and is handled as a transient cycle
/// failure.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerDetail {
    pub client: String,
    pub progress: f64,
    pub downloaded: u64,
    pub uploaded: u64,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Default, Deserialize)]
struct TorrentPeersResponse {
    #[serde(default)]
    peers: HashMap<String, PeerDetail>,
}

/// The remote control-plane operations the control loop consumes.
pub trait ControlPlane {
    /// Open (or re-open) a session. `Ok(false)` means the control plane
    /// rejected the credentials.
    fn authenticate(&self) -> Result<bool, ApiError>;

    /// Fetch the full torrent list.
    fn list_torrents(&self) -> Result<Vec<TorrentSummary>, ApiError>;

    /// Fetch the peer swarm of one torrent, keyed by `ip:port`.
    fn torrent_peers(&self, hash: &str) -> Result<HashMap<String, PeerDetail>, ApiError>;

    /// Replace the client's banned-address list with the given
    /// newline-delimited set. Always the complete set, never a delta.
    fn set_banned_addresses(&self, banned: &str) -> Result<(), ApiError>;
}

/// Blocking WebUI client.
pub struct QbitClient {
    agent: ureq::Agent,
    base_url: String,
    username: String,
    password: String,
    /// Precomputed `Authorization` header value, when basic auth is on.
    basic_auth: Option<String>,
}

impl QbitClient {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        basic_auth: Option<(&str, &str)>,
    ) -> Self {
        let basic_auth = basic_auth.map(|(user, pass)| {
            format!("Basic {}", BASE64.encode(format!("{}:{}", user, pass)))
        });
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            basic_auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_BASE_PATH, path)
    }

    fn get(&self, path: &str) -> ureq::Request {
        self.with_auth(self.agent.get(&self.url(path)))
    }

    fn post(&self, path: &str) -> ureq::Request {
        self.with_auth(self.agent.post(&self.url(path)))
    }

    fn with_auth(&self, request: ureq::Request) -> ureq::Request {
        match &self.basic_auth {
            Some(header) => request.set("Authorization", header),
            None => request,
        }
    }
}

impl ControlPlane for QbitClient {
    fn authenticate(&self) -> Result<bool, ApiError> {
        let response = self.post("/auth/login").send_form(&[
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ])?;
        let body = response.into_string()?;
        Ok(!body.contains(LOGIN_REJECTED_MARKER))
    }

    fn list_torrents(&self) -> Result<Vec<TorrentSummary>, ApiError> {
        let body = self.get("/torrents/info").call()?.into_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn torrent_peers(&self, hash: &str) -> Result<HashMap<String, PeerDetail>, ApiError> {
        let body = self
            .get("/sync/torrentPeers")
            .query("hash", hash)
            .call()?
            .into_string()?;
        let response: TorrentPeersResponse = serde_json::from_str(&body)?;
        Ok(response.peers)
    }

    fn set_banned_addresses(&self, banned: &str) -> Result<(), ApiError> {
        let preferences = serde_json::json!({ "banned_IPs": banned }).to_string();
        self.post("/app/setPreferences")
            .send_form(&[("json", preferences.as_str())])?;
        Ok(())
    }
}
