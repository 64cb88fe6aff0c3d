use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use super::operation::{OperationType, SyncOperation};
use crate::settings::{RemoteKind, SyncSettings};

/// Errors returned by a remote sink for a single write attempt
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{op} on {table} needs a payload id")]
    MissingRecordId { op: OperationType, table: String },

    #[error("remote rejected operation: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// Destination the sync driver writes queued operations to
pub trait RemoteSink: Send {
    /// Attempt one remote write for `op`
    fn apply(&mut self, op: &SyncOperation) -> Result<(), RemoteError>;

    /// Short label used in logs and status output
    fn name(&self) -> &str;
}

/// Remote that waits a fixed latency and then accepts every write
#[derive(Debug, Clone)]
pub struct SimulatedRemote {
    latency: Duration,
}

impl SimulatedRemote {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl RemoteSink for SimulatedRemote {
    fn apply(&mut self, op: &SyncOperation) -> Result<(), RemoteError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        log::info!("Synced {} operation for {}", op.op_type, op.table);
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// JSON-over-HTTP remote
///
/// `create` POSTs the payload to `{endpoint}/{table}`; `update` PATCHes and
/// `delete` DELETEs `{endpoint}/{table}/{id}` where `id` comes from the payload.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpRemote {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("vitality-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// URL an operation is sent to
    pub fn url_for(&self, op: &SyncOperation) -> Result<String, RemoteError> {
        let table = &op.table;
        match op.op_type {
            OperationType::Create => Ok(format!("{}/{}", self.endpoint, table)),
            OperationType::Update | OperationType::Delete => {
                let id = op.record_id().ok_or_else(|| RemoteError::MissingRecordId {
                    op: op.op_type,
                    table: table.clone(),
                })?;
                Ok(format!("{}/{}/{}", self.endpoint, table, id))
            }
        }
    }
}

impl RemoteSink for HttpRemote {
    fn apply(&mut self, op: &SyncOperation) -> Result<(), RemoteError> {
        let url = self.url_for(op)?;

        let request = match op.op_type {
            OperationType::Create => self.http.post(&url).json(&op.payload),
            OperationType::Update => self.http.patch(&url).json(&op.payload),
            OperationType::Delete => self.http.delete(&url),
        };
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let res = request.send()?;
        let status = res.status();
        if status.is_success() {
            log::debug!("{} {} -> {}", op.op_type, url, status);
            return Ok(());
        }

        let body = res.text().unwrap_or_default();
        Err(RemoteError::Http {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Build the remote sink selected in the settings
pub fn build_remote(settings: &SyncSettings) -> anyhow::Result<Box<dyn RemoteSink>> {
    match settings.remote {
        RemoteKind::Simulated => Ok(Box::new(SimulatedRemote::new(settings.simulated_latency()))),
        RemoteKind::Http => {
            let endpoint = settings
                .remote_endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("remote = \"http\" requires remote_endpoint"))?;
            Ok(Box::new(HttpRemote::new(endpoint, settings.remote_token.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(op_type: OperationType, payload: serde_json::Value) -> SyncOperation {
        SyncOperation::new(op_type, "meals", payload).unwrap()
    }

    #[test]
    fn test_simulated_remote_accepts_everything() {
        let mut remote = SimulatedRemote::new(Duration::ZERO);
        assert!(remote.apply(&op(OperationType::Create, json!({}))).is_ok());
        assert!(remote.apply(&op(OperationType::Delete, json!({}))).is_ok());
        assert_eq!(remote.name(), "simulated");
    }

    #[test]
    fn test_http_urls() {
        let remote = HttpRemote::new("https://api.example.com/rest/", None).unwrap();

        let url = remote.url_for(&op(OperationType::Create, json!({"name": "x"}))).unwrap();
        assert_eq!(url, "https://api.example.com/rest/meals");

        let url = remote
            .url_for(&op(OperationType::Update, json!({"id": "m-9"})))
            .unwrap();
        assert_eq!(url, "https://api.example.com/rest/meals/m-9");
    }

    #[test]
    fn test_http_delete_without_id_fails() {
        let remote = HttpRemote::new("https://api.example.com", None).unwrap();
        let err = remote
            .url_for(&op(OperationType::Delete, json!({"name": "x"})))
            .unwrap_err();
        assert!(matches!(err, RemoteError::MissingRecordId { .. }));
        assert!(err.to_string().contains("delete on meals"));
    }

    #[test]
    fn test_build_remote_from_settings() {
        let settings = SyncSettings::default();
        assert_eq!(build_remote(&settings).unwrap().name(), "simulated");

        let settings = SyncSettings {
            remote: RemoteKind::Http,
            remote_endpoint: Some("http://localhost:8080".to_string()),
            ..Default::default()
        };
        assert_eq!(build_remote(&settings).unwrap().name(), "http");
    }
}
