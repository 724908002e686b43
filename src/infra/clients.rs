//! HTTP client for the hash directory service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::application::outbound::{CollaboratorError, HashDirectory};

#[derive(Debug, Deserialize)]
struct HashAliasBody {
    hash: String,
}

/// Talks to the hash directory over its REST surface.
pub struct HttpHashDirectory {
    http: Client,
    base: Url,
}

impl HttpHashDirectory {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }

    fn endpoint(&self, path: &str) -> Result<Url, CollaboratorError> {
        self.base
            .join(path)
            .map_err(|err| CollaboratorError::Transport(err.to_string()))
    }
}

#[async_trait]
impl HashDirectory for HttpHashDirectory {
    async fn lookup(&self, paste_id: Uuid) -> Result<Option<String>, CollaboratorError> {
        let url = self.endpoint(&format!("hashes/{paste_id}"))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| CollaboratorError::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: HashAliasBody = response
                    .json()
                    .await
                    .map_err(|err| CollaboratorError::Transport(err.to_string()))?;
                Ok(Some(body.hash))
            }
            status => Err(CollaboratorError::Status {
                status: status.as_u16(),
            }),
        }
    }

    async fn mark_deleted(&self, paste_id: Uuid) -> Result<(), CollaboratorError> {
        let url = self.endpoint(&format!("hashes/{paste_id}"))?;
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|err| CollaboratorError::Transport(err.to_string()))?;

        match response.status() {
            // Already retired is as good as retired.
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(CollaboratorError::Status {
                status: status.as_u16(),
            }),
        }
    }

    async fn mark_restored(&self, paste_id: Uuid) -> Result<(), CollaboratorError> {
        let url = self.endpoint(&format!("hashes/{paste_id}/restore"))?;
        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|err| CollaboratorError::Transport(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CollaboratorError::Status {
                status: response.status().as_u16(),
            })
        }
    }
}

/// Stand-in used when no hash directory is configured: pastes stay
/// addressable by id and slug only.
pub struct DisabledHashDirectory;

#[async_trait]
impl HashDirectory for DisabledHashDirectory {
    async fn lookup(&self, paste_id: Uuid) -> Result<Option<String>, CollaboratorError> {
        debug!(
            target: "infra::clients",
            paste_id = %paste_id,
            "hash directory disabled; no alias assigned"
        );
        Ok(None)
    }

    async fn mark_deleted(&self, _paste_id: Uuid) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn mark_restored(&self, _paste_id: Uuid) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
