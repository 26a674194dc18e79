// src/engine/handle.rs

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{Result, RunboardError};
use crate::exec::{RunRequest, RunResult};
use crate::registry::SerializedCommand;

use super::{ServiceEvent, ServiceRequest};

/// Cloneable client of a running [`super::CommandService`].
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<ServiceEvent>,
}

impl ServiceHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ServiceEvent>) -> Self {
        Self { tx }
    }

    pub async fn run(&self, request: RunRequest) -> Result<RunResult> {
        self.request(|reply| ServiceRequest::Run { request, reply })
            .await?
    }

    pub async fn start(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.request(|reply| ServiceRequest::Start { id, reply }).await?
    }

    pub async fn restart(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.request(|reply| ServiceRequest::Restart { id, reply })
            .await?
    }

    pub async fn stop(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.request(|reply| ServiceRequest::Stop { id, reply }).await?
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.request(|reply| ServiceRequest::Remove { id, reply }).await?
    }

    pub async fn remove_all(&self) -> Result<()> {
        self.request(|reply| ServiceRequest::RemoveAll { reply }).await
    }

    pub async fn resize(&self, id: &str, cols: u16) -> Result<()> {
        let id = id.to_string();
        self.request(|reply| ServiceRequest::Resize { id, cols, reply })
            .await?
    }

    pub async fn list_recent(&self) -> Result<Vec<SerializedCommand>> {
        self.request(|reply| ServiceRequest::ListRecent { reply })
            .await
    }

    /// Newest record with this id; drains its `outChunk`.
    pub async fn get(&self, id: &str) -> Result<Option<SerializedCommand>> {
        let id = id.to_string();
        self.request(|reply| ServiceRequest::Get { id, reply }).await
    }

    /// Ask the service to stop its commands and exit. Does not wait.
    pub fn shutdown(&self) {
        if self.tx.send(ServiceEvent::Shutdown).is_err() {
            tracing::debug!("command service already stopped");
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ServiceRequest,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ServiceEvent::Request(make(reply)))
            .map_err(|_| RunboardError::Other(anyhow!("command service is not running")))?;
        rx.await
            .map_err(|_| RunboardError::Other(anyhow!("command service dropped the request")))
    }
}
