// src/engine/service.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::{Launcher, ProcessEventSink, ProcessSpawner};
use crate::fs::FileSystem;
use crate::registry::CommandRegistry;

use super::handle::ServiceHandle;
use super::{ServiceEvent, ServiceRequest};

/// Owns the registry and the launcher, and drives both from `ServiceEvent`s.
pub struct CommandService {
    registry: CommandRegistry,
    launcher: Launcher,
    include_detailed_status: bool,
    event_rx: mpsc::UnboundedReceiver<ServiceEvent>,
}

impl fmt::Debug for CommandService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandService")
            .field("registry", &self.registry)
            .field("launcher", &self.launcher)
            .field("include_detailed_status", &self.include_detailed_status)
            .finish_non_exhaustive()
    }
}

impl CommandService {
    /// Build the service and a handle to talk to it.
    ///
    /// Process callbacks hold only a weak sender, so the loop ends once every
    /// [`ServiceHandle`] is gone.
    pub fn new(
        config: &ConfigFile,
        spawner: Arc<dyn ProcessSpawner>,
        fs: Arc<dyn FileSystem>,
    ) -> (Self, ServiceHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let weak_tx = event_tx.downgrade();
        let sink: ProcessEventSink = Arc::new(move |event| match weak_tx.upgrade() {
            Some(tx) => {
                if tx.send(ServiceEvent::from(event)).is_err() {
                    trace!("command service stopped; process event dropped");
                }
            }
            None => trace!("command service stopped; process event dropped"),
        });

        let service = Self {
            registry: CommandRegistry::new(config.limits()),
            launcher: Launcher::new(config.executable.clone(), spawner, fs, sink),
            include_detailed_status: config.registry.detailed_status,
            event_rx,
        };
        (service, ServiceHandle::new(event_tx))
    }

    /// Main event loop.
    pub async fn run(mut self) -> Result<()> {
        info!("command service started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("all service handles dropped; exiting");
                    break;
                }
            };

            if !self.handle_event(event) {
                info!("shutdown requested");
                break;
            }
        }

        let recent = self.registry.recent_keys();
        self.registry.stop_records(&recent);
        info!("command service exiting");
        Ok(())
    }

    /// Apply one event. Returns `false` when the loop should stop.
    pub fn handle_event(&mut self, event: ServiceEvent) -> bool {
        match event {
            ServiceEvent::Output { key, text } => {
                self.registry.record_output(key, &text);
            }
            ServiceEvent::Exited { key, code } => {
                debug!(%key, code, "process exited");
                self.registry.record_exit(key, code);
            }
            ServiceEvent::Request(request) => self.handle_request(request),
            ServiceEvent::Shutdown => return false,
        }
        true
    }

    fn handle_request(&mut self, request: ServiceRequest) {
        let detail = self.include_detailed_status;
        match request {
            ServiceRequest::Run { request, reply } => {
                respond(reply, self.launcher.run(&mut self.registry, request));
            }
            ServiceRequest::Start { id, reply } => {
                respond(reply, self.registry.start(&id).map(|_| ()));
            }
            ServiceRequest::Restart { id, reply } => {
                respond(reply, self.registry.restart(&id).map(|_| ()));
            }
            ServiceRequest::Stop { id, reply } => {
                respond(reply, self.registry.stop(&id));
            }
            ServiceRequest::Remove { id, reply } => {
                respond(reply, self.registry.remove(&id));
            }
            ServiceRequest::RemoveAll { reply } => {
                self.registry.remove_all();
                respond(reply, ());
            }
            ServiceRequest::Resize { id, cols, reply } => {
                respond(reply, self.registry.resize(&id, cols));
            }
            ServiceRequest::ListRecent { reply } => {
                respond(reply, self.registry.list_recent(detail));
            }
            ServiceRequest::Get { id, reply } => {
                respond(reply, self.registry.get(&id, detail));
            }
        }
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        debug!("requester went away before the reply");
    }
}
