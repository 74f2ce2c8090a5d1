use crate::descriptor::{SessionDescriptor, TargetIdentity};
use crate::forward::{ForwardError, PortForwarder};
use crate::signal::StopSignal;
use crate::store::{SessionRecord, SessionStore, StoreError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to record session start: {0}")]
    Record(#[from] StoreError),
    #[error("{0}")]
    Forward(#[from] ForwardError),
}

/// Lifecycle states of one forwarding session. `Stopped` and `Failed` are
/// final; a controller is not reusable for a second session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Removes the session record on drop, so teardown runs on every exit path
/// of `ForwardController::run`, including a propagated tunnel error.
struct RecordGuard {
    store: SessionStore,
    target: TargetIdentity,
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.store.delete(&self.target);
    }
}

/// Owns one session's lifecycle: records the start, drives the tunnel until
/// the stop signal fires or the tunnel fails, and guarantees the record is
/// removed afterwards.
pub struct ForwardController {
    forwarder: Arc<dyn PortForwarder>,
    store: SessionStore,
    state: SessionState,
}

impl ForwardController {
    pub fn new(forwarder: Arc<dyn PortForwarder>, store: SessionStore) -> Self {
        Self {
            forwarder,
            store,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            target: "pier::controller",
            from = %self.state,
            to = %next,
            "session state change"
        );
        self.state = next;
    }

    /// Runs the session to completion. Blocks until the stop signal fires
    /// (normal termination, returns `Ok`) or the tunnel reports an
    /// unrecoverable error. `on_ready` is released once the tunnel is
    /// actively serving and safe to attach to.
    pub async fn run(
        &mut self,
        descriptor: &SessionDescriptor,
        stop: StopSignal,
        on_ready: oneshot::Sender<()>,
    ) -> Result<(), ControllerError> {
        self.transition(SessionState::Starting);
        let record = SessionRecord::for_session(descriptor);
        self.store.write(descriptor.target(), &record)?;
        let guard = RecordGuard {
            store: self.store.clone(),
            target: descriptor.target().clone(),
        };

        let (ready_tx, mut ready_rx) = oneshot::channel();
        let forwarder = Arc::clone(&self.forwarder);
        let forward = forwarder.forward(descriptor.pair(), stop.clone(), ready_tx);
        tokio::pin!(forward);

        let mut on_ready = Some(on_ready);
        let mut ready_pending = true;
        let mut stop_pending = true;
        let result = loop {
            tokio::select! {
                outcome = forward.as_mut() => break outcome,
                readiness = &mut ready_rx, if ready_pending => {
                    ready_pending = false;
                    if readiness.is_ok() {
                        self.transition(SessionState::Ready);
                        info!(
                            target: "pier::controller",
                            pair = %descriptor.pair(),
                            workload = %descriptor.target(),
                            "tunnel ready"
                        );
                        if let Some(tx) = on_ready.take() {
                            let _ = tx.send(());
                        }
                    }
                }
                _ = stop.cancelled(), if stop_pending => {
                    stop_pending = false;
                    self.transition(SessionState::Stopping);
                }
            }
        };

        match result {
            Ok(()) => {
                // Stop-triggered return is the designed normal-termination
                // path, not an error.
                if self.state != SessionState::Stopping {
                    self.transition(SessionState::Stopping);
                }
                drop(guard);
                self.transition(SessionState::Stopped);
                Ok(())
            }
            Err(err) => {
                self.transition(SessionState::Failed);
                drop(guard);
                Err(err.into())
            }
        }
    }
}
