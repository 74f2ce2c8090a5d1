use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One-shot, idempotent cancellation primitive shared between the signal
/// bridge (sole writer) and the session controller and tunnel (waiters).
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    fired: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Safe to call any number of times; only the first
    /// call has an effect.
    pub fn fire(&self) {
        if !self.inner.fired.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has fired. A signal fired before the call is
    /// observed immediately.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before re-checking the flag, so a fire() landing
        // in between cannot be missed.
        notified.as_mut().enable();
        if self.fired() {
            return;
        }
        notified.await;
    }
}

/// Spawns the task that converts the first OS termination signal into the
/// session's stop signal. Later deliveries are not forwarded; the task exits
/// after the first one.
pub fn bridge_termination_signals(stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        first_termination_signal().await;
        debug!(target: "pier::signal", "termination signal received");
        stop.fire();
    })
}

#[cfg(unix)]
async fn first_termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let listen = |kind: SignalKind, name: &'static str| async move {
        match signal(kind) {
            Ok(mut stream) => {
                let _ = stream.recv().await;
            }
            Err(err) => {
                warn!(
                    target: "pier::signal",
                    signal = name,
                    error = %err,
                    "failed to subscribe to termination signal"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = listen(SignalKind::hangup(), "SIGHUP") => {}
        _ = listen(SignalKind::interrupt(), "SIGINT") => {}
        _ = listen(SignalKind::terminate(), "SIGTERM") => {}
        _ = listen(SignalKind::quit(), "SIGQUIT") => {}
    }
}

#[cfg(not(unix))]
async fn first_termination_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: "pier::signal",
            error = %err,
            "failed to subscribe to ctrl-c"
        );
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fire_is_idempotent() {
        let stop = StopSignal::new();
        assert!(!stop.fired());
        stop.fire();
        stop.fire();
        assert!(stop.fired());
        // A pre-fired signal resolves immediately.
        stop.cancelled().await;
    }

    #[tokio::test]
    async fn waiters_are_released_on_fire() {
        let stop = StopSignal::new();
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move {
                stop.cancelled().await;
            })
        };
        // Give the waiter a chance to register before firing.
        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.fire();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .expect("waiter task");
    }

    #[tokio::test]
    async fn double_fire_reaches_the_same_terminal_state() {
        let stop = StopSignal::new();
        stop.fire();
        let observed_once = stop.fired();
        stop.fire();
        assert_eq!(observed_once, stop.fired());
        stop.cancelled().await;
    }
}
