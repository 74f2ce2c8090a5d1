use crate::descriptor::PortPair;
use crate::signal::StopSignal;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to bind forward listener on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("forward listener failed while accepting connections: {0}")]
    Accept(std::io::Error),
}

/// Byte-level tunnel transport behind the session controller. Implementations
/// must fire `ready` exactly once when the tunnel is actively serving and
/// must release all resources before returning.
#[async_trait]
pub trait PortForwarder: Send + Sync {
    async fn forward(
        &self,
        pair: PortPair,
        stop: StopSignal,
        ready: oneshot::Sender<()>,
    ) -> Result<(), ForwardError>;
}

/// Default transport: a plain TCP splice between the negotiated local port
/// and the workload's debug endpoint.
pub struct TcpPortForwarder {
    remote_host: String,
}

impl TcpPortForwarder {
    pub fn new(remote_host: impl Into<String>) -> Self {
        Self {
            remote_host: remote_host.into(),
        }
    }
}

#[async_trait]
impl PortForwarder for TcpPortForwarder {
    async fn forward(
        &self,
        pair: PortPair,
        stop: StopSignal,
        ready: oneshot::Sender<()>,
    ) -> Result<(), ForwardError> {
        let addr = format!("127.0.0.1:{}", pair.local);
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ForwardError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let _ = ready.send(());
        info!(
            target: "pier::forward",
            pair = %pair,
            addr = %addr,
            "forward listener serving"
        );

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                accepted = listener.accept() => {
                    let (inbound, peer) = accepted.map_err(ForwardError::Accept)?;
                    debug!(target: "pier::forward", peer = %peer, "connection accepted");
                    let remote_host = self.remote_host.clone();
                    let stop = stop.clone();
                    connections.spawn(async move {
                        splice(inbound, remote_host, pair.remote, stop).await;
                    });
                }
            }
        }

        // Orderly close: stop accepting first, then drain in-flight
        // connections before reporting the listener released.
        drop(listener);
        while connections.join_next().await.is_some() {}
        debug!(target: "pier::forward", pair = %pair, "forward listener released");
        Ok(())
    }
}

/// Dials the workload and copies bytes both ways until either side closes or
/// the stop signal fires. A dial failure closes this connection only; the
/// session stays up.
async fn splice(mut inbound: TcpStream, remote_host: String, remote_port: u16, stop: StopSignal) {
    let mut outbound = match TcpStream::connect((remote_host.as_str(), remote_port)).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(
                target: "pier::forward",
                remote = %format!("{remote_host}:{remote_port}"),
                error = %err,
                "failed to dial remote debug endpoint"
            );
            return;
        }
    };

    tokio::select! {
        _ = stop.cancelled() => {}
        result = copy_bidirectional(&mut inbound, &mut outbound) => {
            if let Err(err) = result {
                debug!(
                    target: "pier::forward",
                    error = %err,
                    "forwarded connection closed with error"
                );
            }
        }
    }
}
