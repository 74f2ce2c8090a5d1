use std::net::TcpListener;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("local port {port} was requested explicitly but cannot be bound: {source}")]
    PinnedUnavailable { port: u16, source: std::io::Error },
    #[error("unable to auto-select a free local port: {0}")]
    AutoSelectFailed(std::io::Error),
}

/// Outcome of local-port negotiation.
#[derive(Debug, PartialEq, Eq)]
pub enum NegotiatedPort {
    /// The preferred port was free and accepted as-is.
    Preferred(u16),
    /// The preferred port was busy; a fresh ephemeral port was substituted.
    Substituted { requested: u16, selected: u16 },
}

impl NegotiatedPort {
    pub fn port(&self) -> u16 {
        match self {
            NegotiatedPort::Preferred(port) => *port,
            NegotiatedPort::Substituted { selected, .. } => *selected,
        }
    }
}

/// Probe-binds the preferred local port to decide which port the session will
/// use. A pinned port that cannot be bound is a hard failure; an unpinned one
/// falls back to a fresh ephemeral port from the OS.
///
/// The probe listener is released immediately: the tunnel transport re-binds
/// the port for the session's lifetime.
pub fn negotiate_local_port(preferred: u16, pinned: bool) -> Result<NegotiatedPort, PortError> {
    match TcpListener::bind(("127.0.0.1", preferred)) {
        Ok(probe) => {
            drop(probe);
            Ok(NegotiatedPort::Preferred(preferred))
        }
        Err(source) if pinned => Err(PortError::PinnedUnavailable {
            port: preferred,
            source,
        }),
        Err(cause) => {
            error!(
                target: "pier::negotiate",
                port = preferred,
                cause = %cause,
                "local debug port is not free"
            );
            let selected = free_local_port().map_err(PortError::AutoSelectFailed)?;
            info!(
                target: "pier::negotiate",
                port = selected,
                "local port auto-selected"
            );
            Ok(NegotiatedPort::Substituted {
                requested: preferred,
                selected,
            })
        }
    }
}

fn free_local_port() -> std::io::Result<u16> {
    let probe = TcpListener::bind("127.0.0.1:0")?;
    Ok(probe.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied_port() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
        let port = listener.local_addr().expect("local addr").port();
        (listener, port)
    }

    #[test]
    fn free_port_is_accepted_as_is() {
        let (listener, port) = occupied_port();
        drop(listener);
        let outcome = negotiate_local_port(port, false).expect("negotiation");
        assert_eq!(outcome, NegotiatedPort::Preferred(port));
    }

    #[test]
    fn busy_unpinned_port_is_substituted() {
        let (_listener, port) = occupied_port();
        let outcome = negotiate_local_port(port, false).expect("negotiation");
        match outcome {
            NegotiatedPort::Substituted {
                requested,
                selected,
            } => {
                assert_eq!(requested, port);
                assert_ne!(selected, port);
                // The substitute must be bindable at negotiation time.
                TcpListener::bind(("127.0.0.1", selected)).expect("substitute port free");
            }
            other => panic!("expected substitution, got {other:?}"),
        }
    }

    #[test]
    fn busy_pinned_port_is_a_hard_failure() {
        let (_listener, port) = occupied_port();
        let err = negotiate_local_port(port, true).unwrap_err();
        match err {
            PortError::PinnedUnavailable { port: failed, .. } => assert_eq!(failed, port),
            other => panic!("expected pinned failure, got {other:?}"),
        }
    }
}
