use crate::cli::PortForwardArgs;
use crate::config::{WorkspaceConfig, DEFAULT_DEBUG_PORT};
use crate::controller::ForwardController;
use crate::descriptor::{PortPair, SessionDescriptor};
use crate::error::CliError;
use crate::forward::TcpPortForwarder;
use crate::negotiate::{negotiate_local_port, NegotiatedPort};
use crate::signal::{bridge_termination_signals, StopSignal};
use crate::store::SessionStore;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// Completes, validates and runs one `debug port-forward` invocation.
pub async fn run(args: PortForwardArgs) -> Result<(), CliError> {
    let context = args.context.resolve();
    let config = WorkspaceConfig::load(&context)?;

    // The port is pinned only when the flag was given explicitly; the
    // default value is fair game for auto-substitution.
    let (preferred, pinned) = match args.local_port {
        Some(port) => (port, true),
        None => (DEFAULT_DEBUG_PORT, false),
    };
    let negotiated = negotiate_local_port(preferred, pinned)?;
    if let NegotiatedPort::Substituted {
        requested,
        selected,
    } = &negotiated
    {
        println!("Local port {requested} is busy, using port {selected} instead");
    }

    let pair = PortPair {
        local: negotiated.port(),
        remote: config.remote_debug_port(),
    };
    let descriptor = SessionDescriptor::new(pair, config.target().clone());
    descriptor.validate()?;

    let store = SessionStore::open_default()?;
    let forwarder = Arc::new(TcpPortForwarder::new(config.debug_host()));
    let mut controller = ForwardController::new(forwarder, store);

    let stop = StopSignal::new();
    let bridge = bridge_termination_signals(stop.clone());

    let (ready_tx, ready_rx) = oneshot::channel();
    let banner = tokio::spawn(async move {
        if ready_rx.await.is_ok() {
            println!("Forwarding from 127.0.0.1:{} -> {}", pair.local, pair.remote);
            println!("Press Ctrl+C to stop the session");
        }
    });

    let result = controller.run(&descriptor, stop, ready_tx).await;

    // Unsubscribe from signals on teardown; the bridge task has already
    // exited if a signal was delivered.
    bridge.abort();
    banner.abort();

    result?;
    info!(
        target: "pier::port_forward",
        workload = %descriptor.target(),
        pair = %descriptor.pair(),
        "session closed"
    );
    Ok(())
}
