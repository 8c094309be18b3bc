//! Final admission checks and controller handoff.
//!
//! Runs with no engine lock held. Order matters: the routed callback fires
//! before any check can close the connection, the listener veto happens
//! after the transport is built but before it starts, and the controller
//! receives the transport only once started.

use std::sync::{Arc, Weak};

use berth_core::{PeerAddr, PeerSource, TransportKind};

use crate::conn::{InboundConnection, RoutingListener};
use crate::controller::{PeerTransport, SessionController, TransportObserver, TransportState};
use crate::registration::Registration;

/// Attached to transports replayed by activation. A peer that leaves as a
/// seed is remembered and the session owner asked to wind the swarm down;
/// seeds keep reconnecting to sessions that already finished.
struct SeedCloseObserver {
    registration: Weak<Registration>,
    remote: PeerAddr,
}

impl TransportObserver for SeedCloseObserver {
    fn on_state(&self, transport: &dyn PeerTransport, state: TransportState) {
        if state != TransportState::Closing || !transport.is_seed() {
            return;
        }
        if let Some(registration) = self.registration.upgrade() {
            registration.record_seed(&self.remote);
            registration.adapter().deactivate_request(&self.remote);
        }
    }
}

/// Vet a connection against an active controller, build its transport,
/// start it, and hand it over. `is_activation` marks connections replayed
/// from the pending queue.
pub(crate) fn dispatch(
    registration: &Registration,
    controller: &Arc<dyn SessionController>,
    conn: Box<dyn InboundConnection>,
    is_activation: bool,
    listener: Option<Arc<dyn RoutingListener>>,
) {
    let ctx = registration.ctx();
    let remote = conn.remote_addr();

    if let Some(callback) = conn.routed_callback() {
        if let Err(e) = callback.invoke(controller) {
            tracing::warn!(remote = %remote, error = %e, "routed callback failed");
        }
    }

    let class = remote.network_class();
    if !controller.is_network_enabled(class) {
        conn.close(&format!("Network '{class}' is not enabled"));
        return;
    }

    let same_allowed = ctx.config.allow_same_ip_peers || remote.is_loopback();
    if !same_allowed && controller.has_peer_from(&remote.host_string()) {
        tracing::warn!(
            remote = %conn.describe(),
            swarm = %controller.display_name(),
            "incoming connection dropped, host already connected"
        );
        conn.close("already connected to peer");
        return;
    }

    if ctx.config.udp_only && conn.transport_kind() == TransportKind::Tcp && !conn.is_lan_local() {
        conn.close("tcp disabled");
        return;
    }

    tracing::info!(
        remote = %conn.describe(),
        swarm = %controller.display_name(),
        "incoming connection routed"
    );

    let mut transport = ctx
        .factory
        .create(controller.clone(), PeerSource::Incoming, conn);

    if let Some(listener) = listener {
        let ok = match listener.routed(&mut *transport) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(remote = %remote, error = %e, "routing listener failed");
                false
            }
        };
        if !ok {
            transport.close("routing denied");
            return;
        }
    }

    transport.start();

    if is_activation {
        transport.add_observer(Arc::new(SeedCloseObserver {
            registration: registration.weak(),
            remote,
        }));
    }

    controller.add_peer_transport(transport);
}
