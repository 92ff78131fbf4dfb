//! Concurrent delivery of outbound messages

use futures::future::join_all;
use realm_protocol::ServerMessage;
use std::sync::Arc;
use tracing::warn;

use crate::peer::Peer;

/// Send `message` to every peer concurrently. Individual failures are
/// logged and do not affect the other deliveries.
pub async fn fan_out<P>(peers: &[Arc<P>], message: &ServerMessage)
where
    P: Peer + ?Sized,
{
    let sends = peers.iter().map(|peer| {
        let message = message.clone();
        async move {
            if let Err(e) = peer.send(message).await {
                warn!("Session {} broadcast send failed: {}", peer.session_id(), e);
            }
        }
    });
    join_all(sends).await;
}

/// Deliver a distinct message to each peer concurrently.
pub async fn fan_out_each<P>(deliveries: Vec<(Arc<P>, ServerMessage)>)
where
    P: Peer + ?Sized,
{
    let sends = deliveries.into_iter().map(|(peer, message)| async move {
        if let Err(e) = peer.send(message).await {
            warn!("Session {} send failed: {}", peer.session_id(), e);
        }
    });
    join_all(sends).await;
}
