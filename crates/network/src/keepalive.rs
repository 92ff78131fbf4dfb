//! Keep-alive sweep over every session

use realm_protocol::{handshake, ServerMessage};
use realm_world::Peer;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::ServerContext;
use crate::session::KeepAlive;

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pinged: usize,
    pub closed: usize,
}

/// Ping every session once, closing those that ignored the previous ping.
pub async fn sweep(ctx: &ServerContext) -> SweepReport {
    let mut report = SweepReport::default();

    for session in ctx.world.sessions() {
        let (start, seeds) = ctx.with_rng_mut(|rng| {
            let start = handshake::generate_sequence_start(rng);
            (start, handshake::ping_sequence_bytes(start, rng))
        });

        match session.arm_keepalive(start) {
            KeepAlive::Expired => {
                info!("Session {} missed its keep-alive, closing", session.id());
                session.close();
                report.closed += 1;
            }
            KeepAlive::Waiting => {}
            KeepAlive::Ping => {
                let (seq1, seq2) = seeds;
                match session.send_message(&ServerMessage::ConnectionPlayer { seq1, seq2 }).await {
                    Ok(()) => report.pinged += 1,
                    Err(e) => {
                        warn!("Session {} keep-alive send failed: {}", session.id(), e);
                        session.close();
                        report.closed += 1;
                    }
                }
            }
        }
    }

    debug!("Keep-alive sweep: {} pinged, {} closed", report.pinged, report.closed);
    report
}

/// Sweep on the configured period until `shutdown` fires.
pub async fn run(ctx: Arc<ServerContext>, shutdown: CancellationToken) {
    let period = ctx.network.ping_interval;
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Keep-alive every {}s", period.as_secs());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                sweep(&ctx).await;
            }
        }
    }

    info!("Keep-alive stopped");
}
