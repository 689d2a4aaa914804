//! A websocket diagnostics dashboard exposing live eNodeB/UE/ESM state from
//! the S1AP control plane.
//!
//! Not wired into the core's hot path: the S1AP task periodically builds a
//! [`model::DiagnosticSnapshot`] from its `Engine` and pushes it over a
//! `crossbeam-channel`, exactly as the teacher's diagnostic node thread
//! pushes snapshots to its monitor thread.

pub mod model;
mod server;

use log::{error, info};
use model::DiagnosticSnapshot;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crossbeam_channel::Receiver;
use tokio::sync::broadcast;

/// The default port for the web monitor.
const DEFAULT_MONITOR_PORT: u16 = 3000;
/// The capacity of the broadcast channel for WebSocket clients.
const BROADCAST_CHANNEL_CAPACITY: usize = 32;

/// Starts the web monitor.
///
/// Intended to run in a dedicated, non-real-time task alongside the S1AP
/// task; it starts a web server and WebSocket endpoint that streams every
/// snapshot it receives from `receiver` to all connected clients.
///
/// * `receiver`: the `crossbeam-channel` the S1AP task (or whatever owns the
///   `Engine`) pushes `DiagnosticSnapshot` updates into.
pub async fn start_monitor(
    receiver: Receiver<DiagnosticSnapshot>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), DEFAULT_MONITOR_PORT);

    let (snapshot_tx, _) = broadcast::channel::<DiagnosticSnapshot>(BROADCAST_CHANNEL_CAPACITY);

    // Bridges the synchronous crossbeam receiver into the async broadcast
    // channel without blocking the tokio runtime's worker threads.
    let bridge_tx = snapshot_tx.clone();
    tokio::task::spawn_blocking(move || {
        info!("Starting snapshot channel bridge task.");
        while let Ok(snapshot) = receiver.recv() {
            if let Err(e) = bridge_tx.send(snapshot) {
                error!("Failed to broadcast snapshot (no receivers?): {}. Shutting down bridge.", e);
                break;
            }
        }
        info!("Snapshot channel bridge task shut down.");
    });

    server::start_web_server(addr, snapshot_tx).await;

    Ok(())
}
