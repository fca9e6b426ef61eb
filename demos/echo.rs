//! Minimal demo client against a local WebSocket server.
//!
//! Demonstrates:
//! - Chainable configuration and connect
//! - Route subscription and the generic firehose
//! - Route-addressed and generic sends
//! - Automatic reconnection (kill the server and restart it to watch)
//!
//! Usage:
//!   cargo run --example echo
//!   HOST=localhost PORT=9501 ROUTE=test cargo run --example echo

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use route_socket::{Result, RouteSocket};
use serde_json::json;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_socket=debug".into()),
        )
        .init();

    run().await?;
    Ok(())
}

async fn run() -> Result<()> {
    let host = std::env::var("HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9501);
    let route = std::env::var("ROUTE").unwrap_or_else(|_| "test".to_string());

    println!("=== echo demo: ws://{host}:{port}/ws ===\n");

    let socket = RouteSocket::new();
    socket.set_host(&host).set_port(port).connect()?;

    // Status observer
    let mut status = socket.connection_status();
    tokio::spawn(async move {
        while let Some(connected) = status.next().await {
            println!("[status] connected = {connected}");
        }
    });

    // Route-filtered subscription
    let mut filtered = socket.route(&route);
    let route_name = route.clone();
    tokio::spawn(async move {
        while let Some(frame) = filtered.next().await {
            println!("[{route_name}] {}", frame.value());
        }
    });

    // Generic firehose
    let mut all = socket.receive();
    tokio::spawn(async move {
        while let Some(frame) = all.next().await {
            println!("[firehose] {}", frame.value());
        }
    });

    // Periodic sends once connected
    let mut tick = tokio::time::interval(Duration::from_secs(5));
    let mut n = 0u64;
    loop {
        tick.tick().await;
        n += 1;

        if !socket.is_connected() {
            println!("[send] skipped, not connected");
            continue;
        }

        socket.send_to(&route, json!({"text": format!("hello #{n}")}))?;
        socket.send(json!({"type": "ping", "seq": n}))?;
    }
}
