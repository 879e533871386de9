//! Using the encoder as a `tracing` backend.
//!
//! Run with: RUST_LOG=debug cargo run --example tracing_layer

use logfmt_encoder::{EncoderOptions, LogfmtLayer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    let layer = LogfmtLayer::new(
        EncoderOptions::new().with_message_key("message"),
        std::io::stdout,
    );
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    let request = tracing::info_span!("request", id = 42, path = "/index.html");
    let _request = request.enter();
    tracing::info!(user = "arthur", "handling request");

    let query = tracing::info_span!("query", table = "users", rows = tracing::field::Empty);
    let _query = query.enter();
    tracing::debug!(sql = "SELECT * FROM users WHERE id = ?", "running query");
    query.record("rows", 1);
    tracing::warn!(latency_ms = 250.75, "slow query");
}
