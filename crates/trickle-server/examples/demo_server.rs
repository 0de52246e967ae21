//! Minimal end-to-end demo: a scripted "model" streamed over NDJSON.
//!
//! Run with `cargo run --example demo_server`, then:
//!
//! ```sh
//! curl -N -X POST localhost:3000/v1/stream \
//!   -H 'content-type: application/json' \
//!   -d '{"itemType":"potential_cause","arrayPath":"data.potential_causes","input":{"concern":"recurring headaches"}}'
//! ```

use std::sync::Arc;

use trickle_core::{CompletenessRule, SchemaRegistry};
use trickle_server::{AppState, ProducerConfig, ScriptedSource, router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(SchemaRegistry::new().register(
        "potential_cause",
        CompletenessRule::new("Potential cause", "name")
            .require("summary")
            .min_length("summary", 12)
            .optional("severity"),
    ));

    // Stands in for a real model backend: the same document, drip-fed
    let source = Arc::new(ScriptedSource::new([
        r#"{"data": {"potential_causes": ["#,
        r#"{"name": "Dehydration", "summary": "Fluid intake has been"#,
        r#" below typical needs", "severity": 2}, {"name": "Scre"#,
        r#"en strain", "summary": "Long stretches of close focus without breaks", "severity": 1}"#,
        r#"]}}"#,
    ]));

    let state = AppState::with_config(source, registry, ProducerConfig { parse_every: 1 });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, router(state)).await.unwrap();
}
