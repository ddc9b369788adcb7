//! Service lifecycle example - register, heartbeat, discover, deregister
//!
//! Usage:
//!   cargo run --package waystation-core --example service_lifecycle -- [host] [port]
//!
//! Registers a TTL-checked instance of `demo-api`, keeps it passing until
//! Ctrl+C, then withdraws it.

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use waystation_core::{generate_instance_id, Heartbeat, Registration, RegistryClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).map(|s| s.as_str()).unwrap_or("127.0.0.1");
    let port = match args.get(2) {
        Some(p) => p.parse().context("port must be a number")?,
        None => 8500,
    };

    let client = RegistryClient::builder(host, port)
        .request_timeout(Duration::from_secs(5))
        .build()?;

    let instance_id = generate_instance_id("demo-api");
    let registration =
        Registration::ttl("demo-api", &instance_id, "127.0.0.1", 9000, Duration::from_secs(15))
            .with_tag("demo")
            .with_meta_entry("version", env!("CARGO_PKG_VERSION"));

    println!("Registering {} with {}:{}...", instance_id, host, port);
    client
        .register(&registration)
        .await
        .context("registration failed")?;

    let heartbeat = Heartbeat::for_registration(&client, &registration)?;

    let instances = client.discover_services("demo-api").await?;
    println!("Found {} healthy instance(s) of demo-api:", instances.len());
    for instance in instances {
        println!("  - {} at {}", instance.id, instance.socket_addr_string());
    }

    println!("Press Ctrl+C to deregister and exit");
    tokio::signal::ctrl_c().await?;

    heartbeat.stop().await;
    client.deregister(&instance_id).await?;
    println!("Deregistered {}", instance_id);

    Ok(())
}
