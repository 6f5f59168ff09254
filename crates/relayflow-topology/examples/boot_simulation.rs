//! Boots a simulated dual-relay board and prints the resulting topology.
//!
//! ```text
//! cargo run -p relayflow-topology --example boot_simulation -- [config.toml]
//! RELAYFLOW__DEVICE__MODE=1 RELAYFLOW__WC1__IN_MODE=3 cargo run -p relayflow-topology --example boot_simulation
//! ```
use std::sync::Arc;

use anyhow::Context;

use relayflow_core::config::ConfigBuilder;
use relayflow_core::event::SharedEventBus;
use relayflow_core::logging;
use relayflow_devices::sim::{MeteringScript, SimBoard};
use relayflow_devices::BringUp;
use relayflow_topology::{ServerHandle, TopologyBuilder};

fn main() -> anyhow::Result<()> {
    let mut builder = ConfigBuilder::new().with_environment_prefix("RELAYFLOW");
    if let Some(path) = std::env::args().nth(1) {
        builder = builder.with_config_file(path);
    }
    let config = builder.build().context("failed to load configuration")?;
    logging::init_from_config(&config.logging).context("failed to initialize logging")?;

    let metering = match std::env::var("RELAYFLOW_SIM_METERING").as_deref() {
        Ok("absent") => MeteringScript::Absent,
        _ => MeteringScript::Healthy,
    };
    let board = Arc::new(SimBoard::new().with_metering(metering));

    let bus = SharedEventBus::new();
    let mut events = bus.subscribe();

    let registry = BringUp::new(board.clone())
        .with_event_bus(bus.clone())
        .run()
        .context("peripheral bring-up failed")?;

    let topology = TopologyBuilder::new(&config, &registry, ServerHandle::logging())
        .with_event_bus(bus)
        .build();

    for accessory in topology.accessories().iter() {
        accessory.identify();
    }

    println!("Boot events:");
    while let Ok(event) = events.try_recv() {
        println!("  {}", serde_json::to_string(&event)?);
    }

    println!("Peripherals:");
    println!("{}", serde_json::to_string_pretty(&registry.summary())?);

    println!("Topology:");
    println!("{}", topology.report().to_json()?);
    Ok(())
}
