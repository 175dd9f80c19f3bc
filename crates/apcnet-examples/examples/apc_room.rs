//! APC room example: a light and an air alarm on one APC, a brownout, a
//! surge, and an observer mirroring the lights.
//!
//! Run with: `RUST_LOG=trace cargo run -p apcnet-examples --example apc_room`

use apcnet_core::event::{DeviceEvent, EventKind};
use apcnet_core::fixed::{Fixed64, Volts};
use apcnet_core::sync::NetworkRole;
use apcnet_power::*;

/// A lamp that prints what it is told.
struct Lamp {
    name: &'static str,
}

impl Powered for Lamp {
    fn state_update(&mut self, state: PowerState) {
        let look = match state {
            PowerState::Off => "dark",
            PowerState::LowVoltage => "flickering",
            PowerState::On => "lit",
            PowerState::OverVoltage => "sparking",
        };
        println!("    [{}] {look}", self.name);
    }

    fn power_network_update(&mut self, voltage: Volts) {
        println!("    [{}] raw {voltage} V", self.name);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut server = PowerDeviceModule::new(NetworkRole::Authority);
    let mut client = PowerDeviceModule::new(NetworkRole::Observer);

    server.events_mut().on(
        EventKind::StateChanged,
        Box::new(|e| {
            if let DeviceEvent::StateChanged { from, to, .. } = e {
                println!("  event: {from} -> {to}");
            }
        }),
    );

    let apc = server.create_apc();
    let light = server.spawn_device(
        PoweredDeviceConfig::default().with_watt_usage(Fixed64::from_num(60)),
        Some(Box::new(Lamp { name: "server light" })),
    );
    let alarm = server.spawn_device(
        PoweredDeviceConfig::default().environmental(true),
        Some(Box::new(Lamp { name: "air alarm" })),
    );
    let claimed = server.broadcast_from_apc(apc, &[light, alarm]);
    for d in [light, alarm] {
        server.start_device(d);
    }
    println!("APC claimed {claimed} devices");
    println!(
        "light resistance: {} ohms",
        server.device(light).map(|d| d.resistance()).unwrap_or_default()
    );

    // The observer mirrors both devices; only the light has a handler there.
    client.spawn_device(
        PoweredDeviceConfig::default().with_watt_usage(Fixed64::from_num(60)),
        Some(Box::new(Lamp { name: "client light" })),
    );
    client.spawn_device(PoweredDeviceConfig::default().environmental(true), None);
    client.start_network_all();

    for (tick, volts) in [230, 230, 170, 0, 320, 240].into_iter().enumerate() {
        println!("tick {tick}: {volts} V");
        server.distribute_voltage(apc, Fixed64::from_num(volts));
        for msg in server.collect_replication() {
            client.apply_replication(msg);
        }
    }

    println!(
        "state changes: {}",
        server.events().total_emitted(EventKind::StateChanged)
    );
}
