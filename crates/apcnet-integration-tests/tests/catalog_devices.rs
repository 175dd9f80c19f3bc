//! Devices spawned from a data catalog, driven by an APC and mirrored to an
//! observer.

use std::fs;
use std::path::{Path, PathBuf};

use apcnet_core::sync::NetworkRole;
use apcnet_data::{DataLoadError, DeviceCatalog, load_device_catalog};
use apcnet_power::test_utils::*;
use apcnet_power::{PowerDeviceModule, PowerState};

const DEVICES_TOML: &str = r#"
[[devices]]
name = "wall_light"
watt_usage = 100.0

[[devices]]
name = "air_alarm"
is_environmental_device = true
min_working_voltage = 120.0

[[devices]]
name = "arc_welder"
advanced_control_delegated = true
"#;

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "apcnet_catalog_devices_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn load(dir: &Path) -> DeviceCatalog {
    fs::write(dir.join("devices.toml"), DEVICES_TOML).unwrap();
    load_device_catalog(dir).unwrap()
}

#[test]
fn catalog_devices_replicate_to_observer() {
    let dir = make_test_dir("replicate");
    let catalog = load(&dir);

    let mut server = PowerDeviceModule::new(NetworkRole::Authority);
    let mut client = PowerDeviceModule::new(NetworkRole::Observer);
    let apc = server.create_apc();

    let light_handler = RecordingHandler::new();
    let alarm_handler = RecordingHandler::new();
    let light = catalog.spawn(&mut server, "wall_light", None).unwrap();
    let alarm = catalog.spawn(&mut server, "air_alarm", None).unwrap();
    let client_light = catalog
        .spawn(&mut client, "wall_light", Some(light_handler.boxed()))
        .unwrap();
    let client_alarm = catalog
        .spawn(&mut client, "air_alarm", Some(alarm_handler.boxed()))
        .unwrap();
    assert_eq!((light, alarm), (client_light, client_alarm));

    server.set_apc(light, apc);
    server.set_apc(alarm, apc);
    server.start_device(light);
    assert_eq!(server.device(light).unwrap().resistance(), volts(576.0));
    assert_eq!(server.apc(apc).unwrap().connected_devices(), &[light]);
    assert_eq!(server.apc(apc).unwrap().environmental_devices(), &[alarm]);

    // A brownout at 150 V: below the light's band, inside the alarm's.
    server.distribute_voltage(apc, volts(150.0));
    for msg in server.collect_replication() {
        client.apply_replication(msg);
    }

    assert_eq!(client.device(light).unwrap().state(), PowerState::LowVoltage);
    assert_eq!(client.device(alarm).unwrap().state(), PowerState::On);
    assert_eq!(light_handler.state_updates(), vec![PowerState::LowVoltage]);
    assert_eq!(alarm_handler.state_updates(), vec![PowerState::On]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn delegated_catalog_type_forwards_raw_voltage() {
    let dir = make_test_dir("delegated");
    let catalog = load(&dir);

    let mut m = PowerDeviceModule::new(NetworkRole::Authority);
    let handler = RecordingHandler::new();
    let welder = catalog
        .spawn(&mut m, "arc_welder", Some(handler.boxed()))
        .unwrap();

    m.power_network_update(welder, volts(415.0));
    assert_eq!(handler.voltage_updates(), vec![volts(415.0)]);
    assert!(handler.state_updates().is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn oversized_catalog_value_is_a_load_error() {
    let dir = make_test_dir("oversized");
    fs::write(
        dir.join("devices.toml"),
        "[[devices]]\nname = \"furnace\"\nwatt_usage = 1e12\n",
    )
    .unwrap();

    assert!(matches!(
        load_device_catalog(&dir),
        Err(DataLoadError::InvalidWattUsage { .. })
    ));

    let _ = fs::remove_dir_all(&dir);
}
