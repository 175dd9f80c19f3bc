//! Named device types resolved from a data file.

use std::collections::HashMap;
use std::path::Path;

use apcnet_core::fixed::checked_f64_to_fixed64;
use apcnet_core::id::DeviceId;
use apcnet_power::{PowerDeviceModule, Powered, PoweredDeviceConfig};

use crate::loader::{DataLoadError, check_duplicate, deserialize_list, require_data_file};
use crate::schema::DeviceTypeData;

/// Base name of the device catalog file.
pub const DEVICES_FILE: &str = "devices";

/// Device configurations keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    types: HashMap<String, PoweredDeviceConfig>,
}

impl DeviceCatalog {
    /// Validate and resolve raw entries. `file` is only used for error context.
    pub fn from_entries(entries: Vec<DeviceTypeData>, file: &Path) -> Result<Self, DataLoadError> {
        let mut types = HashMap::with_capacity(entries.len());
        for entry in entries {
            check_duplicate(&types, &entry.name, file)?;
            let config = resolve_entry(&entry, file)?;
            types.insert(entry.name, config);
        }
        Ok(Self { types })
    }

    pub fn get(&self, name: &str) -> Option<&PoweredDeviceConfig> {
        self.types.get(name)
    }

    /// Type names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Spawn a device of the named type. Returns `None` for an unknown name.
    pub fn spawn(
        &self,
        module: &mut PowerDeviceModule,
        name: &str,
        handler: Option<Box<dyn Powered>>,
    ) -> Option<DeviceId> {
        let Some(config) = self.types.get(name) else {
            tracing::warn!(device_type = name, "unknown device type");
            return None;
        };
        Some(module.spawn_device(*config, handler))
    }
}

fn resolve_entry(entry: &DeviceTypeData, file: &Path) -> Result<PoweredDeviceConfig, DataLoadError> {
    let min = entry.min_working_voltage;
    let max = entry.max_working_voltage;
    let band = checked_f64_to_fixed64(min).zip(checked_f64_to_fixed64(max));
    let Some((min_volts, max_volts)) = band.filter(|(lo, hi)| lo <= hi) else {
        return Err(DataLoadError::InvalidThresholds {
            file: file.to_path_buf(),
            name: entry.name.clone(),
            min,
            max,
        });
    };
    let watts = checked_f64_to_fixed64(entry.watt_usage).filter(|w| !w.is_negative());
    let Some(watts) = watts else {
        return Err(DataLoadError::InvalidWattUsage {
            file: file.to_path_buf(),
            name: entry.name.clone(),
            watts: entry.watt_usage,
        });
    };

    Ok(PoweredDeviceConfig::default()
        .with_thresholds(min_volts, max_volts)
        .with_watt_usage(watts)
        .environmental(entry.is_environmental_device)
        .delegated(entry.advanced_control_delegated)
        .state_update_on_client(entry.state_update_on_client))
}

/// Load `devices.{ron,toml,json}` from `dir`.
pub fn load_device_catalog(dir: &Path) -> Result<DeviceCatalog, DataLoadError> {
    let path = require_data_file(dir, DEVICES_FILE)?;
    let entries: Vec<DeviceTypeData> = deserialize_list(&path, "devices")?;
    let catalog = DeviceCatalog::from_entries(entries, &path)?;
    tracing::debug!(path = %path.display(), types = catalog.len(), "loaded device catalog");
    Ok(catalog)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use apcnet_core::state::PowerState;
    use apcnet_core::sync::NetworkRole;
    use apcnet_power::test_utils::{RecordingHandler, volts};
    use std::fs;
    use std::path::PathBuf;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "apcnet_catalog_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const DEVICES_RON: &str = r#"[
        (name: "wall_light", watt_usage: 40.0),
        (name: "air_alarm", is_environmental_device: true),
        (name: "smart_fridge", min_working_voltage: 210.0, advanced_control_delegated: true),
    ]"#;

    #[test]
    fn load_ron_catalog() {
        let dir = make_test_dir("load_ron");
        fs::write(dir.join("devices.ron"), DEVICES_RON).unwrap();

        let catalog = load_device_catalog(&dir).unwrap();
        assert_eq!(catalog.names(), vec!["air_alarm", "smart_fridge", "wall_light"]);

        let light = catalog.get("wall_light").unwrap();
        assert_eq!(light.watt_usage, volts(40.0));
        assert_eq!(light.min_working_voltage, volts(190.0));

        assert!(catalog.get("air_alarm").unwrap().is_environmental_device);

        let fridge = catalog.get("smart_fridge").unwrap();
        assert_eq!(fridge.min_working_voltage, volts(210.0));
        assert!(fridge.advanced_control_delegated);

        cleanup(&dir);
    }

    #[test]
    fn load_toml_catalog() {
        let dir = make_test_dir("load_toml");
        fs::write(
            dir.join("devices.toml"),
            "[[devices]]\nname = \"door\"\nmax_working_voltage = 250.0\n",
        )
        .unwrap();

        let catalog = load_device_catalog(&dir).unwrap();
        assert_eq!(catalog.get("door").unwrap().max_working_voltage, volts(250.0));

        cleanup(&dir);
    }

    #[test]
    fn load_json_catalog() {
        let dir = make_test_dir("load_json");
        fs::write(
            dir.join("devices.json"),
            r#"[{"name": "scrubber", "state_update_on_client": false}]"#,
        )
        .unwrap();

        let catalog = load_device_catalog(&dir).unwrap();
        assert!(!catalog.get("scrubber").unwrap().state_update_on_client);

        cleanup(&dir);
    }

    #[test]
    fn missing_catalog_file() {
        let dir = make_test_dir("missing");
        assert!(matches!(
            load_device_catalog(&dir),
            Err(DataLoadError::MissingRequired { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_names_rejected() {
        let dir = make_test_dir("duplicate");
        fs::write(dir.join("devices.ron"), r#"[(name: "a"), (name: "a")]"#).unwrap();
        assert!(matches!(
            load_device_catalog(&dir),
            Err(DataLoadError::DuplicateName { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn inverted_band_rejected() {
        let dir = make_test_dir("inverted");
        fs::write(
            dir.join("devices.ron"),
            r#"[(name: "a", min_working_voltage: 300.0, max_working_voltage: 200.0)]"#,
        )
        .unwrap();
        assert!(matches!(
            load_device_catalog(&dir),
            Err(DataLoadError::InvalidThresholds { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn negative_watt_usage_rejected() {
        let dir = make_test_dir("negative_watts");
        fs::write(dir.join("devices.ron"), r#"[(name: "a", watt_usage: -1.0)]"#).unwrap();
        assert!(matches!(
            load_device_catalog(&dir),
            Err(DataLoadError::InvalidWattUsage { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn out_of_range_voltage_rejected() {
        let entries: Vec<DeviceTypeData> =
            ron::from_str(r#"[(name: "big", max_working_voltage: 1e12)]"#).unwrap();
        assert!(matches!(
            DeviceCatalog::from_entries(entries, Path::new("devices.ron")),
            Err(DataLoadError::InvalidThresholds { .. })
        ));

        let entries: Vec<DeviceTypeData> =
            ron::from_str(r#"[(name: "deep", min_working_voltage: -1e12)]"#).unwrap();
        assert!(matches!(
            DeviceCatalog::from_entries(entries, Path::new("devices.ron")),
            Err(DataLoadError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn out_of_range_watt_usage_rejected() {
        let entries: Vec<DeviceTypeData> =
            ron::from_str(r#"[(name: "furnace", watt_usage: 1e12)]"#).unwrap();
        assert!(matches!(
            DeviceCatalog::from_entries(entries, Path::new("devices.ron")),
            Err(DataLoadError::InvalidWattUsage { .. })
        ));
    }

    #[test]
    fn spawn_by_name() {
        let entries: Vec<DeviceTypeData> = ron::from_str(DEVICES_RON).unwrap();
        let catalog = DeviceCatalog::from_entries(entries, Path::new("devices.ron")).unwrap();
        let mut module = PowerDeviceModule::new(NetworkRole::Authority);
        let handler = RecordingHandler::new();

        let id = catalog
            .spawn(&mut module, "wall_light", Some(handler.boxed()))
            .unwrap();
        module.power_network_update(id, volts(230.0));
        assert_eq!(handler.state_updates(), vec![PowerState::On]);

        assert!(catalog.spawn(&mut module, "toaster", None).is_none());
        assert_eq!(module.device_count(), 1);
    }
}
