//! Canonical telemetry snapshot published to consumers.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::integration::solark::ProtocolHint;

/// Number of PV string slots the vendor API can report.
pub const PV_STRING_COUNT: u8 = 12;

/// Canonical metric keys and their units.
pub const METRIC_UNITS: &[(&str, &str)] = &[
    ("pv_power", "W"),
    ("load_power", "W"),
    ("grid_power", "W"),
    ("grid_import_power", "W"),
    ("grid_export_power", "W"),
    ("grid_meter_a", "W"),
    ("grid_meter_b", "W"),
    ("grid_meter_c", "W"),
    ("battery_power", "W"),
    ("battery_soc", "%"),
    ("battery_voltage", "V"),
    ("battery_current", "A"),
    ("energy_today", "kWh"),
    ("energy_total", "kWh"),
    ("pv_string_power", "W"),
];

/// Unit for a canonical metric key.
pub fn unit_of(metric: &str) -> Option<&'static str> {
    let key = if metric.starts_with("pv_string_") {
        "pv_string_power"
    } else {
        metric
    };
    METRIC_UNITS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, unit)| *unit)
}

/// Normalized plant telemetry.
///
/// Every canonical field is always present; a metric the plant does not
/// report is `None`, never omitted. Power is in watts with the sign
/// conventions: grid positive imports, battery positive discharges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub protocol: ProtocolHint,
    pub pv_power: Option<f64>,
    pub load_power: Option<f64>,
    pub grid_power: Option<f64>,
    pub grid_import_power: Option<f64>,
    pub grid_export_power: Option<f64>,
    pub grid_meter_a: Option<f64>,
    pub grid_meter_b: Option<f64>,
    pub grid_meter_c: Option<f64>,
    pub battery_power: Option<f64>,
    pub battery_soc: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub battery_current: Option<f64>,
    pub energy_today: Option<f64>,
    pub energy_total: Option<f64>,
    pub pv_strings: BTreeMap<u8, f64>,
}

impl Snapshot {
    /// A snapshot with no readings, tagged with the detected protocol.
    pub fn empty(protocol: ProtocolHint) -> Self {
        Snapshot {
            protocol,
            pv_power: None,
            load_power: None,
            grid_power: None,
            grid_import_power: None,
            grid_export_power: None,
            grid_meter_a: None,
            grid_meter_b: None,
            grid_meter_c: None,
            battery_power: None,
            battery_soc: None,
            battery_voltage: None,
            battery_current: None,
            energy_today: None,
            energy_total: None,
            pv_strings: BTreeMap::new(),
        }
    }

    /// Flat metric map, one entry per canonical key.
    pub fn metrics(&self) -> BTreeMap<String, Option<f64>> {
        let mut metrics = BTreeMap::new();
        metrics.insert("pv_power".to_string(), self.pv_power);
        metrics.insert("load_power".to_string(), self.load_power);
        metrics.insert("grid_power".to_string(), self.grid_power);
        metrics.insert("grid_import_power".to_string(), self.grid_import_power);
        metrics.insert("grid_export_power".to_string(), self.grid_export_power);
        metrics.insert("grid_meter_a".to_string(), self.grid_meter_a);
        metrics.insert("grid_meter_b".to_string(), self.grid_meter_b);
        metrics.insert("grid_meter_c".to_string(), self.grid_meter_c);
        metrics.insert("battery_power".to_string(), self.battery_power);
        metrics.insert("battery_soc".to_string(), self.battery_soc);
        metrics.insert("battery_voltage".to_string(), self.battery_voltage);
        metrics.insert("battery_current".to_string(), self.battery_current);
        metrics.insert("energy_today".to_string(), self.energy_today);
        metrics.insert("energy_total".to_string(), self.energy_total);
        for (index, power) in &self.pv_strings {
            metrics.insert(format!("pv_string_{index}_power"), Some(*power));
        }
        metrics
    }
}
