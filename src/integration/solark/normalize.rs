//! Pure normalization of raw plant data into the canonical snapshot.
//!
//! The cloud API speaks two field dialects. The classic dialect reports
//! aggregate powers directly; the strog dialect reports per-string and
//! per-phase electrical values that have to be combined. Detection is by
//! field presence only, so this module never touches the network.
use serde::Serialize;
use strum_macros::Display;

use super::schemas::RawReading;
use crate::snapshot::{PV_STRING_COUNT, Snapshot};

/// Aggregate power fields of the classic dialect.
const DIRECT_FIELDS: &[&str] = &[
    "pvPower",
    "pac",
    "battPower",
    "batPower",
    "loadPower",
    "familyLoadPower",
    "soc",
    "battSoc",
];

/// Per-phase and DC-side fields of the strog dialect.
const STROG_FIELDS: &[&str] = &["meterA", "meterB", "meterC", "curVolt", "chargeCurrent"];

/// Tolerance in watts when comparing direct grid power to the meter sum.
const GRID_MISMATCH_TOLERANCE: f64 = 50.0;

/// Which vendor dialect a raw reading speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProtocolHint {
    Classic,
    Strog,
}

impl ProtocolHint {
    /// Detect the dialect from field presence.
    pub fn detect(raw: &RawReading) -> Self {
        let has_direct = DIRECT_FIELDS.iter().any(|field| raw.has(field));
        let has_strog = STROG_FIELDS.iter().any(|field| raw.has(field))
            || (1..=PV_STRING_COUNT).any(|i| raw.has(&format!("volt{i}")));
        if has_strog && !has_direct {
            ProtocolHint::Strog
        } else {
            ProtocolHint::Classic
        }
    }
}

/// Round to one decimal place, the vendor portal's display precision.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Normalize a raw reading into the canonical snapshot.
///
/// Direct aggregate fields always win over derived values; derivations
/// only fill the gaps the dialect leaves.
pub fn normalize(raw: &RawReading, hint: ProtocolHint) -> Snapshot {
    let mut snapshot = Snapshot::empty(hint);

    for index in 1..=PV_STRING_COUNT {
        let volt = raw.f64(&format!("volt{index}"));
        let current = raw.f64(&format!("current{index}"));
        if let (Some(volt), Some(current)) = (volt, current) {
            snapshot.pv_strings.insert(index, round1(volt * current));
        }
    }

    snapshot.pv_power = raw
        .first_f64(&["pvPower", "pac"])
        .map(round1)
        .or_else(|| {
            if snapshot.pv_strings.is_empty() {
                None
            } else {
                Some(round1(snapshot.pv_strings.values().sum()))
            }
        });

    snapshot.load_power = raw
        .first_f64(&["loadPower", "familyLoadPower"])
        .map(round1)
        .or_else(|| derive_load_power(raw).map(round1));

    normalize_grid(raw, &mut snapshot);
    normalize_battery(raw, &mut snapshot);

    snapshot.energy_today = raw
        .first_f64(&["energyToday", "etoday", "eToday"])
        .map(round1);
    snapshot.energy_total = raw
        .first_f64(&["energyTotal", "etotal", "eTotal"])
        .map(round1);

    snapshot
}

/// AC output voltage times current, scaled by the power factor.
fn derive_load_power(raw: &RawReading) -> Option<f64> {
    let volt = raw.f64("inverterOutputVoltage")?;
    let current = raw.f64("curCurrent")?;
    let pf = raw.f64("pf").filter(|pf| *pf > 0.0).unwrap_or(1.0);
    Some(volt * current * pf)
}

/// Grid power, positive importing. Split import/export counters win over
/// the signed aggregate, which wins over the per-phase meter sum.
fn normalize_grid(raw: &RawReading, snapshot: &mut Snapshot) {
    snapshot.grid_import_power = raw.f64("gridImportPower").map(round1);
    snapshot.grid_export_power = raw.f64("gridExportPower").map(round1);
    snapshot.grid_meter_a = raw.f64("meterA").map(round1);
    snapshot.grid_meter_b = raw.f64("meterB").map(round1);
    snapshot.grid_meter_c = raw.f64("meterC").map(round1);

    let meter_sum = match (
        snapshot.grid_meter_a,
        snapshot.grid_meter_b,
        snapshot.grid_meter_c,
    ) {
        (None, None, None) => None,
        (a, b, c) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0) + c.unwrap_or(0.0)),
    };

    let direct = if let (Some(import), Some(export)) =
        (snapshot.grid_import_power, snapshot.grid_export_power)
    {
        Some(import - export)
    } else {
        raw.f64("gridPower")
    };

    snapshot.grid_power = match (direct, meter_sum) {
        (Some(direct), Some(sum)) => {
            if (direct - sum).abs() > GRID_MISMATCH_TOLERANCE {
                log::warn!(
                    "Grid power mismatch: aggregate {direct:.1} W vs per-phase sum {sum:.1} W"
                );
            }
            Some(round1(direct))
        }
        (Some(direct), None) => Some(round1(direct)),
        (None, Some(sum)) => Some(round1(sum)),
        (None, None) => None,
    };
}

/// Battery power, positive discharging, and state of charge in percent.
fn normalize_battery(raw: &RawReading, snapshot: &mut Snapshot) {
    snapshot.battery_voltage = raw.f64("curVolt").map(round1);
    snapshot.battery_current = raw.f64("chargeCurrent").map(round1);

    snapshot.battery_power = raw
        .first_f64(&["battPower", "batPower"])
        .map(round1)
        .or_else(|| {
            // The DC current sign carries the direction, positive discharging.
            match (snapshot.battery_voltage, snapshot.battery_current) {
                (Some(volt), Some(current)) => Some(round1(volt * current)),
                _ => None,
            }
        });

    snapshot.battery_soc = raw
        .first_f64(&["soc", "battSoc"])
        .or_else(|| {
            let remaining = raw.f64("curCap")?;
            let capacity = raw.f64("batteryCap").filter(|cap| *cap > 0.0)?;
            Some(remaining / capacity * 100.0)
        })
        .map(|soc| round1(soc.clamp(0.0, 100.0)));
}
