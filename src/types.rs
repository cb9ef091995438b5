use std::fmt;

use crate::error::Error;
use crate::protocol::*;
use crate::snapshot::{Scalar, Snapshot, SnapshotKind};

/// Cabin mode as reported by `S` on the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaunaStatus {
    Inactive,
    Finnish,
    Bio,
    AfterBurner,
    Fault,
    /// Controller error codes 250..=255.
    Error(u8),
    Unknown(i64),
}

impl SaunaStatus {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => SaunaStatus::Inactive,
            1 => SaunaStatus::Finnish,
            2 => SaunaStatus::Bio,
            3 => SaunaStatus::AfterBurner,
            4 => SaunaStatus::Fault,
            250..=255 => SaunaStatus::Error(raw as u8),
            other => SaunaStatus::Unknown(other),
        }
    }

    pub fn raw(&self) -> i64 {
        match self {
            SaunaStatus::Inactive => 0,
            SaunaStatus::Finnish => 1,
            SaunaStatus::Bio => 2,
            SaunaStatus::AfterBurner => 3,
            SaunaStatus::Fault => 4,
            SaunaStatus::Error(code) => i64::from(*code),
            SaunaStatus::Unknown(raw) => *raw,
        }
    }

    pub fn label(&self) -> String {
        match self {
            SaunaStatus::Inactive => "Inactive".to_string(),
            SaunaStatus::Finnish => "Finnish Mode".to_string(),
            SaunaStatus::Bio => "BIO Mode".to_string(),
            SaunaStatus::AfterBurner => "After Burner Mode".to_string(),
            SaunaStatus::Fault => "Fault".to_string(),
            SaunaStatus::Error(252) => "Error: Invalid Write Frame".to_string(),
            SaunaStatus::Error(253) => "Error: Read-Only Frame".to_string(),
            SaunaStatus::Error(254) => "Error: No Read/Write Frame".to_string(),
            SaunaStatus::Error(255) => "Error: No Status Info".to_string(),
            SaunaStatus::Error(code) => format!("Error {code}"),
            SaunaStatus::Unknown(raw) => format!("Unknown ({raw})"),
        }
    }

    /// Labels of every known status, for enum-style sensors.
    pub fn options() -> Vec<String> {
        [0, 1, 2, 3, 4, 250, 251, 252, 253, 254, 255]
            .into_iter()
            .map(|raw| SaunaStatus::from_raw(raw).label())
            .collect()
    }

    pub fn is_heating(&self) -> bool {
        matches!(
            self,
            SaunaStatus::Finnish | SaunaStatus::Bio | SaunaStatus::AfterBurner
        )
    }
}

impl fmt::Display for SaunaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatingAction {
    Off,
    Heating,
}

impl HeatingAction {
    /// Heating while the cabin reports a heating mode, off otherwise. An
    /// inactive cabin reads as off even when power is desired.
    pub fn from_status(status: SaunaStatus) -> Self {
        if status.is_heating() {
            HeatingAction::Heating
        } else {
            HeatingAction::Off
        }
    }
}

/// Typed view over an [`SnapshotKind::ActualStatus`] snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActualStatus {
    pub status: Option<SaunaStatus>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light_on: Option<bool>,
}

impl ActualStatus {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            status: snapshot.int(KEY_STATUS).map(SaunaStatus::from_raw),
            temperature: snapshot.float(KEY_TEMPERATURE),
            humidity: snapshot.float(KEY_HUMIDITY),
            light_on: snapshot.is_on(KEY_LIGHT),
        }
    }
}

/// Typed view over a [`SnapshotKind::DesiredSettings`] snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredSettings {
    pub sauna_on: Option<bool>,
    pub vapor_on: Option<bool>,
    pub light_on: Option<bool>,
    pub target_temperature: Option<i64>,
    pub target_humidity: Option<i64>,
    pub light_intensity: Option<i64>,
}

impl DesiredSettings {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            sauna_on: snapshot.is_on(KEY_SAUNA_DESIRED),
            vapor_on: snapshot.is_on(KEY_VAPOR_DESIRED),
            light_on: snapshot.is_on(KEY_LIGHT_DESIRED),
            target_temperature: snapshot.int(KEY_TARGET_TEMPERATURE),
            target_humidity: snapshot.int(KEY_TARGET_HUMIDITY),
            light_intensity: snapshot.int(KEY_LIGHT_INTENSITY),
        }
    }

    /// Light brightness on a 0..=255 scale.
    pub fn brightness(&self) -> Option<u8> {
        self.light_intensity.map(intensity_to_brightness)
    }
}

/// Device light intensity (0..=100) to a 0..=255 brightness.
pub fn intensity_to_brightness(intensity: i64) -> u8 {
    (intensity.clamp(0, 100) as f64 * 2.55).round() as u8
}

/// 0..=255 brightness to device light intensity (0..=100).
pub fn brightness_to_intensity(brightness: u8) -> i64 {
    (f64::from(brightness) / 2.55).round() as i64
}

/// Emitted when a refresh changes what readers see.
#[derive(Debug, Clone)]
pub enum Event {
    StatusChanged { status: SaunaStatus },
    TemperatureChanged { celsius: f64 },
    HumidityChanged { percent: f64 },
    LightStateChanged { on: bool },

    SaunaPowerChanged { on: bool },
    VaporPowerChanged { on: bool },
    LightPowerChanged { on: bool },
    TargetTemperatureChanged { celsius: i64 },
    TargetHumidityChanged { percent: i64 },
    LightIntensityChanged { percent: i64 },

    ValueChanged { kind: SnapshotKind, key: String, value: Scalar },
    ValueRemoved { kind: SnapshotKind, key: String },

    RefreshFailed { kind: SnapshotKind, error: Error },
    RefreshRecovered { kind: SnapshotKind },
}
