use serde_json::Value;

use crate::protocol::*;
use crate::snapshot::{Scalar, Snapshot, SnapshotKind};
use crate::types::{Event, SaunaStatus};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change<T> {
    pub key: String,
    pub old: Option<T>,
    pub new: Option<T>,
}

/// Key-level differences between two snapshots, including removed keys.
pub(crate) fn diff_snapshots(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Change<Scalar>> {
    let mut changes = Vec::new();
    for (key, value) in current.iter() {
        let old = previous.and_then(|p| p.get(key));
        if old != Some(value) {
            changes.push(Change {
                key: key.to_string(),
                old: old.cloned(),
                new: Some(value.clone()),
            });
        }
    }
    if let Some(prev) = previous {
        for (key, value) in prev.iter() {
            if !current.contains_key(key) {
                changes.push(Change {
                    key: key.to_string(),
                    old: Some(value.clone()),
                    new: None,
                });
            }
        }
    }
    changes
}

/// Top-level differences between two JSON bodies; non-objects compare whole.
pub(crate) fn diff_bodies(previous: &Value, current: &Value) -> Vec<Change<Value>> {
    let (Value::Object(prev), Value::Object(curr)) = (previous, current) else {
        if previous == current {
            return Vec::new();
        }
        return vec![Change {
            key: String::new(),
            old: Some(previous.clone()),
            new: Some(current.clone()),
        }];
    };

    let mut changes: Vec<_> = curr
        .iter()
        .filter(|(k, v)| prev.get(*k) != Some(*v))
        .map(|(k, v)| Change {
            key: k.clone(),
            old: prev.get(k).cloned(),
            new: Some(v.clone()),
        })
        .collect();
    changes.extend(
        prev.iter()
            .filter(|(k, _)| !curr.contains_key(*k))
            .map(|(k, v)| Change {
                key: k.clone(),
                old: Some(v.clone()),
                new: None,
            }),
    );
    changes
}

fn map_typed_event(kind: SnapshotKind, key: &str, value: &Scalar) -> Option<Event> {
    let event = match (kind, key) {
        (SnapshotKind::ActualStatus, KEY_STATUS) => Event::StatusChanged {
            status: SaunaStatus::from_raw(value.as_i64()?),
        },
        (SnapshotKind::ActualStatus, KEY_TEMPERATURE) => Event::TemperatureChanged {
            celsius: value.as_f64()?,
        },
        (SnapshotKind::ActualStatus, KEY_HUMIDITY) => Event::HumidityChanged {
            percent: value.as_f64()?,
        },
        (SnapshotKind::ActualStatus, KEY_LIGHT) => Event::LightStateChanged { on: value.is_on() },
        (SnapshotKind::DesiredSettings, KEY_SAUNA_DESIRED) => {
            Event::SaunaPowerChanged { on: value.is_on() }
        }
        (SnapshotKind::DesiredSettings, KEY_VAPOR_DESIRED) => {
            Event::VaporPowerChanged { on: value.is_on() }
        }
        (SnapshotKind::DesiredSettings, KEY_LIGHT_DESIRED) => {
            Event::LightPowerChanged { on: value.is_on() }
        }
        (SnapshotKind::DesiredSettings, KEY_TARGET_TEMPERATURE) => {
            Event::TargetTemperatureChanged {
                celsius: value.as_i64()?,
            }
        }
        (SnapshotKind::DesiredSettings, KEY_TARGET_HUMIDITY) => Event::TargetHumidityChanged {
            percent: value.as_i64()?,
        },
        (SnapshotKind::DesiredSettings, KEY_LIGHT_INTENSITY) => Event::LightIntensityChanged {
            percent: value.as_i64()?,
        },
        _ => return None,
    };
    Some(event)
}

/// Events describing the move from `previous` to `current`. Known keys
/// become typed events, everything else a generic one.
pub(crate) fn snapshot_events(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Event> {
    let kind = current.kind;
    diff_snapshots(previous, current)
        .into_iter()
        .map(|change| match change.new {
            Some(value) => map_typed_event(kind, &change.key, &value).unwrap_or(
                Event::ValueChanged {
                    kind,
                    key: change.key,
                    value,
                },
            ),
            None => Event::ValueRemoved {
                kind,
                key: change.key,
            },
        })
        .collect()
}
