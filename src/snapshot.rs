use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::protocol::Endpoint;
use crate::{Error, Result};

/// Which endpoint a snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotKind {
    /// Fast-changing physical readings.
    ActualStatus,
    /// Device configuration and target state.
    DesiredSettings,
}

impl SnapshotKind {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            SnapshotKind::ActualStatus => Endpoint::Status,
            SnapshotKind::DesiredSettings => Endpoint::Settings,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SnapshotKind::ActualStatus => "status",
            SnapshotKind::DesiredSettings => "settings",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Int(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    /// Integer reading; numeric strings are parsed, whole floats truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    /// The device encodes on/off as `1`/`"1"`; everything else reads as off.
    pub fn is_on(&self) -> bool {
        self.to_string() == "1"
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// One decoded response body. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    pub fetched_at: DateTime<Utc>,
    values: BTreeMap<String, Scalar>,
}

impl Snapshot {
    pub fn new(kind: SnapshotKind, values: BTreeMap<String, Scalar>) -> Self {
        Self {
            kind,
            fetched_at: Utc::now(),
            values,
        }
    }

    /// Decode a response body. Anything but a JSON object is rejected;
    /// nested and null members are dropped.
    pub fn from_json(kind: SnapshotKind, body: &Value) -> Result<Self> {
        let Value::Object(map) = body else {
            return Err(Error::Client {
                message: format!("{kind} response is not a JSON object: {body}"),
                source: None,
            });
        };

        let mut values = BTreeMap::new();
        for (key, value) in map {
            match Scalar::from_json(value) {
                Some(scalar) => {
                    values.insert(key.clone(), scalar);
                }
                None => debug!(%kind, key = %key, "skipping non-scalar value"),
            }
        }
        Ok(Self::new(kind, values))
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Scalar::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Scalar::as_f64)
    }

    pub fn is_on(&self, key: &str) -> Option<bool> {
        self.get(key).map(Scalar::is_on)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
