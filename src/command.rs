use crate::protocol::*;
use crate::snapshot::SnapshotKind;
use crate::{Error, Result};

/// A control the device accepts on its control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// On/off switch; any non-zero value means on.
    BooleanToggle { key: &'static str },
    /// Numeric setpoint with an inclusive range.
    BoundedSetpoint {
        key: &'static str,
        min: i64,
        max: i64,
    },
}

impl Command {
    pub const SAUNA_POWER: Command = Command::BooleanToggle { key: CONTROL_SAUNA };
    pub const VAPOR_POWER: Command = Command::BooleanToggle { key: CONTROL_VAPOR };
    pub const LIGHT_POWER: Command = Command::BooleanToggle { key: CONTROL_LIGHT };
    pub const TARGET_TEMPERATURE: Command = Command::BoundedSetpoint {
        key: CONTROL_TARGET_TEMPERATURE,
        min: 30,
        max: 115,
    };
    pub const TARGET_HUMIDITY: Command = Command::BoundedSetpoint {
        key: CONTROL_TARGET_HUMIDITY,
        min: 0,
        max: 100,
    };
    pub const LIGHT_INTENSITY: Command = Command::BoundedSetpoint {
        key: CONTROL_LIGHT_INTENSITY,
        min: 0,
        max: 100,
    };

    pub const ALL: [Command; 6] = [
        Command::SAUNA_POWER,
        Command::VAPOR_POWER,
        Command::LIGHT_POWER,
        Command::TARGET_TEMPERATURE,
        Command::TARGET_HUMIDITY,
        Command::LIGHT_INTENSITY,
    ];

    pub fn from_key(key: &str) -> Option<Command> {
        Command::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match *self {
            Command::BooleanToggle { key } | Command::BoundedSetpoint { key, .. } => key,
        }
    }

    /// The value to put on the wire, or a validation error.
    pub fn validate(&self, value: i64) -> Result<i64> {
        match *self {
            Command::BooleanToggle { .. } => Ok(i64::from(value != 0)),
            Command::BoundedSetpoint { key, min, max } => {
                if (min..=max).contains(&value) {
                    Ok(value)
                } else {
                    Err(Error::validation(
                        key,
                        format!("{value} outside {min}..={max}"),
                    ))
                }
            }
        }
    }

    /// Switching a toggle off needs the device to settle before its state
    /// endpoint reflects the change.
    pub fn needs_settle(&self, wire_value: i64) -> bool {
        matches!(self, Command::BooleanToggle { .. }) && wire_value == 0
    }

    /// Coordinators to refresh after this command succeeds.
    pub fn affected(&self) -> &'static [SnapshotKind] {
        const BOTH: &[SnapshotKind] = &[SnapshotKind::DesiredSettings, SnapshotKind::ActualStatus];
        const SETTINGS: &[SnapshotKind] = &[SnapshotKind::DesiredSettings];
        match self.key() {
            CONTROL_SAUNA | CONTROL_TARGET_TEMPERATURE => BOTH,
            _ => SETTINGS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_bounds_are_inclusive() {
        let cmd = Command::TARGET_TEMPERATURE;
        assert!(cmd.validate(29).unwrap_err().is_validation());
        assert_eq!(cmd.validate(30).unwrap(), 30);
        assert_eq!(cmd.validate(115).unwrap(), 115);
        assert!(cmd.validate(116).unwrap_err().is_validation());
    }

    #[test]
    fn percentage_bounds() {
        for cmd in [Command::TARGET_HUMIDITY, Command::LIGHT_INTENSITY] {
            assert!(cmd.validate(-1).is_err());
            assert!(cmd.validate(0).is_ok());
            assert!(cmd.validate(100).is_ok());
            assert!(cmd.validate(101).is_err());
        }
    }

    #[test]
    fn toggles_normalize_to_zero_or_one() {
        let cmd = Command::SAUNA_POWER;
        assert_eq!(cmd.validate(0).unwrap(), 0);
        assert_eq!(cmd.validate(1).unwrap(), 1);
        assert_eq!(cmd.validate(7).unwrap(), 1);
        assert!(cmd.needs_settle(0));
        assert!(!cmd.needs_settle(1));
        assert!(!Command::TARGET_HUMIDITY.needs_settle(0));
    }

    #[test]
    fn lookup_by_key() {
        assert_eq!(Command::from_key("Tc"), Some(Command::TARGET_TEMPERATURE));
        assert_eq!(Command::from_key("Lxc"), Some(Command::LIGHT_POWER));
        assert_eq!(Command::from_key("Td"), None);
    }

    #[test]
    fn power_refreshes_both_coordinators() {
        assert_eq!(Command::SAUNA_POWER.affected().len(), 2);
        assert_eq!(Command::VAPOR_POWER.affected(), &[SnapshotKind::DesiredSettings]);
    }
}
