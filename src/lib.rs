mod client;
mod command;
mod coordinator;
mod diff;
mod error;
mod logger;
mod protocol;
mod snapshot;
mod transport;
mod types;

pub use client::{SaunaClient, SaunaClientBuilder};
pub use command::Command;
pub use coordinator::{Coordinator, CoordinatorState};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::Endpoint;
pub use snapshot::{Scalar, Snapshot, SnapshotKind};
pub use transport::Transport;
pub use types::*;
