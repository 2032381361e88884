//! Event payloads delivered to the engine by its external collaborators

use serde::{Deserialize, Serialize};

use crate::board::{Board, Port};

/// One snapshot of what discovery can currently see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListSnapshot {
    /// Attached boards, each carrying the port it occupies.
    pub boards: Vec<Board>,

    /// All currently open/visible ports.
    pub ports: Vec<Port>,
}

/// Discovery update: the previous and the new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedBoardsChangeEvent {
    pub old_state: DeviceListSnapshot,
    pub new_state: DeviceListSnapshot,
}

impl AttachedBoardsChangeEvent {
    /// Update carrying only the new snapshot, with an empty previous state.
    pub fn to_state(boards: Vec<Board>, ports: Vec<Port>) -> Self {
        Self {
            old_state: DeviceListSnapshot::default(),
            new_state: DeviceListSnapshot { boards, ports },
        }
    }

    /// Short description for logs.
    pub fn summary(&self) -> String {
        format!(
            "boards {} -> {}, ports {} -> {}",
            self.old_state.boards.len(),
            self.new_state.boards.len(),
            self.old_state.ports.len(),
            self.new_state.ports.len(),
        )
    }
}

/// A hardware-support package finished installing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInstalledEvent {
    /// Identifier of the installed package.
    pub package_id: String,

    /// Display label of the installed version.
    pub installed_version_label: String,

    /// Boards this package provides.
    pub boards: Vec<Board>,
}

/// A hardware-support package was removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUninstalledEvent {
    /// Identifier of the removed package.
    pub package_id: String,

    /// Boards this package used to provide.
    pub boards: Vec<Board>,
}
