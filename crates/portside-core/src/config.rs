//! Selected board/port configuration and its persistence keys

use serde::{Deserialize, Serialize};

use crate::board::{Board, Port};

/// Storage key for the last configuration that reached the uploadable tier.
pub const LATEST_VALID_CONFIG_KEY: &str = "latest-valid-boards-config";

/// Storage key for the last configuration set, valid or not.
pub const LATEST_CONFIG_KEY: &str = "latest-boards-config";

/// Storage key remembering which board was last selected on a port.
///
/// Derived from the address alone: the protocol is intentionally not part of
/// the key, so two protocols sharing an address string collide. Restore
/// logic depends on this exact key shape staying stable across versions.
pub fn last_selected_board_on_port_key(address: &str) -> String {
    format!("last-selected-board-on-port:{address}")
}

/// The user's selected board/port pair.
///
/// Validity tiers are monotonic in strictness: *unset* (no board),
/// *verifiable* (a board, FQBN optional), *uploadable* (a board with a
/// non-empty FQBN plus a port). Only an uploadable configuration may be
/// persisted as "latest valid".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_board: Option<Board>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_port: Option<Port>,
}

impl BoardsConfig {
    pub fn new(board: Board, port: Port) -> Self {
        Self {
            selected_board: Some(board),
            selected_port: Some(port),
        }
    }

    pub fn with_board(board: Board) -> Self {
        Self {
            selected_board: Some(board),
            selected_port: None,
        }
    }

    /// Verifiable tier: a board is selected.
    pub fn has_selected_board(&self) -> bool {
        self.selected_board.is_some()
    }

    /// Uploadable tier: a board with a non-empty FQBN plus a port.
    pub fn is_uploadable(&self) -> bool {
        self.selected_port.is_some()
            && self
                .selected_board
                .as_ref()
                .is_some_and(Board::has_fqbn)
    }

    /// Whether the given board/port pair is exactly this selection.
    ///
    /// Board equality is [`Board::same_as`]; ports must either both be
    /// absent or be the same endpoint.
    pub fn matches(&self, board: &Board, port: Option<&Port>) -> bool {
        let board_matches = self
            .selected_board
            .as_ref()
            .is_some_and(|selected| selected.same_as(board));
        let port_matches = match (&self.selected_port, port) {
            (Some(selected), Some(port)) => selected.same_as(port),
            (None, None) => true,
            _ => false,
        };
        board_matches && port_matches
    }
}
