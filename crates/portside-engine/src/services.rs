//! Service seams the engine is generic over
//!
//! Discovery and the user-facing warning surface are external collaborators;
//! the engine only sees these two narrow async contracts.

use portside_core::prelude::*;
use portside_core::{Board, Port};

/// Snapshot queries against the device discovery feed.
///
/// Queried once at startup; later changes arrive as
/// [`AttachedBoardsChangeEvent`](portside_core::AttachedBoardsChangeEvent)s
/// pushed into the engine by the host.
#[trait_variant::make(Send)]
pub trait BoardDiscovery {
    /// Boards currently reported attached, each carrying the port it
    /// occupies.
    async fn attached_boards(&self) -> Result<Vec<Board>>;

    /// All currently open/visible ports.
    async fn available_ports(&self) -> Result<Vec<Port>>;
}

/// Narrow warning contract to the user-facing layer.
///
/// Presentation is entirely the host's business; the engine only needs the
/// label of the action the user chose, if any.
#[trait_variant::make(Send)]
pub trait UserNotifier {
    async fn warn(&self, message: &str, actions: &[&str]) -> Result<Option<String>>;
}
