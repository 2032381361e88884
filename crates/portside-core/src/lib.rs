//! # portside-core - Core Domain Types
//!
//! Foundation crate for Portside. Provides the board/port value types, the
//! selected-configuration model, event payloads, error handling, and the
//! logging bootstrap.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`board`)
//! - [`Port`] - A connection endpoint (address + protocol)
//! - [`Board`] - A hardware target (name, optional FQBN, optional package)
//! - [`AvailableBoard`] - One row of the derived "available boards" view
//! - [`AvailableBoardState`] - Identity confidence tier (Recognized, Guessed, Incomplete)
//!
//! ### Configuration (`config`)
//! - [`BoardsConfig`] - The user's selected board/port pair and its validity tiers
//! - Storage key constants and [`last_selected_board_on_port_key()`]
//!
//! ### Events (`events`)
//! - [`AttachedBoardsChangeEvent`] - Discovery snapshot delta
//! - [`PackageInstalledEvent`] / [`PackageUninstalledEvent`] - Package lifecycle
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with a typed timeout variant
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use portside_core::prelude::*;
//! ```

pub mod board;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod natural;

/// Prelude for common imports used throughout all Portside crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use board::{
    AvailableBoard, AvailableBoardState, Board, Port, NETWORK_PROTOCOL, SERIAL_PROTOCOL,
    UNKNOWN_BOARD_NAME,
};
pub use config::{
    last_selected_board_on_port_key, BoardsConfig, LATEST_CONFIG_KEY, LATEST_VALID_CONFIG_KEY,
};
pub use error::{Error, Result};
pub use events::{
    AttachedBoardsChangeEvent, DeviceListSnapshot, PackageInstalledEvent, PackageUninstalledEvent,
};
