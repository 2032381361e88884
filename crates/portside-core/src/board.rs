//! Board and port value types
//!
//! Immutable descriptors for connection endpoints and hardware targets, plus
//! the derived [`AvailableBoard`] projection row. Identity predicates and the
//! projection ordering live here so every match/sort call site shares one
//! source of truth.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::natural;

/// Protocol string for directly attached serial endpoints.
pub const SERIAL_PROTOCOL: &str = "serial";

/// Protocol string for network-reachable endpoints.
pub const NETWORK_PROTOCOL: &str = "network";

/// Placeholder board name for a port whose occupant could not be identified.
pub const UNKNOWN_BOARD_NAME: &str = "Unknown";

/// A connection endpoint a board can occupy.
///
/// Ports are compared structurally, never by identity: two ports are the same
/// endpoint iff address and protocol both match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Endpoint address (e.g. `/dev/ttyACM0`, `COM5`, `192.168.0.17`).
    pub address: String,

    /// Transport protocol (`"serial"`, `"network"`, or vendor-specific).
    pub protocol: String,
}

impl Port {
    pub fn new(address: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocol: protocol.into(),
        }
    }

    /// Shorthand for a serial-protocol port.
    pub fn serial(address: impl Into<String>) -> Self {
        Self::new(address, SERIAL_PROTOCOL)
    }

    /// Shorthand for a network-protocol port.
    pub fn network(address: impl Into<String>) -> Self {
        Self::new(address, NETWORK_PROTOCOL)
    }

    /// Structural endpoint identity: address and protocol must both match.
    pub fn same_as(&self, other: &Port) -> bool {
        self.address == other.address && self.protocol == other.protocol
    }

    pub fn is_serial(&self) -> bool {
        self.protocol == SERIAL_PROTOCOL
    }

    pub fn is_network(&self) -> bool {
        self.protocol == NETWORK_PROTOCOL
    }

    /// Sort class for the available-board ordering: serial before network
    /// before anything else.
    pub(crate) fn protocol_rank(&self) -> u8 {
        if self.is_serial() {
            0
        } else if self.is_network() {
            1
        } else {
            2
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.address)
    }
}

/// A hardware target.
///
/// Board identity is name + FQBN, exactly -- including FQBN absence. The
/// optional `port` records where discovery saw the board and is excluded
/// from identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Human-readable board name (e.g. `Uno`).
    pub name: String,

    /// Fully-qualified board identifier selecting the build target, when the
    /// providing package is installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqbn: Option<String>,

    /// Identifier of the package providing this board definition, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,

    /// Port this board was discovered on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
}

impl Board {
    /// A board known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fqbn: None,
            package_id: None,
            port: None,
        }
    }

    /// A fully identified board.
    pub fn with_fqbn(name: impl Into<String>, fqbn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fqbn: Some(fqbn.into()),
            package_id: None,
            port: None,
        }
    }

    /// Attach the port this board was discovered on.
    pub fn on_port(mut self, port: Port) -> Self {
        self.port = Some(port);
        self
    }

    /// Mark which package provides this board definition.
    pub fn from_package(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = Some(package_id.into());
        self
    }

    /// Board identity: name and FQBN must match exactly, FQBN
    /// presence/absence included.
    pub fn same_as(&self, other: &Board) -> bool {
        self.name == other.name && self.fqbn == other.fqbn
    }

    /// True when the board carries a non-empty FQBN.
    pub fn has_fqbn(&self) -> bool {
        self.fqbn.as_deref().is_some_and(|fqbn| !fqbn.is_empty())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fqbn {
            Some(fqbn) => write!(f, "{} ({})", self.name, fqbn),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Confidence tier for how an available board's identity was determined.
///
/// The derived `Ord` follows declaration order and is what the projection
/// sort uses: recognized entries before guessed before incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailableBoardState {
    /// Identity came from live discovery.
    Recognized,

    /// Identity was inferred from a remembered board-on-port mapping.
    Guessed,

    /// Nothing is known beyond the port existing, or the entry carries a
    /// selection with no live match.
    Incomplete,
}

/// One row of the derived "available boards" projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBoard {
    /// The board occupying (or believed to occupy) the port.
    pub board: Board,

    /// The live port this entry occupies. `None` only for the synthetic
    /// entry carrying a selection with no live match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,

    /// How the board identity was determined.
    pub state: AvailableBoardState,

    /// Whether this entry matches the current selected configuration.
    pub selected: bool,
}

impl AvailableBoard {
    /// Port address of this entry; empty for the port-less synthetic entry.
    pub fn port_address(&self) -> &str {
        self.port.as_ref().map(|p| p.address.as_str()).unwrap_or("")
    }

    fn protocol_rank(&self) -> u8 {
        self.port.as_ref().map(Port::protocol_rank).unwrap_or(2)
    }

    /// Total order over projection entries: serial before all other
    /// protocols, network before the rest, recognized before guessed before
    /// incomplete within a protocol class, natural port-address order last.
    pub fn compare(a: &AvailableBoard, b: &AvailableBoard) -> Ordering {
        a.protocol_rank()
            .cmp(&b.protocol_rank())
            .then_with(|| a.state.cmp(&b.state))
            .then_with(|| natural::compare(a.port_address(), b.port_address()))
    }

    /// Equality used to decide whether a rebuilt projection is observably
    /// different from the previous one: board identity, everything the
    /// ordering depends on, and the selection flag.
    pub fn same_listing(&self, other: &AvailableBoard) -> bool {
        self.board.name == other.board.name
            && self.board.fqbn == other.board.fqbn
            && self.state == other.state
            && self.selected == other.selected
            && match (&self.port, &other.port) {
                (Some(a), Some(b)) => a.same_as(b),
                (None, None) => true,
                _ => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(board: Board, port: Option<Port>, state: AvailableBoardState) -> AvailableBoard {
        AvailableBoard {
            board,
            port,
            state,
            selected: false,
        }
    }

    #[test]
    fn test_port_same_as() {
        let a = Port::serial("/dev/ttyACM0");
        assert!(a.same_as(&Port::serial("/dev/ttyACM0")));
        assert!(!a.same_as(&Port::serial("/dev/ttyACM1")));
        // same address, different protocol is a different endpoint
        assert!(!a.same_as(&Port::network("/dev/ttyACM0")));
    }

    #[test]
    fn test_port_display() {
        assert_eq!(Port::serial("COM5").to_string(), "serial://COM5");
        assert_eq!(
            Port::network("192.168.0.17").to_string(),
            "network://192.168.0.17"
        );
    }

    #[test]
    fn test_board_identity_is_name_plus_fqbn() {
        let bare = Board::named("Uno");
        let full = Board::with_fqbn("Uno", "arduino:avr:uno");

        assert!(bare.same_as(&Board::named("Uno")));
        assert!(full.same_as(&Board::with_fqbn("Uno", "arduino:avr:uno")));
        // fqbn presence/absence is part of the identity
        assert!(!bare.same_as(&full));
        assert!(!full.same_as(&Board::with_fqbn("Uno", "arduino:avr:mega")));
        assert!(!full.same_as(&Board::with_fqbn("Mega", "arduino:avr:uno")));
    }

    #[test]
    fn test_board_identity_ignores_port_and_package() {
        let plugged = Board::with_fqbn("Uno", "arduino:avr:uno")
            .on_port(Port::serial("COM5"))
            .from_package("arduino:avr");
        assert!(plugged.same_as(&Board::with_fqbn("Uno", "arduino:avr:uno")));
    }

    #[test]
    fn test_has_fqbn_rejects_empty() {
        assert!(Board::with_fqbn("Uno", "arduino:avr:uno").has_fqbn());
        assert!(!Board::named("Uno").has_fqbn());
        assert!(!Board::with_fqbn("Uno", "").has_fqbn());
    }

    #[test]
    fn test_projection_order() {
        // serial recognized, serial guessed, network recognized, other recognized
        let a = entry(
            Board::named("A"),
            Some(Port::serial("A")),
            AvailableBoardState::Recognized,
        );
        let b = entry(
            Board::named("B"),
            Some(Port::serial("B")),
            AvailableBoardState::Guessed,
        );
        let c = entry(
            Board::named("C"),
            Some(Port::network("C")),
            AvailableBoardState::Recognized,
        );
        let d = entry(
            Board::named("D"),
            Some(Port::new("D", "usb")),
            AvailableBoardState::Recognized,
        );

        let mut items = vec![d.clone(), c.clone(), b.clone(), a.clone()];
        items.sort_by(AvailableBoard::compare);

        let order: Vec<&str> = items.iter().map(|i| i.board.name.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_projection_order_natural_addresses() {
        let com10 = entry(
            Board::named("x"),
            Some(Port::serial("COM10")),
            AvailableBoardState::Recognized,
        );
        let com2 = entry(
            Board::named("y"),
            Some(Port::serial("COM2")),
            AvailableBoardState::Recognized,
        );

        let mut items = vec![com10, com2];
        items.sort_by(AvailableBoard::compare);
        assert_eq!(items[0].port_address(), "COM2");
        assert_eq!(items[1].port_address(), "COM10");
    }

    #[test]
    fn test_portless_entry_sorts_last() {
        let synthetic = entry(Board::named("S"), None, AvailableBoardState::Incomplete);
        let serial = entry(
            Board::named("A"),
            Some(Port::serial("A")),
            AvailableBoardState::Incomplete,
        );

        let mut items = vec![synthetic.clone(), serial.clone()];
        items.sort_by(AvailableBoard::compare);
        assert_eq!(items[0].board.name, "A");
        assert_eq!(items[1].board.name, "S");
    }

    #[test]
    fn test_same_listing_tracks_observable_fields() {
        let base = entry(
            Board::with_fqbn("Uno", "arduino:avr:uno"),
            Some(Port::serial("COM5")),
            AvailableBoardState::Recognized,
        );

        assert!(base.same_listing(&base.clone()));

        let mut selected = base.clone();
        selected.selected = true;
        assert!(!base.same_listing(&selected));

        let mut demoted = base.clone();
        demoted.state = AvailableBoardState::Guessed;
        assert!(!base.same_listing(&demoted));

        let mut stripped = base.clone();
        stripped.board.fqbn = None;
        assert!(!base.same_listing(&stripped));

        let mut moved = base.clone();
        moved.port = Some(Port::serial("COM6"));
        assert!(!base.same_listing(&moved));

        // package id is not observable in the listing
        let mut repackaged = base.clone();
        repackaged.board.package_id = Some("arduino:avr".to_string());
        assert!(base.same_listing(&repackaged));
    }

    #[test]
    fn test_serde_camel_case() {
        let board = Board::with_fqbn("Uno", "arduino:avr:uno").from_package("arduino:avr");
        let json = serde_json::to_string(&board).unwrap();
        assert!(json.contains("\"packageId\""));
        assert!(json.contains("\"fqbn\""));

        let back: Board = serde_json::from_str(&json).unwrap();
        assert!(back.same_as(&board));
    }
}
