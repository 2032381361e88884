//! The board/port reconciliation engine
//!
//! Owns the selected configuration, the attached-device state, and the
//! derived "available boards" projection. Every mutation funnels through
//! this one struct on a single logical execution context; external
//! collaborators read through accessors and notification channels.
//!
//! The persistence/notification contract for a selection change is:
//! in-memory fields update synchronously, then persist, then reconcile,
//! then fire "configuration changed" with the new current configuration.

use std::future::Future;
use std::time::Duration;

use url::Url;

use portside_core::prelude::*;
use portside_core::{
    last_selected_board_on_port_key, AttachedBoardsChangeEvent, AvailableBoard,
    AvailableBoardState, Board, BoardsConfig, PackageInstalledEvent, PackageUninstalledEvent,
    Port, LATEST_CONFIG_KEY, LATEST_VALID_CONFIG_KEY, SERIAL_PROTOCOL, UNKNOWN_BOARD_NAME,
};

use crate::emitter::{Emitter, EventSubscription};
use crate::services::{BoardDiscovery, UserNotifier};
use crate::store::ConfigStore;

/// Actions offered with the package-install reselect prompt.
const RESELECT_YES: &str = "Yes";
const RESELECT_NO: &str = "No";

/// The reconciliation engine.
///
/// Generic over its three collaborators: the persistent store, the
/// discovery feed, and the user-facing notifier. All state mutation runs
/// through `&mut self` on one cooperative execution context; store and
/// discovery calls are awaited continuations of that context.
pub struct BoardsEngine<S, D, N> {
    store: S,
    discovery: D,
    notifier: N,

    ready: bool,
    attached_boards: Vec<Board>,
    available_ports: Vec<Port>,
    available_boards: Vec<AvailableBoard>,

    boards_config: BoardsConfig,
    latest_boards_config: Option<BoardsConfig>,
    latest_valid_boards_config: Option<BoardsConfig>,

    config_changed: Emitter<BoardsConfig>,
    boards_changed: Emitter<Vec<AvailableBoard>>,
    ports_changed: Emitter<Vec<Port>>,
    reselect_requested: Emitter<String>,
}

impl<S, D, N> BoardsEngine<S, D, N>
where
    S: ConfigStore,
    D: BoardDiscovery,
    N: UserNotifier,
{
    pub fn new(store: S, discovery: D, notifier: N) -> Self {
        Self {
            store,
            discovery,
            notifier,
            ready: false,
            attached_boards: Vec::new(),
            available_ports: Vec::new(),
            available_boards: Vec::new(),
            boards_config: BoardsConfig::default(),
            latest_boards_config: None,
            latest_valid_boards_config: None,
            config_changed: Emitter::new(),
            boards_changed: Emitter::new(),
            ports_changed: Emitter::new(),
            reselect_requested: Emitter::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn boards_config(&self) -> &BoardsConfig {
        &self.boards_config
    }

    /// Last configuration ever set, valid or not.
    pub fn latest_boards_config(&self) -> Option<&BoardsConfig> {
        self.latest_boards_config.as_ref()
    }

    /// Last configuration that reached the uploadable tier.
    pub fn latest_valid_boards_config(&self) -> Option<&BoardsConfig> {
        self.latest_valid_boards_config.as_ref()
    }

    pub fn attached_boards(&self) -> &[Board] {
        &self.attached_boards
    }

    pub fn available_ports(&self) -> &[Port] {
        &self.available_ports
    }

    pub fn available_boards(&self) -> &[AvailableBoard] {
        &self.available_boards
    }

    /// Live subscriptions on the available-boards channel. Lets hosts
    /// assert that one-shot waits released their listener.
    pub fn available_boards_listener_count(&self) -> usize {
        self.boards_changed.listener_count()
    }

    // ─────────────────────────────────────────────────────────────
    // Notification channels
    // ─────────────────────────────────────────────────────────────

    pub fn on_boards_config_changed(
        &self,
        listener: impl Fn(&BoardsConfig) + Send + 'static,
    ) -> EventSubscription {
        self.config_changed.subscribe(listener)
    }

    pub fn on_available_boards_changed(
        &self,
        listener: impl Fn(&Vec<AvailableBoard>) + Send + 'static,
    ) -> EventSubscription {
        self.boards_changed.subscribe(listener)
    }

    pub fn on_available_ports_changed(
        &self,
        listener: impl Fn(&Vec<Port>) + Send + 'static,
    ) -> EventSubscription {
        self.ports_changed.subscribe(listener)
    }

    /// Fired with the previous board name when the user agreed to re-open
    /// board selection after an installed package renamed their board away.
    pub fn on_board_reselect_requested(
        &self,
        listener: impl Fn(&String) + Send + 'static,
    ) -> EventSubscription {
        self.reselect_requested.subscribe(listener)
    }

    // ─────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────

    /// One-shot startup: query the initial discovery snapshot, then restore
    /// a persisted configuration.
    ///
    /// Restore priority: a persisted valid configuration that still passes
    /// [`can_upload_to`](Self::can_upload_to), else the persisted latest
    /// (possibly invalid) configuration, else a configuration encoded in
    /// the launch URL's query parameters.
    pub async fn start(&mut self, launch_url: Option<&str>) -> Result<()> {
        if self.ready {
            warn!("Engine already started, ignoring");
            return Ok(());
        }

        let boards = self.discovery.attached_boards().await?;
        let ports = self.discovery.available_ports().await?;
        info!(
            "Initial discovery snapshot: {} boards, {} ports",
            boards.len(),
            ports.len()
        );
        self.attached_boards = boards;
        self.available_ports = ports;
        self.ready = true;
        self.ports_changed.fire(&self.available_ports);

        if let Some(valid) = self.load_config(LATEST_VALID_CONFIG_KEY).await? {
            if self.can_upload_to(&valid, true).await? {
                debug!("Restoring latest valid configuration");
                return self.set_boards_config(valid).await;
            }
        }
        if let Some(latest) = self.load_config(LATEST_CONFIG_KEY).await? {
            debug!("Restoring latest configuration");
            return self.set_boards_config(latest).await;
        }
        if let Some(from_url) = launch_url.and_then(config_from_launch_url) {
            debug!("Restoring configuration from launch URL");
            return self.set_boards_config(from_url).await;
        }

        self.reconcile().await
    }

    // ─────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────

    /// Replace the current configuration.
    ///
    /// Updates `latest_boards_config` immediately and, iff the new
    /// configuration is uploadable, `latest_valid_boards_config` too. Then
    /// persists, reconciles, and fires "configuration changed" -- in that
    /// order.
    pub async fn set_boards_config(&mut self, config: BoardsConfig) -> Result<()> {
        debug!(
            "Selecting board {:?} on port {:?}",
            config.selected_board.as_ref().map(|b| &b.name),
            config.selected_port.as_ref().map(|p| &p.address),
        );

        self.boards_config = config.clone();
        self.latest_boards_config = Some(config.clone());
        let uploadable = config.is_uploadable();
        if uploadable {
            self.latest_valid_boards_config = Some(config.clone());
        }

        self.store
            .set(LATEST_CONFIG_KEY, serde_json::to_value(&config)?)
            .await?;
        if uploadable {
            self.store
                .set(LATEST_VALID_CONFIG_KEY, serde_json::to_value(&config)?)
                .await?;
        }
        if let (Some(board), Some(port)) = (&config.selected_board, &config.selected_port) {
            // remember the board for this address so it can be guessed after
            // a re-plug, even when discovery cannot identify it
            let mut remembered = board.clone();
            remembered.port = None;
            self.store
                .set(
                    &last_selected_board_on_port_key(&port.address),
                    serde_json::to_value(&remembered)?,
                )
                .await?;
        }

        self.reconcile().await?;
        self.config_changed.fire(&self.boards_config);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────

    /// Whether `config` can be used to verify (compile for) a board.
    ///
    /// A false outcome is not an error; unless `silent`, it is surfaced as
    /// a warning through the notifier.
    pub async fn can_verify(&self, config: &BoardsConfig, silent: bool) -> Result<bool> {
        if config.has_selected_board() {
            return Ok(true);
        }
        if !silent {
            self.notifier.warn("No board selected.", &[]).await?;
        }
        Ok(false)
    }

    /// Whether `config` can be used to upload (flash). Warns, unless
    /// `silent`, about the first unmet condition: no board, no port, no
    /// FQBN.
    pub async fn can_upload_to(&self, config: &BoardsConfig, silent: bool) -> Result<bool> {
        let Some(board) = &config.selected_board else {
            if !silent {
                self.notifier.warn("No board selected.", &[]).await?;
            }
            return Ok(false);
        };
        if config.selected_port.is_none() {
            if !silent {
                self.notifier
                    .warn(&format!("No port selected for board '{}'.", board.name), &[])
                    .await?;
            }
            return Ok(false);
        }
        if !board.has_fqbn() {
            if !silent {
                self.notifier
                    .warn(
                        &format!("No FQBN available for board '{}'.", board.name),
                        &[],
                    )
                    .await?;
            }
            return Ok(false);
        }
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────
    // Waiting
    // ─────────────────────────────────────────────────────────────

    /// Resolve once an available board matches both `board` (board
    /// equality) and `port` (endpoint equality).
    ///
    /// A positive `timeout` that elapses first fails with
    /// [`Error::Timeout`]; `None` (or a zero duration) waits indefinitely.
    /// The internal subscription is released when the returned future
    /// settles or is dropped, whichever comes first.
    pub fn wait_until_available(
        &self,
        board: Board,
        port: Port,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        fn is_match(items: &[AvailableBoard], board: &Board, port: &Port) -> bool {
            items.iter().any(|item| {
                item.board.same_as(board)
                    && item.port.as_ref().is_some_and(|p| p.same_as(port))
            })
        }

        let already_available = is_match(&self.available_boards, &board, &port);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = self.boards_changed.subscribe(move |items: &Vec<AvailableBoard>| {
            if is_match(items, &board, &port) {
                let _ = tx.send(());
            }
        });

        async move {
            // keep the subscription alive for the duration of the wait; its
            // drop releases the listener whichever way the race settles
            let _subscription = subscription;
            if already_available {
                return Ok(());
            }
            match timeout {
                Some(duration) if !duration.is_zero() => {
                    match tokio::time::timeout(duration, rx.recv()).await {
                        Ok(Some(())) => Ok(()),
                        Ok(None) => Err(Error::ChannelClosed),
                        Err(_) => Err(Error::timeout(duration)),
                    }
                }
                _ => rx.recv().await.ok_or(Error::ChannelClosed),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Discovery updates
    // ─────────────────────────────────────────────────────────────

    /// Ingest a discovery snapshot update: replace the raw state, announce
    /// the new port list, reconcile, then try to reconnect a broken
    /// selection.
    pub async fn on_attached_boards_changed(
        &mut self,
        event: AttachedBoardsChangeEvent,
    ) -> Result<()> {
        debug!("Attached boards changed: {}", event.summary());
        self.attached_boards = event.new_state.boards;
        self.available_ports = event.new_state.ports;
        self.ports_changed.fire(&self.available_ports);
        self.reconcile().await?;
        self.attempt_reconnect().await
    }

    /// Rebuild the available-boards projection from the raw state.
    ///
    /// The list is always rebuilt from scratch, never patched; the previous
    /// list is only consulted at the end to decide whether anything
    /// observable changed.
    async fn reconcile(&mut self) -> Result<()> {
        // A selected port that disappeared degrades the selection rather
        // than erroring: keep the board, drop the port. Mutating here
        // instead of going through set_boards_config keeps reconciliation
        // from recursing into itself.
        if let Some(selected_port) = self.boards_config.selected_port.clone() {
            let still_open = self
                .available_ports
                .iter()
                .any(|port| port.same_as(&selected_port));
            if !still_open {
                debug!("Selected port {} disappeared, clearing it", selected_port);
                self.boards_config.selected_port = None;
                self.config_changed.fire(&self.boards_config);
            }
        }

        // Serial ports are always shown, identified or not; any other
        // protocol is shown only while an attached board sits on its
        // address. One entry per address.
        let mut candidates: Vec<Port> = Vec::new();
        for port in &self.available_ports {
            let keep = port.is_serial() || self.attached_board_at(&port.address).is_some();
            if keep && !candidates.iter().any(|c| c.address == port.address) {
                candidates.push(port.clone());
            }
        }

        let mut items: Vec<AvailableBoard> = Vec::with_capacity(candidates.len());
        for port in candidates {
            let item = if let Some(attached) = self.attached_board_at(&port.address) {
                let mut board = attached.clone();
                board.port = None;
                let selected = self.boards_config.matches(&board, Some(&port));
                AvailableBoard {
                    board,
                    port: Some(port),
                    state: AvailableBoardState::Recognized,
                    selected,
                }
            } else if let Some(remembered) = self.remembered_board(&port.address).await? {
                let selected = self.boards_config.matches(&remembered, Some(&port));
                AvailableBoard {
                    board: remembered,
                    port: Some(port),
                    state: AvailableBoardState::Guessed,
                    selected,
                }
            } else {
                AvailableBoard {
                    board: Board::named(UNKNOWN_BOARD_NAME),
                    port: Some(port),
                    state: AvailableBoardState::Incomplete,
                    selected: false,
                }
            };
            items.push(item);
        }

        // A selection with no live match still has to show up somewhere:
        // inject a synthetic entry, which wins its port slot outright.
        if let Some(selected_board) = self.boards_config.selected_board.clone() {
            if !items.iter().any(|item| item.selected) {
                let selected_port = self.boards_config.selected_port.clone();
                if let Some(port) = &selected_port {
                    items.retain(|item| item.port_address() != port.address);
                }
                items.push(AvailableBoard {
                    board: selected_board,
                    port: selected_port,
                    state: AvailableBoardState::Incomplete,
                    selected: true,
                });
            }
        }

        items.sort_by(AvailableBoard::compare);

        if Self::projection_changed(&self.available_boards, &items) {
            trace!("Available boards changed: {} entries", items.len());
            self.available_boards = items;
            self.boards_changed.fire(&self.available_boards);
        }
        Ok(())
    }

    fn attached_board_at(&self, address: &str) -> Option<&Board> {
        self.attached_boards
            .iter()
            .find(|board| board.port.as_ref().is_some_and(|p| p.address == address))
    }

    async fn remembered_board(&self, address: &str) -> Result<Option<Board>> {
        let key = last_selected_board_on_port_key(address);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    fn projection_changed(old: &[AvailableBoard], new: &[AvailableBoard]) -> bool {
        old.len() != new.len()
            || old
                .iter()
                .zip(new)
                .any(|(a, b)| !a.same_listing(b))
    }

    /// Re-adopt the last valid configuration when the current selection is
    /// not uploadable.
    ///
    /// Two ordered passes over the non-incomplete available boards: first
    /// the exact board-and-port match, then the relaxed match that accepts
    /// a new address on the same protocol (the re-enumeration-after-upload
    /// case). First hit wins; adoption goes through the regular selection
    /// path.
    async fn attempt_reconnect(&mut self) -> Result<()> {
        if self.boards_config.is_uploadable() {
            return Ok(());
        }
        let Some(valid) = self.latest_valid_boards_config.clone() else {
            return Ok(());
        };
        let (Some(valid_board), Some(valid_port)) =
            (valid.selected_board.clone(), valid.selected_port.clone())
        else {
            return Ok(());
        };

        let mut adopted: Option<BoardsConfig> = None;
        for item in self.usable_boards() {
            if item.board.same_as(&valid_board)
                && item.port.as_ref().is_some_and(|p| p.same_as(&valid_port))
            {
                adopted = Some(valid.clone());
                break;
            }
        }
        if adopted.is_none() {
            for item in self.usable_boards() {
                if item.board.same_as(&valid_board)
                    && item
                        .port
                        .as_ref()
                        .is_some_and(|p| p.protocol == valid_port.protocol)
                {
                    adopted = Some(BoardsConfig {
                        selected_board: Some(valid_board.clone()),
                        selected_port: item.port.clone(),
                    });
                    break;
                }
            }
        }

        if let Some(config) = adopted {
            info!(
                "Reconnecting board '{}' on {}",
                valid_board.name,
                config
                    .selected_port
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            );
            return self.set_boards_config(config).await;
        }
        Ok(())
    }

    fn usable_boards(&self) -> impl Iterator<Item = &AvailableBoard> {
        self.available_boards
            .iter()
            .filter(|item| item.state != AvailableBoardState::Incomplete)
    }

    // ─────────────────────────────────────────────────────────────
    // Package lifecycle
    // ─────────────────────────────────────────────────────────────

    /// React to a hardware-support package finishing installation.
    pub async fn on_package_installed(&mut self, event: &PackageInstalledEvent) -> Result<()> {
        info!(
            "Package '{}' {} installed with {} boards",
            event.package_id,
            event.installed_version_label,
            event.boards.len()
        );
        let Some(selected) = self.boards_config.selected_board.clone() else {
            return Ok(());
        };

        if let Some(installed) = event.boards.iter().find(|b| b.name == selected.name) {
            let fqbn_compatible = selected.fqbn.is_none() || selected.fqbn == installed.fqbn;
            if fqbn_compatible {
                // the package fills in the FQBN the selection was missing
                let mut board = selected;
                board.fqbn = installed.fqbn.clone();
                board.package_id = Some(event.package_id.clone());
                let selected_port = self.boards_config.selected_port.clone();
                return self
                    .set_boards_config(BoardsConfig {
                        selected_board: Some(board),
                        selected_port,
                    })
                    .await;
            }
        } else if selected.package_id.as_deref() == Some(event.package_id.as_str()) {
            // the selection came from this package, and its board name is
            // gone upstream: drop the selection and offer to pick anew
            self.set_boards_config(BoardsConfig::default()).await?;
            let message = format!(
                "Board '{}' is no longer provided by package '{}'. Do you want to select another board?",
                selected.name, event.package_id
            );
            let choice = self
                .notifier
                .warn(&message, &[RESELECT_YES, RESELECT_NO])
                .await?;
            if choice.as_deref() == Some(RESELECT_YES) {
                self.reselect_requested.fire(&selected.name);
            }
            return Ok(());
        }

        // revalidate in place: a second required package may have just
        // completed the toolchain for the current selection
        let current = self.boards_config.clone();
        self.set_boards_config(current).await
    }

    /// React to a hardware-support package being removed.
    pub async fn on_package_uninstalled(&mut self, event: &PackageUninstalledEvent) -> Result<()> {
        info!(
            "Package '{}' uninstalled ({} boards withdrawn)",
            event.package_id,
            event.boards.len()
        );
        let Some(selected) = self.boards_config.selected_board.clone() else {
            return Ok(());
        };
        let Some(fqbn) = selected.fqbn.clone() else {
            return Ok(());
        };

        let provided = event
            .boards
            .iter()
            .any(|board| board.fqbn.as_deref() == Some(fqbn.as_str()));
        if !provided {
            return Ok(());
        }

        // a live, recognized, selected device keeps its identity even when
        // the package goes away
        let live = self.available_boards.iter().any(|item| {
            item.selected
                && item.state == AvailableBoardState::Recognized
                && item.board.same_as(&selected)
        });
        if live {
            debug!(
                "Selected board '{}' is attached and recognized, keeping FQBN",
                selected.name
            );
            return Ok(());
        }

        let mut board = selected;
        board.fqbn = None;
        let selected_port = self.boards_config.selected_port.clone();
        self.set_boards_config(BoardsConfig {
            selected_board: Some(board),
            selected_port,
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────

    async fn load_config(&self, key: &str) -> Result<Option<BoardsConfig>> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }
}

/// Parse a boards configuration from a launch URL's query parameters.
///
/// Recognized parameters: `board` (name), `fqbn`, `port` (address), and
/// `protocol` (defaults to `serial` when `port` is present without it).
/// Returns `None` when the URL does not encode a configuration at all.
pub fn config_from_launch_url(raw: &str) -> Option<BoardsConfig> {
    let url = Url::parse(raw).ok()?;

    let mut name = None;
    let mut fqbn = None;
    let mut address = None;
    let mut protocol = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "board" => name = Some(value.into_owned()),
            "fqbn" => fqbn = Some(value.into_owned()),
            "port" => address = Some(value.into_owned()),
            "protocol" => protocol = Some(value.into_owned()),
            _ => {}
        }
    }

    let selected_board = match (name, fqbn) {
        (Some(name), fqbn) => Some(Board {
            name,
            fqbn,
            package_id: None,
            port: None,
        }),
        // an FQBN without a name still identifies the board
        (None, Some(fqbn)) => Some(Board {
            name: fqbn.clone(),
            fqbn: Some(fqbn),
            package_id: None,
            port: None,
        }),
        (None, None) => None,
    };
    let selected_port = address.map(|address| Port {
        address,
        protocol: protocol.unwrap_or_else(|| SERIAL_PROTOCOL.to_string()),
    });

    if selected_board.is_none() && selected_port.is_none() {
        return None;
    }
    Some(BoardsConfig {
        selected_board,
        selected_port,
    })
}
