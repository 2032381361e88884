//! # portside-engine - Board/Port Reconciliation
//!
//! The control core that reconciles the user's desired board/port selection
//! against the set of actually attached devices, and keeps that
//! reconciliation correct across plug/unplug events, package installs, and
//! process restarts.
//!
//! ## Public API
//!
//! ### Engine (`engine`)
//! - [`BoardsEngine`] - Owns the selection, the attached-device state, and
//!   the derived "available boards" projection; validates, auto-reconnects,
//!   and persists.
//! - [`config_from_launch_url()`] - Startup-restore fallback parsing.
//!
//! ### Service Seams (`services`, `store`)
//! - [`BoardDiscovery`] - Snapshot queries against the discovery feed
//! - [`UserNotifier`] - Narrow warn-with-actions contract to the UI layer
//! - [`ConfigStore`] - Scoped key/value persistence
//! - [`JsonFileStore`] - Single-file JSON adapter with atomic replace
//!
//! ### Notifications (`emitter`)
//! - [`Emitter`] - Per-channel observer registry with synchronous fan-out
//! - [`EventSubscription`] - Disposable subscription handle
//!
//! The `test-helpers` feature exports in-memory collaborator doubles for
//! downstream hosts' test suites.

pub mod emitter;
pub mod engine;
pub mod services;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

// Re-export primary types
pub use emitter::{Emitter, EventSubscription};
pub use engine::{config_from_launch_url, BoardsEngine};
pub use services::{BoardDiscovery, UserNotifier};
pub use store::{ConfigStore, JsonFileStore};
