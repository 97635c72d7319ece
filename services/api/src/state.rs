//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the fanout handle,
//! the command generator and the optional speech relay.

use crate::{config::Config, relay::RealtimeRelay, ws::Fanout};
use animus_core::CommandGenerator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub fanout: Fanout,
    pub generator: Arc<CommandGenerator>,
    /// `None` when no provider API key is configured.
    pub relay: Option<Arc<dyn RealtimeRelay>>,
    pub config: Arc<Config>,
}
