//! Animus API Library Crate
//!
//! This library contains the web service around the animation pipeline:
//! configuration, application state, HTTP handlers, the viewer WebSocket
//! fanout, the speech provider relay and routing. The `api` binary is a thin
//! wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod relay;
pub mod router;
pub mod state;
pub mod ws;
