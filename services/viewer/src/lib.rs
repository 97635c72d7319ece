//! Headless avatar viewer.
//!
//! Connects to the `/anim` command stream, feeds every batch through a
//! [`animus_core::Dispatcher`] over an in-memory scene and drives it with a
//! fixed-rate frame clock.

pub mod client;
pub mod manifest;
