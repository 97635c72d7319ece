//! WebSocket Command Stream
//!
//! - `fanout`: owns the set of connected viewers and delivers batches to them.
//! - `session`: drives one viewer connection on `/anim`.

pub mod fanout;
pub mod session;

pub use fanout::{Fanout, FanoutError, PublishReport, ViewerSubscription};
pub use session::anim_handler;
