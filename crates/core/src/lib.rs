pub mod command;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fallback;
pub mod generator;
pub mod memory;
pub mod pending;
pub mod scene;
pub mod timeline;
pub mod viseme;
pub mod wire;

pub use command::{AnimationCommand, CommandBatch, CommandKind, Provenance, Viseme};
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{SceneError, WireError};
pub use event::Event;
pub use generator::CommandGenerator;
pub use memory::{MemoryEntity, MemoryScene};
pub use scene::Scene;
pub use wire::AnimMessage;
