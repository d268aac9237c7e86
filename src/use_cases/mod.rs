// Use cases layer: application workflows for the tactics server.

pub mod game;
pub mod rooms;
pub mod session;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;

pub use rooms::{RoomError, RoomHandle, RoomRegistry, RoomSettings};
pub use session::{Diagnostic, DiagnosticKind, SessionEngine, SessionLimits};
pub use types::{JoinMode, JoinRequest, RoomEvent};
