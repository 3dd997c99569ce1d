use crate::session::SessionSnapshot;
use tokio::sync::oneshot;

/// Commands from the room view into the session event loop.
#[derive(Debug)]
pub enum SessionCommand {
    /// Send a chat line to the room.
    SendChat(String),
    /// Place a 1:1 call to the room's other participant.
    StartCall,
    /// Hang up. Idempotent; a no-op while idle.
    EndCall,
    ToggleMute,
    ToggleVideo,
    /// Report the current message log and call state.
    Snapshot(oneshot::Sender<SessionSnapshot>),
    /// Leave the room view: tears down any call and stops the loop.
    Shutdown,
}
