use thiserror::Error;

/// Errors raised by the game engine when starting or ending games.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The room code does not reference a live room.
    #[error("Room does not exist.")]
    RoomNotFound,
    /// The requested game type is not in the game module registry.
    #[error("Unknown game type: {0}")]
    UnknownGameType(String),
}

/// Caller errors surfaced to the offending connection as a private
/// `room:error` event. Wrong-phase and raced events are silent no-ops and
/// never reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Empty or missing room code after normalization.
    #[error("Invalid room code.")]
    InvalidRoomCode,
    /// The room code does not reference a live room.
    #[error("Room not found.")]
    RoomNotFound,
    /// The room manager rejected the join.
    #[error("Unable to join room.")]
    JoinFailed,
    /// The connection is not seated in any room.
    #[error("You are not in a room.")]
    NotInRoom,
    /// A start request arrived without a room code or seated host.
    #[error("No room associated with this host.")]
    NoRoomForHost,
    /// A non-host connection attempted a privileged action.
    #[error("Only the host can start the game.")]
    NotHost,
    /// Engine-level failure while starting a game.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
