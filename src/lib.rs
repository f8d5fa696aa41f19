//! Game Night Back: an ephemeral multiplayer party-game backend. Clients
//! gather in short-code rooms over a single WebSocket endpoint; each room
//! runs at most one game instance, with a buzz-in game show as the reference
//! game. Nothing is persisted; every room dies with its last player.

pub mod config;
pub mod dto;
pub mod error;
pub mod events;
pub mod games;
pub mod routes;
pub mod services;
pub mod state;
