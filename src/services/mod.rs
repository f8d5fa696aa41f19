//! Service layer: protocol handling, session operations, health, and docs.

pub mod documentation;
pub mod health_service;
pub mod session_service;
pub mod websocket_service;
