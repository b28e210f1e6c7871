//! The room-broadcast engine: per-room hub actors and their registry.

mod client;
pub use client::ClientHandle;

mod hub;

mod registry;
pub use registry::{HubHandle, RoomRegistry};
