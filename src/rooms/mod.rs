//! Room lifecycle: hubs, registry and teardown

pub mod hub;
pub mod manager;

pub use hub::{Hub, HubHandle};
pub use manager::RoomManager;
