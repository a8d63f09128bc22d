// autelis-api: Async Rust client for Autelis pool controllers (HTTP + TCP push)

pub mod client;
pub mod error;
pub mod listener;
pub mod status;
pub mod transport;
pub mod vocab;

pub use client::{CommandLabel, HttpClient};
pub use error::Error;
pub use listener::{
    ListenerConfig, ListenerHandle, PushListener, PushMessage, StatusUpdateEvent, UpdateHandler,
};
pub use status::StatusSnapshot;
pub use transport::{ControllerEndpoint, Credentials};
pub use vocab::{command_to_element, value_to_text};
