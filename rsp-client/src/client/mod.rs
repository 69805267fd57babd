//! Client construction and session ownership

pub mod builder;
pub mod guard;
pub mod rsp_client;

pub use builder::ClientBuilder;
pub use guard::CardGuard;
pub use rsp_client::RspClient;
