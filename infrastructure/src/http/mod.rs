//! HTTP adapters for the chat backend

pub mod error;
pub mod sessions;
pub mod transport;

pub use error::HttpSetupError;
pub use sessions::HttpSessionDirectory;
pub use transport::HttpChatTransport;
