pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::KuberyaConfig;
pub use error::{KuberyaError, Result};
pub use events::SessionEvent;
pub use types::*;
