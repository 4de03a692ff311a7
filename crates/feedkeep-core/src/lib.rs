pub mod config;
pub mod error;
pub mod feed;
pub mod storage;
pub mod sync;

pub use config::{AccessPathConfig, AppConfig};
pub use error::{Error, Result};
pub use storage::Store;
