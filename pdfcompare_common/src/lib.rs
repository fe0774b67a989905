pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::*;
pub use config::*;
pub use error::*;
pub use types::*;
