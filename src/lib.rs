pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod pipeline;


pub use error::*;
pub use models::*;
