//! Parlor library
//!
//! Conversation scripts and sprite sequences for point-and-click adventures

pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
pub mod resource;
pub mod scene;
pub mod state;
pub mod talk;
pub mod world;

pub use cli::Cli;
pub use config::Options;
pub use host::Host;
pub use logging::LogLevel;
pub use talk::{Talk, TalkConfig, TalkStatus};
pub use world::World;
