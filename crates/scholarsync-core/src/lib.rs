pub mod config;
pub mod error;
pub mod persona;
pub mod types;

pub use config::ScholarConfig;
pub use error::{Result, ScholarError};
pub use persona::{AgentMode, Persona};
pub use types::*;
