// src/config/mod.rs
pub mod agent;

pub use agent::{default_query, default_sources_input, AgentConfig};
