// src/dashboard/mod.rs
pub mod render;
pub mod session;
pub mod summary;

pub use render::{Flash, PageContext, View};
pub use session::{parse_sources, AgentFactory, DashboardSession, RunOutcome};
pub use summary::{ConfigSummary, OverviewSummary};
