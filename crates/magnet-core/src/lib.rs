//! magnet-core: creator profiles, content idea generation, and the lead
//! simulator over SQLite storage.
//!
//! The gateway crate wires these pieces to HTTP routes; everything stateful
//! lives here.

pub mod config;
pub mod ideas;
pub mod leads;
pub mod storage;

pub use config::GatewayConfig;
pub use ideas::{
    fallback_ideas, generate_content_ideas, BridgeError, CreatorProfile, IdeaBridge, IdeaDraft,
};
pub use leads::{
    assemble_script, draw_lead_state, expected_turn_count, generate_leads, synthesize_name,
    LeadState, PrimaryGoal, Sender, SimulatedLead, TurnDraft, FIRST_NAMES, LAST_NAMES,
    MAX_LEADS_PER_BATCH,
};
pub use storage::{
    ContentIdeaRow, ConversationRow, DashboardCounts, LeadRow, Storage, UserRow,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
