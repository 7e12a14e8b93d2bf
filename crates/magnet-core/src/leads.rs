//! Lead Simulator: fabricates leads and DM-style conversations for newly
//! generated content ideas.
//!
//! Each lead gets a weighted-random engagement state at birth and a scripted
//! conversation whose turn set is fully determined by that state. Turns carry
//! jittered timestamps into the recent past; chronological order is
//! established by the ordered read-back, not by write order.

use rand::Rng;

use crate::storage::{ConversationRow, LeadRow, Storage};

/// Hard cap on leads fabricated per batch, independent of how many content
/// idea ids are supplied.
pub const MAX_LEADS_PER_BATCH: usize = 10;

pub const FIRST_NAMES: [&str; 10] = [
    "Sarah", "Mike", "Emma", "David", "Lisa", "James", "Anna", "Robert", "Jennifer", "Michael",
];
pub const LAST_NAMES: [&str; 10] = [
    "Johnson", "Smith", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez",
];

const INITIAL_MESSAGES: [&str; 4] = [
    "Hey! Loved your post, really resonated with me.",
    "This is exactly what I needed to see today. Thanks for sharing!",
    "Can you tell me more about your offer?",
    "I've been struggling with this for a while. How do I get started?",
];

const AI_RESPONSES: [&str; 4] = [
    "Hey {name}! Thanks for reaching out! So glad it resonated with you. What's your current situation?",
    "You're welcome! I'd love to help you. Tell me a bit about your goals.",
    "Absolutely! I have a program that helps with exactly that. Would you be open to a quick chat?",
    "I feel you! Most people struggle there. The good news is there's a proven path. Interested in learning more?",
];

const ENGAGED_MESSAGES: [&str; 3] = [
    "Yes, that would be great! I've been trying to figure this out for months.",
    "I'd love to learn more about your program. How does it work?",
    "That sounds exactly like what I need! What's the next step?",
];

const QUALIFIED_MESSAGES: [&str; 3] = [
    "Perfect! Let's book a call. I'm excited to work with you!",
    "This is exactly what I've been looking for. How do we get started?",
    "I'm ready to move forward. What do you need from me?",
];

const CALL_OFFER_MESSAGE: &str = "That's great to hear! Based on what you've shared, I think you'd be a perfect fit for my program. Would you like to hop on a call?";

const SCHEDULING_MESSAGE: &str = "Awesome! Here's my calendar link: [calendly-link]. Pick a time that works for you. Looking forward to connecting!";

const RESOURCE_MESSAGE: &str = "Fantastic! I'll send you some resources to your DM. Feel free to reach out anytime if you have questions!";

const HOUR_MS: i64 = 3_600_000;
const HALF_HOUR_MS: i64 = 1_800_000;
const HALF_DAY_MS: i64 = 43_200_000;
const DAY_MS: i64 = 86_400_000;

/// Engagement state, assigned once at creation. There are no transitions;
/// the label is chosen at birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadState {
    New,
    Engaged,
    Qualified,
}

impl LeadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Engaged => "ENGAGED",
            Self::Qualified => "QUALIFIED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "ENGAGED" => Some(Self::Engaged),
            "QUALIFIED" => Some(Self::Qualified),
            _ => None,
        }
    }
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Lead,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lead" => Some(Self::Lead),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// The user's conversion objective. Only the final turn of a qualified script
/// branches on it; any unrecognized value degrades to `Leads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryGoal {
    Leads,
    Calls,
}

impl PrimaryGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Calls => "calls",
        }
    }

    /// Lenient parse: `"calls"` selects the scheduling branch, anything else
    /// the resource-handoff branch.
    pub fn parse(s: &str) -> Self {
        match s {
            "calls" => Self::Calls,
            _ => Self::Leads,
        }
    }
}

/// A conversation turn before it is persisted. The stored, id-bearing rows
/// come back from the ordered read after the batch insert.
#[derive(Debug, Clone)]
pub struct TurnDraft {
    pub sender: Sender,
    pub message: String,
    pub timestamp_ms: i64,
}

/// A persisted lead together with its timestamp-ordered conversation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimulatedLead {
    #[serde(flatten)]
    pub lead: LeadRow,
    pub conversations: Vec<ConversationRow>,
}

// Cumulative order matters: the walk returns the first state whose cumulative
// weight reaches the draw, and NEW is the fallback if rounding leaves the
// draw unmatched.
const STATE_WEIGHTS: [(LeadState, f64); 3] = [
    (LeadState::New, 0.4),
    (LeadState::Engaged, 0.4),
    (LeadState::Qualified, 0.2),
];

/// Weighted draw over the engagement states (40% new, 40% engaged, 20% qualified).
pub fn draw_lead_state(rng: &mut impl Rng) -> LeadState {
    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (state, weight) in STATE_WEIGHTS {
        cumulative += weight;
        if draw <= cumulative {
            return state;
        }
    }
    LeadState::New
}

/// Synthesize a display name from the fixed pools. Collisions are expected.
pub fn synthesize_name(rng: &mut impl Rng) -> String {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    format!("{} {}", first, last)
}

/// Assemble the scripted turns for one lead. The turn set is determined by
/// `state`; `primary_goal` only selects the final qualified message.
///
/// Timestamps are jittered into the recent past relative to `now_ms`; the
/// second turn's fixed one-hour shift can land it before the first turn, so
/// callers must rely on the read-time sort for chronology. The final turn of
/// a qualified script is stamped exactly `now_ms`.
pub fn assemble_script(
    rng: &mut impl Rng,
    state: LeadState,
    name: &str,
    primary_goal: PrimaryGoal,
    now_ms: i64,
) -> Vec<TurnDraft> {
    let mut turns = Vec::new();

    // Lead DMs first.
    turns.push(TurnDraft {
        sender: Sender::Lead,
        message: INITIAL_MESSAGES[rng.gen_range(0..INITIAL_MESSAGES.len())].to_string(),
        timestamp_ms: now_ms - rng.gen_range(0..DAY_MS),
    });

    turns.push(TurnDraft {
        sender: Sender::Ai,
        message: AI_RESPONSES[rng.gen_range(0..AI_RESPONSES.len())].replace("{name}", name),
        timestamp_ms: now_ms - rng.gen_range(0..DAY_MS) + HOUR_MS,
    });

    if matches!(state, LeadState::Engaged | LeadState::Qualified) {
        turns.push(TurnDraft {
            sender: Sender::Lead,
            message: ENGAGED_MESSAGES[rng.gen_range(0..ENGAGED_MESSAGES.len())].to_string(),
            timestamp_ms: now_ms - rng.gen_range(0..HALF_DAY_MS),
        });

        turns.push(TurnDraft {
            sender: Sender::Ai,
            message: CALL_OFFER_MESSAGE.to_string(),
            timestamp_ms: now_ms - rng.gen_range(0..HOUR_MS),
        });
    }

    if state == LeadState::Qualified {
        turns.push(TurnDraft {
            sender: Sender::Lead,
            message: QUALIFIED_MESSAGES[rng.gen_range(0..QUALIFIED_MESSAGES.len())].to_string(),
            timestamp_ms: now_ms - rng.gen_range(0..HALF_HOUR_MS),
        });

        let closing = match primary_goal {
            PrimaryGoal::Calls => SCHEDULING_MESSAGE,
            PrimaryGoal::Leads => RESOURCE_MESSAGE,
        };
        turns.push(TurnDraft {
            sender: Sender::Ai,
            message: closing.to_string(),
            timestamp_ms: now_ms,
        });
    }

    turns
}

/// Fabricate up to [`MAX_LEADS_PER_BATCH`] leads for the first ids in
/// `content_idea_ids`, in supplied order, each with its persisted
/// conversation read back in timestamp order.
///
/// Leads are processed strictly sequentially. Any persistence failure aborts
/// the batch and propagates unmodified; rows already committed stay in the
/// store (no compensating rollback).
pub fn generate_leads(
    store: &Storage,
    rng: &mut impl Rng,
    user_id: &str,
    content_idea_ids: &[String],
    primary_goal: PrimaryGoal,
) -> Result<Vec<SimulatedLead>, rusqlite::Error> {
    let n = content_idea_ids.len().min(MAX_LEADS_PER_BATCH);
    let mut leads = Vec::with_capacity(n);

    for content_idea_id in &content_idea_ids[..n] {
        let state = draw_lead_state(rng);
        let name = synthesize_name(rng);

        let lead = store.create_lead(user_id, content_idea_id, &name, state)?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let script = assemble_script(rng, state, &name, primary_goal, now_ms);
        store.insert_conversations(&lead.id, &script)?;
        let conversations = store.list_conversations(&lead.id)?;

        leads.push(SimulatedLead {
            lead,
            conversations,
        });
    }

    Ok(leads)
}

/// Expected turn count for a state: NEW 2, ENGAGED 4, QUALIFIED 6.
pub fn expected_turn_count(state: LeadState) -> usize {
    match state {
        LeadState::New => 2,
        LeadState::Engaged => 4,
        LeadState::Qualified => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn state_distribution_roughly_matches_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut qualified = 0usize;
        let total = 100_000usize;
        for _ in 0..total {
            if draw_lead_state(&mut rng) == LeadState::Qualified {
                qualified += 1;
            }
        }
        let freq = qualified as f64 / total as f64;
        assert!(
            (freq - 0.20).abs() < 0.01,
            "qualified frequency {} outside tolerance",
            freq
        );
    }

    #[test]
    fn synthesized_names_come_from_the_pools() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let name = synthesize_name(&mut rng);
            let mut parts = name.split(' ');
            let first = parts.next().unwrap();
            let last = parts.next().unwrap();
            assert!(parts.next().is_none(), "name has more than two tokens: {}", name);
            assert!(FIRST_NAMES.contains(&first), "unknown first name: {}", first);
            assert!(LAST_NAMES.contains(&last), "unknown last name: {}", last);
        }
    }

    #[test]
    fn turn_counts_match_state() {
        let mut rng = StdRng::seed_from_u64(3);
        let now = 1_700_000_000_000;
        for (state, expected) in [
            (LeadState::New, 2),
            (LeadState::Engaged, 4),
            (LeadState::Qualified, 6),
        ] {
            let turns = assemble_script(&mut rng, state, "Sarah Smith", PrimaryGoal::Leads, now);
            assert_eq!(turns.len(), expected, "state {:?}", state);
        }
    }

    #[test]
    fn scripts_alternate_lead_and_ai() {
        let mut rng = StdRng::seed_from_u64(5);
        let now = 1_700_000_000_000;
        let turns = assemble_script(&mut rng, LeadState::Qualified, "Emma Jones", PrimaryGoal::Calls, now);
        let senders: Vec<Sender> = turns.iter().map(|t| t.sender).collect();
        assert_eq!(
            senders,
            vec![Sender::Lead, Sender::Ai, Sender::Lead, Sender::Ai, Sender::Lead, Sender::Ai]
        );
    }

    #[test]
    fn name_placeholder_always_resolves() {
        let mut rng = StdRng::seed_from_u64(13);
        let now = 1_700_000_000_000;
        for _ in 0..200 {
            let turns = assemble_script(&mut rng, LeadState::Qualified, "David Garcia", PrimaryGoal::Leads, now);
            for turn in turns.iter().filter(|t| t.sender == Sender::Ai) {
                assert!(
                    !turn.message.contains("{name}"),
                    "unresolved placeholder in: {}",
                    turn.message
                );
            }
        }
    }

    #[test]
    fn qualified_closing_branches_on_goal() {
        let now = 1_700_000_000_000;
        let mut rng = StdRng::seed_from_u64(17);
        let calls = assemble_script(&mut rng, LeadState::Qualified, "Lisa Brown", PrimaryGoal::Calls, now);
        let mut rng = StdRng::seed_from_u64(17);
        let leads = assemble_script(&mut rng, LeadState::Qualified, "Lisa Brown", PrimaryGoal::Leads, now);
        let calls_closing = &calls.last().unwrap().message;
        let leads_closing = &leads.last().unwrap().message;
        assert_ne!(calls_closing, leads_closing);
        assert!(calls_closing.contains("calendar"));
    }

    #[test]
    fn qualified_closing_stamped_at_now() {
        let mut rng = StdRng::seed_from_u64(19);
        let now = 1_700_000_000_000;
        let turns = assemble_script(&mut rng, LeadState::Qualified, "Anna Davis", PrimaryGoal::Calls, now);
        assert_eq!(turns.last().unwrap().timestamp_ms, now);
        // Every other turn sits in the past, except the AI reply which may
        // carry its one-hour forward shift.
        for turn in &turns[..turns.len() - 1] {
            assert!(turn.timestamp_ms <= now + HOUR_MS);
        }
    }

    #[test]
    fn primary_goal_parse_degrades_to_leads() {
        assert_eq!(PrimaryGoal::parse("calls"), PrimaryGoal::Calls);
        assert_eq!(PrimaryGoal::parse("leads"), PrimaryGoal::Leads);
        assert_eq!(PrimaryGoal::parse("CALLS"), PrimaryGoal::Leads);
        assert_eq!(PrimaryGoal::parse(""), PrimaryGoal::Leads);
        assert_eq!(PrimaryGoal::parse("webinar"), PrimaryGoal::Leads);
    }

    #[test]
    fn lead_state_round_trips_through_str() {
        for state in [LeadState::New, LeadState::Engaged, LeadState::Qualified] {
            assert_eq!(LeadState::parse(state.as_str()), Some(state));
        }
        assert_eq!(LeadState::parse("ARCHIVED"), None);
    }
}
