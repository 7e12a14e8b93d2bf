//! Integration test: SQLite storage round-trips.
//!
//! ## Scenarios
//! 1. ensure_user is idempotent; profile save marks the user onboarded.
//! 2. Profile save creates the user row when it does not exist yet.
//! 3. Idea listing comes back newest first.
//! 4. Conversation order is established by timestamp, not insertion order.
//! 5. Dashboard counts reflect ideas, conversations, and qualified leads.

use magnet_core::{LeadState, Sender, Storage, TurnDraft};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Storage {
    Storage::new(dir.path().join("magnet.sqlite")).expect("open storage")
}

#[test]
fn ensure_user_then_profile_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let user = store.ensure_user("u1", Some("a@example.com")).unwrap();
    assert!(!user.is_onboarded());
    assert!(user.onboarded_at_ms.is_none());

    let again = store.ensure_user("u1", None).unwrap();
    assert_eq!(again.id, user.id);
    assert_eq!(again.email.as_deref(), Some("a@example.com"));

    let onboarded = store
        .save_profile("u1", None, "Fitness", "Busy Professionals", "12-week program", "calls")
        .unwrap();
    assert!(onboarded.is_onboarded());
    assert!(onboarded.onboarded_at_ms.is_some());
    assert_eq!(onboarded.primary_goal.as_deref(), Some("calls"));
    assert_eq!(onboarded.email.as_deref(), Some("a@example.com"));
}

#[test]
fn profile_save_creates_missing_user() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let user = store
        .save_profile("fresh", Some("f@example.com"), "Mindset", "Founders", "Group coaching", "leads")
        .unwrap();
    assert_eq!(user.id, "fresh");
    assert!(user.is_onboarded());
}

#[test]
fn idea_listing_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.ensure_user("u1", None).unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let idea = store
            .create_content_idea("u1", &format!("Hook {}", i), "Teaching", "CTA")
            .unwrap();
        ids.push(idea.id);
    }

    let listed = store.list_content_ideas("u1").unwrap();
    assert_eq!(listed.len(), 3);
    for pair in listed.windows(2) {
        assert!(pair[0].created_at_ms >= pair[1].created_at_ms);
    }
    for idea in &listed {
        assert!(ids.contains(&idea.id));
    }
}

#[test]
fn conversation_order_is_by_timestamp_not_insertion() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.ensure_user("u1", None).unwrap();
    let idea = store.create_content_idea("u1", "Hook", "Teaching", "CTA").unwrap();
    let lead = store
        .create_lead("u1", &idea.id, "Sarah Smith", LeadState::New)
        .unwrap();

    let now = 1_700_000_000_000i64;
    // Written newest first on purpose.
    let turns = vec![
        TurnDraft {
            sender: Sender::Ai,
            message: "third".to_string(),
            timestamp_ms: now,
        },
        TurnDraft {
            sender: Sender::Lead,
            message: "first".to_string(),
            timestamp_ms: now - 100,
        },
        TurnDraft {
            sender: Sender::Ai,
            message: "second".to_string(),
            timestamp_ms: now - 50,
        },
    ];
    store.insert_conversations(&lead.id, &turns).unwrap();

    let listed = store.list_conversations(&lead.id).unwrap();
    let messages: Vec<&str> = listed.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[test]
fn dashboard_counts_reflect_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.ensure_user("u1", None).unwrap();
    store.ensure_user("u2", None).unwrap();

    let idea_a = store.create_content_idea("u1", "A", "T", "C").unwrap();
    let idea_b = store.create_content_idea("u1", "B", "T", "C").unwrap();
    store.create_content_idea("u2", "other", "T", "C").unwrap();

    let qualified = store
        .create_lead("u1", &idea_a.id, "Emma Jones", LeadState::Qualified)
        .unwrap();
    store
        .create_lead("u1", &idea_b.id, "Mike Brown", LeadState::New)
        .unwrap();

    let turns = vec![
        TurnDraft {
            sender: Sender::Lead,
            message: "hi".to_string(),
            timestamp_ms: 1,
        },
        TurnDraft {
            sender: Sender::Ai,
            message: "hello".to_string(),
            timestamp_ms: 2,
        },
    ];
    store.insert_conversations(&qualified.id, &turns).unwrap();

    let counts = store.dashboard_counts("u1").unwrap();
    assert_eq!(counts.total_ideas, 2);
    assert_eq!(counts.total_conversations, 2);
    assert_eq!(counts.total_qualified, 1);

    let other = store.dashboard_counts("u2").unwrap();
    assert_eq!(other.total_ideas, 1);
    assert_eq!(other.total_conversations, 0);
    assert_eq!(other.total_qualified, 0);
}
