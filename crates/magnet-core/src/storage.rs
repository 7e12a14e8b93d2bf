//! SQLite storage: users, content_ideas, leads, conversations.
//!
//! One connection per call with `foreign_keys` ON. Conversation batches for a
//! lead are written in a single transaction; no transaction spans a lead row
//! and its conversation batch.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::leads::{LeadState, Sender, TurnDraft};

/// One row in the `users` table. Profile fields stay NULL until onboarding.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    pub email: Option<String>,
    pub niche: Option<String>,
    pub target_audience: Option<String>,
    pub offer: Option<String>,
    pub primary_goal: Option<String>,
    pub onboarded_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

impl UserRow {
    /// True once every profile field required by content generation is set.
    pub fn is_onboarded(&self) -> bool {
        self.niche.is_some()
            && self.target_audience.is_some()
            && self.offer.is_some()
            && self.primary_goal.is_some()
    }
}

/// One row in the `content_ideas` table.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentIdeaRow {
    pub id: String,
    pub user_id: String,
    pub hook: String,
    pub key_teaching: String,
    pub cta: String,
    pub created_at_ms: i64,
}

/// One row in the `leads` table. `state` is assigned at creation and never
/// mutated afterwards.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRow {
    pub id: String,
    pub user_id: String,
    pub content_idea_id: String,
    pub name: String,
    pub state: LeadState,
    pub created_at_ms: i64,
}

/// One row in the `conversations` table.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRow {
    pub id: String,
    pub lead_id: String,
    pub sender: Sender,
    pub message: String,
    pub timestamp_ms: i64,
    pub created_at_ms: i64,
}

/// Dashboard counters for one user.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_ideas: i64,
    pub total_conversations: i64,
    pub total_qualified: i64,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Storage for profiles, ideas, leads and conversations.
pub struct Storage {
    db_path: PathBuf,
}

impl Storage {
    /// Open or create the database and ensure all tables exist.
    pub fn new(db_path: PathBuf) -> Result<Self, rusqlite::Error> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    /// Default path: MAGNET_DB_PATH or ./data, then magnet/magnet.sqlite.
    pub fn default_path() -> PathBuf {
        let base = std::env::var("MAGNET_DB_PATH").unwrap_or_else(|_| "./data".to_string());
        PathBuf::from(base).join("magnet").join("magnet.sqlite")
    }

    /// Open storage at the default path.
    pub fn open_default() -> Result<Self, rusqlite::Error> {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    fn init(&self) -> Result<(), rusqlite::Error> {
        if let Some(parent) = self.db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = self.open()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NULL,
                niche TEXT NULL,
                target_audience TEXT NULL,
                offer TEXT NULL,
                primary_goal TEXT NULL,
                onboarded_at_ms INTEGER NULL,
                created_at_ms INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS content_ideas (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                hook TEXT NOT NULL,
                key_teaching TEXT NOT NULL,
                cta TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_content_ideas_user_id ON content_ideas(user_id);

            CREATE TABLE IF NOT EXISTS leads (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content_idea_id TEXT NOT NULL,
                name TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY(content_idea_id) REFERENCES content_ideas(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_leads_user_id ON leads(user_id);

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                lead_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                created_at_ms INTEGER NOT NULL,
                FOREIGN KEY(lead_id) REFERENCES leads(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_conversations_lead_id ON conversations(lead_id);
            CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations(timestamp_ms);
            "#,
        )?;
        Ok(())
    }

    /// Ensure a user row exists for this id. Returns the stored row.
    pub fn ensure_user(&self, user_id: &str, email: Option<&str>) -> Result<UserRow, rusqlite::Error> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO users (id, email, created_at_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO NOTHING",
            params![user_id, email, now_ms()],
        )?;
        drop(conn);
        self.get_user(user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: &str) -> Result<Option<UserRow>, rusqlite::Error> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, email, niche, target_audience, offer, primary_goal, onboarded_at_ms, created_at_ms
                 FROM users WHERE id = ?1",
                params![user_id],
                |r| {
                    Ok(UserRow {
                        id: r.get(0)?,
                        email: r.get(1)?,
                        niche: r.get(2)?,
                        target_audience: r.get(3)?,
                        offer: r.get(4)?,
                        primary_goal: r.get(5)?,
                        onboarded_at_ms: r.get(6)?,
                        created_at_ms: r.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Save the onboarding profile and stamp `onboarded_at_ms`. Creates the
    /// user row when it does not exist yet.
    pub fn save_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        niche: &str,
        target_audience: &str,
        offer: &str,
        primary_goal: &str,
    ) -> Result<UserRow, rusqlite::Error> {
        let ts = now_ms();
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO users (id, email, niche, target_audience, offer, primary_goal, onboarded_at_ms, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(id) DO UPDATE SET
                niche = excluded.niche,
                target_audience = excluded.target_audience,
                offer = excluded.offer,
                primary_goal = excluded.primary_goal,
                onboarded_at_ms = excluded.onboarded_at_ms,
                email = COALESCE(excluded.email, users.email)
            "#,
            params![
                user_id,
                email,
                niche.trim(),
                target_audience.trim(),
                offer.trim(),
                primary_goal,
                ts
            ],
        )?;
        drop(conn);
        self.get_user(user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Insert one content idea and return its row.
    pub fn create_content_idea(
        &self,
        user_id: &str,
        hook: &str,
        key_teaching: &str,
        cta: &str,
    ) -> Result<ContentIdeaRow, rusqlite::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = now_ms();
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO content_ideas (id, user_id, hook, key_teaching, cta, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![id, user_id, hook, key_teaching, cta, ts],
        )?;
        Ok(ContentIdeaRow {
            id,
            user_id: user_id.to_string(),
            hook: hook.to_string(),
            key_teaching: key_teaching.to_string(),
            cta: cta.to_string(),
            created_at_ms: ts,
        })
    }

    /// List a user's content ideas, newest first.
    pub fn list_content_ideas(&self, user_id: &str) -> Result<Vec<ContentIdeaRow>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, hook, key_teaching, cta, created_at_ms
             FROM content_ideas WHERE user_id = ?1 ORDER BY created_at_ms DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |r| {
                Ok(ContentIdeaRow {
                    id: r.get(0)?,
                    user_id: r.get(1)?,
                    hook: r.get(2)?,
                    key_teaching: r.get(3)?,
                    cta: r.get(4)?,
                    created_at_ms: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get a content idea by id.
    pub fn get_content_idea(&self, id: &str) -> Result<Option<ContentIdeaRow>, rusqlite::Error> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, user_id, hook, key_teaching, cta, created_at_ms
                 FROM content_ideas WHERE id = ?1",
                params![id],
                |r| {
                    Ok(ContentIdeaRow {
                        id: r.get(0)?,
                        user_id: r.get(1)?,
                        hook: r.get(2)?,
                        key_teaching: r.get(3)?,
                        cta: r.get(4)?,
                        created_at_ms: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert one lead and return its row.
    pub fn create_lead(
        &self,
        user_id: &str,
        content_idea_id: &str,
        name: &str,
        state: LeadState,
    ) -> Result<LeadRow, rusqlite::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = now_ms();
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO leads (id, user_id, content_idea_id, name, state, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![id, user_id, content_idea_id, name, state.as_str(), ts],
        )?;
        Ok(LeadRow {
            id,
            user_id: user_id.to_string(),
            content_idea_id: content_idea_id.to_string(),
            name: name.to_string(),
            state,
            created_at_ms: ts,
        })
    }

    /// List a user's leads, newest first.
    pub fn list_leads(&self, user_id: &str) -> Result<Vec<LeadRow>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, content_idea_id, name, state, created_at_ms
             FROM leads WHERE user_id = ?1 ORDER BY created_at_ms DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |r| {
                let state: String = r.get(4)?;
                Ok(LeadRow {
                    id: r.get(0)?,
                    user_id: r.get(1)?,
                    content_idea_id: r.get(2)?,
                    name: r.get(3)?,
                    state: LeadState::parse(&state).unwrap_or(LeadState::New),
                    created_at_ms: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert one lead's conversation turns as a single batch (one transaction).
    pub fn insert_conversations(
        &self,
        lead_id: &str,
        turns: &[TurnDraft],
    ) -> Result<(), rusqlite::Error> {
        let ts = now_ms();
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO conversations (id, lead_id, sender, message, timestamp_ms, created_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for turn in turns {
                let id = uuid::Uuid::new_v4().to_string();
                stmt.execute(params![
                    id,
                    lead_id,
                    turn.sender.as_str(),
                    turn.message,
                    turn.timestamp_ms,
                    ts
                ])?;
            }
        }
        tx.commit()
    }

    /// List a lead's conversation turns ordered ascending by timestamp.
    /// Write order is not meaningful; order is established here.
    pub fn list_conversations(&self, lead_id: &str) -> Result<Vec<ConversationRow>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, lead_id, sender, message, timestamp_ms, created_at_ms
             FROM conversations WHERE lead_id = ?1 ORDER BY timestamp_ms ASC",
        )?;
        let rows = stmt
            .query_map(params![lead_id], |r| {
                let sender: String = r.get(2)?;
                Ok(ConversationRow {
                    id: r.get(0)?,
                    lead_id: r.get(1)?,
                    sender: Sender::parse(&sender).unwrap_or(Sender::Lead),
                    message: r.get(3)?,
                    timestamp_ms: r.get(4)?,
                    created_at_ms: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Dashboard counters: ideas, conversations across the user's leads, and
    /// qualified leads.
    pub fn dashboard_counts(&self, user_id: &str) -> Result<DashboardCounts, rusqlite::Error> {
        let conn = self.open()?;
        let total_ideas: i64 = conn.query_row(
            "SELECT COUNT(*) FROM content_ideas WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        let total_conversations: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversations c
             JOIN leads l ON c.lead_id = l.id
             WHERE l.user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        let total_qualified: i64 = conn.query_row(
            "SELECT COUNT(*) FROM leads WHERE user_id = ?1 AND state = ?2",
            params![user_id, LeadState::Qualified.as_str()],
            |r| r.get(0),
        )?;
        Ok(DashboardCounts {
            total_ideas,
            total_conversations,
            total_qualified,
        })
    }
}
