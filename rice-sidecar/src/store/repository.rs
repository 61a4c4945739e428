use anyhow::anyhow;
use chrono::Utc;
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::models::{BrowserKind, BrowserSettings, RecordedStep, SaveRecording, TestStep, TestStepGroup};

/// SQLite persistence for step groups, their steps and browser settings
pub struct StepRepository {
    conn: Arc<Mutex<Connection>>,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl StepRepository {
    /// Open (or create) the database file and initialize the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Could not create data directory {:?}: {}", parent, e))?;
        }
        let conn = Connection::open(path)?;
        tracing::info!("Opened step database at {:?}", path);
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::Internal(anyhow!("Lock error: {}", e)))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS test_step_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                group_name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, group_name)
            );

            CREATE TABLE IF NOT EXISTS test_steps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                rice_profile_id INTEGER,
                group_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                step_type TEXT NOT NULL,
                target TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                step_order INTEGER NOT NULL,
                value TEXT NOT NULL DEFAULT '',
                alternatives TEXT NOT NULL DEFAULT '[]',
                wait_condition TEXT NOT NULL DEFAULT 'none',
                created_at TEXT NOT NULL,
                FOREIGN KEY (group_id) REFERENCES test_step_groups(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_test_steps_group ON test_steps(group_id, step_order);

            CREATE TABLE IF NOT EXISTS browser_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                browser TEXT NOT NULL,
                incognito INTEGER NOT NULL,
                headless INTEGER NOT NULL,
                window_x INTEGER NOT NULL,
                window_y INTEGER NOT NULL,
                window_width INTEGER NOT NULL,
                window_height INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Insert a group and one row per step, all or nothing.
    ///
    /// A blank group name is rejected before anything is written. A name the
    /// user already has yields `DuplicateGroup` and leaves the store unchanged.
    pub fn save_recording(&self, request: &SaveRecording, steps: &[RecordedStep]) -> Result<TestStepGroup> {
        let group_name = request.group_name.trim();
        if group_name.is_empty() {
            return Err(AppError::ValidationError("Group name is required".to_string()));
        }
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created_at = Utc::now().to_rfc3339();

        if let Err(e) = tx.execute(
            "INSERT INTO test_step_groups (user_id, group_name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![request.user_id, group_name, description, created_at],
        ) {
            return Err(if is_constraint_violation(&e) {
                AppError::DuplicateGroup(group_name.to_string())
            } else {
                e.into()
            });
        }
        let group_id = tx.last_insert_rowid();

        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO test_steps (user_id, rice_profile_id, group_id, name, step_type, target,
                                        description, step_order, value, alternatives, wait_condition, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;

            for (index, step) in steps.iter().enumerate() {
                let order = index + 1;
                let alternatives = serde_json::to_string(&step.alternatives)
                    .map_err(|e| anyhow!("Failed to encode alternatives: {}", e))?;
                insert.execute(params![
                    request.user_id,
                    request.rice_profile_id,
                    group_id,
                    step.display_name(order),
                    step.action,
                    step.target,
                    step.describe(),
                    order as i64,
                    step.value,
                    alternatives,
                    step.wait_condition,
                    created_at,
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            "Saved group '{}' ({}) with {} steps for user {}",
            group_name,
            group_id,
            steps.len(),
            request.user_id
        );

        Ok(TestStepGroup {
            id: group_id,
            user_id: request.user_id,
            group_name: group_name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    pub fn list_groups(&self, user_id: i64) -> Result<Vec<TestStepGroup>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, group_name, description, created_at FROM test_step_groups
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let groups = stmt
            .query_map([user_id], |row| {
                Ok(TestStepGroup {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    group_name: row.get(2)?,
                    description: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// Steps of a group in `step_order`. Unknown groups are `GroupNotFound`.
    pub fn steps_for_group(&self, group_id: i64) -> Result<Vec<TestStep>> {
        let conn = self.conn()?;

        let exists = conn
            .query_row("SELECT 1 FROM test_step_groups WHERE id = ?1", [group_id], |_| Ok(()))
            .optional()?;
        if exists.is_none() {
            return Err(AppError::GroupNotFound(group_id));
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, rice_profile_id, group_id, name, step_type, target, description,
                   step_order, value, alternatives, wait_condition, created_at
            FROM test_steps WHERE group_id = ?1 ORDER BY step_order
            "#,
        )?;

        let steps = stmt
            .query_map([group_id], |row| {
                let alternatives: String = row.get(10)?;
                Ok(TestStep {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    rice_profile_id: row.get(2)?,
                    group_id: row.get(3)?,
                    name: row.get(4)?,
                    step_type: row.get(5)?,
                    target: row.get(6)?,
                    description: row.get(7)?,
                    step_order: row.get(8)?,
                    value: row.get(9)?,
                    alternatives: serde_json::from_str(&alternatives).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e))
                    })?,
                    wait_condition: row.get(11)?,
                    created_at: row.get(12)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(steps)
    }

    /// Delete a group and its steps
    pub fn delete_group(&self, group_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM test_step_groups WHERE id = ?1", [group_id])?;
        if deleted == 0 {
            return Err(AppError::GroupNotFound(group_id));
        }
        Ok(())
    }

    /// Stored browser settings, or `defaults` when none were saved yet
    pub fn browser_settings(&self, defaults: &BrowserSettings) -> Result<BrowserSettings> {
        let conn = self.conn()?;
        let stored = conn
            .query_row(
                "SELECT browser, incognito, headless, window_x, window_y, window_width, window_height
                 FROM browser_settings WHERE id = 1",
                [],
                |row| {
                    let browser: String = row.get(0)?;
                    Ok(BrowserSettings {
                        browser: browser.parse::<BrowserKind>().unwrap_or(defaults.browser),
                        incognito: row.get(1)?,
                        headless: row.get(2)?,
                        window_x: row.get(3)?,
                        window_y: row.get(4)?,
                        window_width: row.get(5)?,
                        window_height: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(stored.unwrap_or_else(|| defaults.clone()))
    }

    pub fn save_browser_settings(&self, settings: &BrowserSettings) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO browser_settings (id, browser, incognito, headless, window_x, window_y, window_width, window_height)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                browser = excluded.browser,
                incognito = excluded.incognito,
                headless = excluded.headless,
                window_x = excluded.window_x,
                window_y = excluded.window_y,
                window_width = excluded.window_width,
                window_height = excluded.window_height
            "#,
            params![
                settings.browser.as_str(),
                settings.incognito,
                settings.headless,
                settings.window_x,
                settings.window_y,
                settings.window_width,
                settings.window_height,
            ],
        )?;
        tracing::info!("Browser settings updated ({})", settings.browser.as_str());
        Ok(())
    }

    fn count(&self, table: &str) -> Result<i64> {
        let conn = self.conn()?;
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn group_count(&self) -> Result<i64> {
        self.count("test_step_groups")
    }

    pub fn step_count(&self) -> Result<i64> {
        self.count("test_steps")
    }
}

impl Clone for StepRepository {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
