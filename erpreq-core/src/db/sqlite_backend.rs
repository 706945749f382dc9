//! SQLite database storage backend
//!
//! This backend stores requirements, users and comments in a SQLite database
//! file. Single-statement writes run on their own; anything that reads before
//! it writes runs in an IMMEDIATE transaction, so concurrent writers queue on
//! the busy timeout instead of failing to upgrade a read lock.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    format_spec_id, Comment, Complexity, CustomizationType, PhaseProgress, Requirement,
    RequirementStatus, RequirementsStore, User,
};

use super::traits::{BackendType, DatabaseBackend};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for another connection's write to finish
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const REQUIREMENT_COLUMNS: &str = "id, spec_id, owner_id, created_at, last_updated, project_scope,
     customization_type, modules_involved, functional_requirements, technical_constraints,
     preferred_timeline, complexity, implementation_plan, status, phase_progress, overall_progress";

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at";

const COMMENT_COLUMNS: &str = "id, requirement_id, author_id, content, created_at";

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Creates a new SQLite backend
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {:?}", path))?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL for concurrent readers; foreign keys drive the delete cascades
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };

        backend.init_schema()?;
        Ok(backend)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database connection lock poisoned"))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let mut conn = self.conn()?;
        // Two processes opening a fresh file must not both create the schema
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current_version: i32 = tx
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            log::debug!("Creating schema in {:?}", self.path);
            tx.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        tx.commit()?;
        Ok(())
    }

    /// Serializes complex types to JSON for storage
    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string(value).context("Failed to serialize to JSON")
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_uuid(raw: &str) -> Uuid {
        Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v4())
    }

    fn row_to_requirement(row: &Row) -> rusqlite::Result<Requirement> {
        let id: String = row.get(0)?;
        let owner_id: String = row.get(2)?;
        let created_at: String = row.get(3)?;
        let last_updated: String = row.get(4)?;
        let customization_type: String = row.get(6)?;
        let complexity: String = row.get(11)?;
        let status: String = row.get(13)?;
        let phase_progress: String = row.get(14)?;
        let overall_progress: i64 = row.get(15)?;

        Ok(Requirement {
            id: Self::parse_uuid(&id),
            spec_id: row.get(1)?,
            owner_id: Self::parse_uuid(&owner_id),
            created_at: Self::parse_timestamp(&created_at),
            last_updated: Self::parse_timestamp(&last_updated),
            project_scope: row.get(5)?,
            customization_type: customization_type
                .parse()
                .unwrap_or(CustomizationType::NewModule),
            modules_involved: row.get(7)?,
            functional_requirements: row.get(8)?,
            technical_constraints: row.get(9)?,
            preferred_timeline: row.get(10)?,
            complexity: complexity.parse().unwrap_or(Complexity::Medium),
            implementation_plan: row.get(12)?,
            status: status.parse().unwrap_or(RequirementStatus::Pending),
            phase_progress: serde_json::from_str::<PhaseProgress>(&phase_progress)
                .unwrap_or_default(),
            overall_progress: overall_progress.clamp(0, 100) as u8,
        })
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(5)?;
        Ok(User {
            id: Self::parse_uuid(&id),
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            is_admin: row.get(4)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
        let id: String = row.get(0)?;
        let requirement_id: String = row.get(1)?;
        let author_id: String = row.get(2)?;
        let created_at: String = row.get(4)?;
        Ok(Comment {
            id: Self::parse_uuid(&id),
            requirement_id: Self::parse_uuid(&requirement_id),
            author_id: Self::parse_uuid(&author_id),
            content: row.get(3)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn query_requirements<P: rusqlite::Params>(
        conn: &Connection,
        filter: &str,
        params: P,
    ) -> Result<Vec<Requirement>> {
        let sql = format!(
            "SELECT {} FROM requirements {} ORDER BY seq",
            REQUIREMENT_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_requirement)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    fn query_users<P: rusqlite::Params>(
        conn: &Connection,
        filter: &str,
        params: P,
    ) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users {} ORDER BY created_at",
            USER_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_user)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    fn query_comments<P: rusqlite::Params>(
        conn: &Connection,
        filter: &str,
        params: P,
    ) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments {} ORDER BY seq",
            COMMENT_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_comment)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    fn next_seq(conn: &Connection, table: &str) -> Result<i64> {
        let sql = format!("SELECT COALESCE(MAX(seq), 0) + 1 FROM {}", table);
        conn.query_row(&sql, [], |row| row.get(0))
            .map_err(Into::into)
    }

    fn insert_requirement(conn: &Connection, req: &Requirement, seq: i64) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO requirements ({}, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                REQUIREMENT_COLUMNS
            ),
            params![
                req.id.to_string(),
                req.spec_id,
                req.owner_id.to_string(),
                req.created_at.to_rfc3339(),
                req.last_updated.to_rfc3339(),
                req.project_scope,
                req.customization_type.as_str(),
                req.modules_involved,
                req.functional_requirements,
                req.technical_constraints,
                req.preferred_timeline,
                req.complexity.as_str(),
                req.implementation_plan,
                req.status.as_str(),
                Self::to_json(&req.phase_progress)?,
                req.overall_progress,
                seq,
            ],
        )?;
        Ok(())
    }

    fn insert_user(conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                USER_COLUMNS
            ),
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.is_admin,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_comment(conn: &Connection, comment: &Comment, seq: i64) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO comments ({}, seq) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                COMMENT_COLUMNS
            ),
            params![
                comment.id.to_string(),
                comment.requirement_id.to_string(),
                comment.author_id.to_string(),
                comment.content,
                comment.created_at.to_rfc3339(),
                seq,
            ],
        )?;
        Ok(())
    }

    fn load_next_number(conn: &Connection) -> Result<u32> {
        let next: Option<i64> = conn
            .query_row(
                "SELECT next_requirement_number FROM metadata WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(next.map(|n| n.max(1) as u32).unwrap_or(1))
    }
}

impl DatabaseBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RequirementsStore> {
        let conn = self.conn()?;

        Ok(RequirementsStore {
            requirements: Self::query_requirements(&conn, "", [])?,
            users: Self::query_users(&conn, "", [])?,
            comments: Self::query_comments(&conn, "", [])?,
            next_requirement_number: Self::load_next_number(&conn)?,
        })
    }

    fn save(&self, store: &RequirementsStore) -> Result<()> {
        let mut conn = self.conn()?;

        // Dropping the transaction without commit rolls everything back
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM comments", [])?;
        tx.execute("DELETE FROM requirements", [])?;
        tx.execute("DELETE FROM users", [])?;

        for user in &store.users {
            Self::insert_user(&tx, user)?;
        }
        for (seq, req) in store.requirements.iter().enumerate() {
            Self::insert_requirement(&tx, req, seq as i64 + 1)?;
        }
        for (seq, comment) in store.comments.iter().enumerate() {
            Self::insert_comment(&tx, comment, seq as i64 + 1)?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO metadata (id, next_requirement_number) VALUES (1, ?1)",
            [store.next_requirement_number],
        )?;

        tx.commit()?;
        Ok(())
    }

    // Row-level overrides

    fn get_requirement(&self, id: &Uuid) -> Result<Option<Requirement>> {
        let conn = self.conn()?;
        Ok(Self::query_requirements(&conn, "WHERE id = ?1", [id.to_string()])?
            .into_iter()
            .next())
    }

    fn get_requirement_by_spec_id(&self, spec_id: &str) -> Result<Option<Requirement>> {
        let conn = self.conn()?;
        Ok(Self::query_requirements(
            &conn,
            "WHERE spec_id = ?1 COLLATE NOCASE",
            [spec_id],
        )?
        .into_iter()
        .next())
    }

    fn list_requirements(&self) -> Result<Vec<Requirement>> {
        let conn = self.conn()?;
        Self::query_requirements(&conn, "", [])
    }

    fn list_requirements_for_owner(&self, owner_id: &Uuid) -> Result<Vec<Requirement>> {
        let conn = self.conn()?;
        Self::query_requirements(&conn, "WHERE owner_id = ?1", [owner_id.to_string()])
    }

    fn add_requirement(&self, mut requirement: Requirement) -> Result<Requirement> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if requirement.spec_id.is_none() {
            let number = Self::load_next_number(&tx)?;
            requirement.spec_id = Some(format_spec_id(number));
            tx.execute(
                "UPDATE metadata SET next_requirement_number = ?1 WHERE id = 1",
                [number + 1],
            )?;
        }

        let seq = Self::next_seq(&tx, "requirements")?;
        Self::insert_requirement(&tx, &requirement, seq)?;
        tx.commit()?;

        Ok(requirement)
    }

    fn update_progress(&self, id: &Uuid, progress: PhaseProgress) -> Result<Requirement> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut req = Self::query_requirements(&tx, "WHERE id = ?1", [id.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Requirement not found: {}", id))?;

        req.apply_progress(progress);

        tx.execute(
            "UPDATE requirements
             SET phase_progress = ?1, overall_progress = ?2, status = ?3, last_updated = ?4
             WHERE id = ?5",
            params![
                Self::to_json(&req.phase_progress)?,
                req.overall_progress,
                req.status.as_str(),
                req.last_updated.to_rfc3339(),
                id.to_string(),
            ],
        )?;
        tx.commit()?;
        Ok(req)
    }

    fn delete_requirement(&self, id: &Uuid) -> Result<()> {
        let conn = self.conn()?;
        let rows_affected =
            conn.execute("DELETE FROM requirements WHERE id = ?1", [id.to_string()])?;
        if rows_affected == 0 {
            anyhow::bail!("Requirement not found: {}", id)
        }
        Ok(())
    }

    fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        let conn = self.conn()?;
        Ok(Self::query_users(&conn, "WHERE id = ?1", [id.to_string()])?
            .into_iter()
            .next())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        Ok(Self::query_users(&conn, "WHERE username = ?1", [username])?
            .into_iter()
            .next())
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        Ok(
            Self::query_users(&conn, "WHERE email = ?1 COLLATE NOCASE", [email])?
                .into_iter()
                .next(),
        )
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        Self::query_users(&conn, "", [])
    }

    fn add_user(&self, user: User) -> Result<User> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let taken: Option<String> = tx
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                [&user.username],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            anyhow::bail!("Username already taken: {}", user.username)
        }
        Self::insert_user(&tx, &user)?;
        tx.commit()?;
        Ok(user)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        // UPDATE rather than REPLACE: a replace would fire the delete cascades
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE users SET username = ?1, email = ?2, password_hash = ?3, is_admin = ?4
             WHERE id = ?5",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.is_admin,
                user.id.to_string(),
            ],
        )?;
        if rows_affected == 0 {
            anyhow::bail!("User not found: {}", user.id)
        }
        Ok(())
    }

    fn delete_user(&self, id: &Uuid) -> Result<()> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
        if rows_affected == 0 {
            anyhow::bail!("User not found: {}", id)
        }
        Ok(())
    }

    fn add_comment(&self, comment: Comment) -> Result<Comment> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM requirements WHERE id = ?1",
                [comment.requirement_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            anyhow::bail!("Requirement not found: {}", comment.requirement_id)
        }
        let seq = Self::next_seq(&tx, "comments")?;
        Self::insert_comment(&tx, &comment, seq)?;
        tx.commit()?;
        Ok(comment)
    }

    fn list_comments(&self, requirement_id: &Uuid) -> Result<Vec<Comment>> {
        let conn = self.conn()?;
        Self::query_comments(&conn, "WHERE requirement_id = ?1", [requirement_id.to_string()])
    }
}
