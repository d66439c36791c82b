// Keywarden — Secret Store Repository
//
// Key/value persistence for enclave state. Single-key writes are one SQL
// statement; writes that touch several keys (`reset`, `store_credentials`,
// `set_remember_duration`) run in one transaction, and the session overlay is
// only updated after the commit. Callers observe the old state or the new one.
//
// Passwords are special: with a remember-duration recorded they are persisted
// with an expiry, otherwise they live only in the in-process session overlay.
// An expired password reads as absent and its row is removed.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use zeroize::Zeroizing;

use super::db::Database;
use super::models::{AuditEntry, RememberPolicy, StoreKey, MAX_REMEMBER_DURATION};
use super::StoreError;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over enclave state persistence.
pub trait SecretStore: Send {
    /// Read a value. Expired passwords read as `None`.
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: StoreKey, value: &str) -> Result<(), StoreError>;

    /// Remove a single key. Removing an absent key is not an error.
    fn remove(&mut self, key: StoreKey) -> Result<(), StoreError>;

    /// Clear every key, including the session overlay. The audit log is kept.
    fn reset(&mut self) -> Result<(), StoreError>;

    /// Store `password` together with `entries` and the remember policy, all
    /// or nothing. `entries` must not contain the password key.
    fn store_credentials(
        &mut self,
        password: &str,
        entries: &[(StoreKey, &str)],
        remember: RememberPolicy,
    ) -> Result<(), StoreError>;

    /// Record how long a password stays remembered and re-apply that policy to
    /// the password currently held. `None` or zero means session-only.
    fn set_remember_duration(&mut self, duration: Option<Duration>) -> Result<(), StoreError>;

    /// The recorded remember-duration, if any.
    fn remember_duration(&self) -> Result<Option<Duration>, StoreError>;

    /// Append an entry to the audit log.
    fn log_event(&self, action: &str, details: Option<&str>) -> Result<(), StoreError>;

    /// The most recent audit entries, oldest first.
    fn audit_log(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError>;
}

/// Append an audit entry. A failed write is logged, never propagated.
pub fn record_event(store: &dyn SecretStore, action: &str, details: Option<&str>) {
    if let Err(e) = store.log_event(action, details) {
        tracing::warn!(action = %action, "Couldn't write audit entry: {}", e);
    }
}

/// When a password remembered for `duration` from now expires.
fn password_expiry(duration: Duration) -> Result<DateTime<Utc>, StoreError> {
    let invalid = || StoreError::InvalidValue {
        key: StoreKey::RememberDuration.as_str(),
        value: duration.as_secs().to_string(),
    };
    if duration > MAX_REMEMBER_DURATION {
        return Err(invalid());
    }
    let ttl = chrono::Duration::from_std(duration).map_err(|_| invalid())?;
    Utc::now().checked_add_signed(ttl).ok_or_else(invalid)
}

fn upsert(
    conn: &Connection,
    key: StoreKey,
    value: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO entries (key, value, expires_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        params![key.as_str(), value, expires_at.map(|t| t.to_rfc3339())],
    )?;
    Ok(())
}

fn delete(conn: &Connection, key: StoreKey) -> Result<(), StoreError> {
    conn.execute("DELETE FROM entries WHERE key = ?1", params![key.as_str()])?;
    Ok(())
}

// ─── SQLite Implementation ──────────────────────────────────────────────────

pub struct SqliteSecretStore {
    db: Database,
    session: HashMap<StoreKey, Zeroizing<String>>,
}

impl SqliteSecretStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            session: HashMap::new(),
        }
    }

    /// Open the file-backed store at `path`.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn read_row(&self, key: StoreKey) -> Result<Option<(String, Option<String>)>, StoreError> {
        let row = self
            .db
            .conn()
            .query_row(
                "SELECT value, expires_at FROM entries WHERE key = ?1",
                params![key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    fn is_expired(expires_at: &str) -> bool {
        match DateTime::parse_from_rfc3339(expires_at) {
            Ok(at) => at.with_timezone(&Utc) <= Utc::now(),
            // An unreadable expiry is treated as already elapsed.
            Err(_) => true,
        }
    }

    /// Write `password`, `entries` and the remember-duration row in one
    /// transaction. Every fallible conversion happens before the first write.
    fn commit_password(
        &mut self,
        password: Option<&str>,
        entries: &[(StoreKey, &str)],
        remember: RememberPolicy,
    ) -> Result<(), StoreError> {
        if entries.iter().any(|(key, _)| *key == StoreKey::Password) {
            return Err(StoreError::InvalidValue {
                key: StoreKey::Password.as_str(),
                value: "[REDACTED]".into(),
            });
        }

        let duration = match remember {
            RememberPolicy::Keep if password.is_some() => self.remember_duration()?,
            RememberPolicy::Keep | RememberPolicy::SessionOnly => None,
            RememberPolicy::For(duration) => Some(duration),
        };
        let expires_at = match duration.filter(|d| !d.is_zero()) {
            Some(duration) => Some(password_expiry(duration)?),
            None => None,
        };

        let tx = self.db.conn().unchecked_transaction()?;
        for (key, value) in entries {
            upsert(&tx, *key, value, None)?;
        }
        match remember {
            RememberPolicy::Keep => {}
            RememberPolicy::SessionOnly => delete(&tx, StoreKey::RememberDuration)?,
            RememberPolicy::For(duration) => upsert(
                &tx,
                StoreKey::RememberDuration,
                &duration.as_secs().to_string(),
                None,
            )?,
        }
        if let Some(password) = password {
            match expires_at {
                Some(at) => upsert(&tx, StoreKey::Password, password, Some(at))?,
                None => delete(&tx, StoreKey::Password)?,
            }
        }
        tx.commit()?;

        if let Some(password) = password {
            match expires_at {
                Some(at) => {
                    self.session.remove(&StoreKey::Password);
                    tracing::debug!(expires_at = %at.to_rfc3339(), "Password remembered");
                }
                None => {
                    self.session
                        .insert(StoreKey::Password, Zeroizing::new(password.to_string()));
                    tracing::debug!("Password kept for this session only");
                }
            }
        }
        for (key, value) in entries {
            if key.is_secret() {
                tracing::debug!(key = %key, "Secret value stored");
            } else {
                tracing::debug!(key = %key, value = %value, "Value stored");
            }
        }
        Ok(())
    }
}

impl SecretStore for SqliteSecretStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        if let Some(value) = self.session.get(&key) {
            return Ok(Some(value.to_string()));
        }

        match self.read_row(key)? {
            Some((_, Some(expires_at))) if Self::is_expired(&expires_at) => {
                delete(self.db.conn(), key)?;
                tracing::info!(key = %key, "Stored value expired and was removed");
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        if key == StoreKey::Password {
            return self.commit_password(Some(value), &[], RememberPolicy::Keep);
        }
        self.commit_password(None, &[(key, value)], RememberPolicy::Keep)
    }

    fn remove(&mut self, key: StoreKey) -> Result<(), StoreError> {
        self.session.remove(&key);
        delete(self.db.conn(), key)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        let tx = self.db.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        tx.commit()?;
        self.session.clear();

        tracing::info!("Enclave state cleared");
        Ok(())
    }

    fn store_credentials(
        &mut self,
        password: &str,
        entries: &[(StoreKey, &str)],
        remember: RememberPolicy,
    ) -> Result<(), StoreError> {
        self.commit_password(Some(password), entries, remember)
    }

    fn set_remember_duration(&mut self, duration: Option<Duration>) -> Result<(), StoreError> {
        let current = self.get(StoreKey::Password)?.map(Zeroizing::new);
        let remember = match duration {
            Some(duration) => RememberPolicy::For(duration),
            None => RememberPolicy::SessionOnly,
        };
        self.commit_password(current.as_ref().map(|p| p.as_str()), &[], remember)
    }

    fn remember_duration(&self) -> Result<Option<Duration>, StoreError> {
        let Some(raw) = self.get(StoreKey::RememberDuration)? else {
            return Ok(None);
        };
        let secs: u64 = raw.parse().map_err(|_| StoreError::InvalidValue {
            key: StoreKey::RememberDuration.as_str(),
            value: raw.clone(),
        })?;
        Ok(Some(Duration::from_secs(secs)))
    }

    fn log_event(&self, action: &str, details: Option<&str>) -> Result<(), StoreError> {
        self.db.conn().execute(
            "INSERT INTO audit_log (action, timestamp, details) VALUES (?1, ?2, ?3)",
            params![action, Utc::now().to_rfc3339(), details],
        )?;

        tracing::debug!(action = %action, "Audit log entry recorded");
        Ok(())
    }

    fn audit_log(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, action, timestamp, details FROM audit_log
             ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let action: String = row.get(1)?;
            let timestamp_str: String = row.get(2)?;
            let details: Option<String> = row.get(3)?;

            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            Ok(AuditEntry {
                id,
                action,
                timestamp,
                details,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        entries.reverse();

        Ok(entries)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
