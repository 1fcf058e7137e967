//! Known-clients persistence sink.
//!
//! After a login verifies, the gateway can record the client downstream.
//! This is strictly best-effort: the trait seam lets callers plug any store,
//! and the gateway logs-and-continues when an upsert fails.

use crate::error::AuthResult;
use crate::payload::ResolvedUser;

/// Downstream sink for verified clients, keyed by Telegram user id.
pub trait ClientSink: Send + Sync {
    /// Create or refresh the record for a verified user. `seen_at` is the
    /// unix timestamp of the successful login.
    fn upsert(&self, user: &ResolvedUser, seen_at: i64) -> AuthResult<()>;
}

#[cfg(feature = "client-sqlite")]
pub use sqlite::{KnownClient, SqliteClientStore};

#[cfg(feature = "client-sqlite")]
mod sqlite {
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;
    use rusqlite::params;

    use super::ClientSink;
    use crate::error::{AuthError, AuthResult};
    use crate::payload::ResolvedUser;

    /// SQLite-backed known-clients store.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tgauth::client::SqliteClientStore;
    ///
    /// let store = SqliteClientStore::new("clients.db")?;
    /// ```
    pub struct SqliteClientStore {
        pool: Pool<SqliteConnectionManager>,
    }

    impl SqliteClientStore {
        /// Open (or create) a file-backed store.
        pub fn new(path: &str) -> AuthResult<Self> {
            let manager = SqliteConnectionManager::file(path);
            let pool = Pool::new(manager)?;

            let store = Self { pool };
            store.init_schema()?;
            Ok(store)
        }

        /// In-memory store, mainly for tests.
        pub fn in_memory() -> AuthResult<Self> {
            let manager = SqliteConnectionManager::memory();
            let pool = Pool::builder().max_size(1).build(manager)?;

            let store = Self { pool };
            store.init_schema()?;
            Ok(store)
        }

        fn init_schema(&self) -> AuthResult<()> {
            let conn = self.conn()?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS clients (
                    id INTEGER PRIMARY KEY,
                    first_name TEXT NOT NULL,
                    last_name TEXT,
                    username TEXT,
                    photo_url TEXT,
                    language_code TEXT,
                    first_seen INTEGER NOT NULL,
                    last_seen INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_clients_username ON clients(username);
                "#,
            )?;
            Ok(())
        }

        fn conn(&self) -> AuthResult<r2d2::PooledConnection<SqliteConnectionManager>> {
            self.pool
                .get()
                .map_err(|e| AuthError::Database(e.to_string()))
        }

        /// Fetch a known client by id.
        pub fn get(&self, id: i64) -> AuthResult<Option<KnownClient>> {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, first_name, last_name, username, photo_url, language_code,
                        first_seen, last_seen
                 FROM clients WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Ok(Some(KnownClient {
                    user: ResolvedUser {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        username: row.get(3)?,
                        photo_url: row.get(4)?,
                        language_code: row.get(5)?,
                    },
                    first_seen: row.get(6)?,
                    last_seen: row.get(7)?,
                })),
                None => Ok(None),
            }
        }

        /// Number of known clients.
        pub fn count(&self) -> AuthResult<u64> {
            let conn = self.conn()?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?;
            Ok(count as u64)
        }
    }

    /// A stored client row.
    #[derive(Debug, Clone)]
    pub struct KnownClient {
        pub user: ResolvedUser,
        pub first_seen: i64,
        pub last_seen: i64,
    }

    impl ClientSink for SqliteClientStore {
        fn upsert(&self, user: &ResolvedUser, seen_at: i64) -> AuthResult<()> {
            let conn = self.conn()?;
            conn.execute(
                r#"
                INSERT INTO clients
                    (id, first_name, last_name, username, photo_url, language_code,
                     first_seen, last_seen)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    username = excluded.username,
                    photo_url = excluded.photo_url,
                    language_code = excluded.language_code,
                    last_seen = excluded.last_seen
                "#,
                params![
                    user.id,
                    user.first_name,
                    user.last_name,
                    user.username,
                    user.photo_url,
                    user.language_code,
                    seen_at,
                ],
            )?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn user(id: i64, username: &str) -> ResolvedUser {
            ResolvedUser {
                id,
                first_name: "Tester".to_string(),
                last_name: None,
                username: Some(username.to_string()),
                photo_url: None,
                language_code: Some("en".to_string()),
            }
        }

        #[test]
        fn upsert_inserts_then_updates() {
            let store = SqliteClientStore::in_memory().unwrap();

            store.upsert(&user(7, "first"), 100).unwrap();
            let row = store.get(7).unwrap().unwrap();
            assert_eq!(row.user.username.as_deref(), Some("first"));
            assert_eq!(row.first_seen, 100);
            assert_eq!(row.last_seen, 100);

            store.upsert(&user(7, "renamed"), 200).unwrap();
            let row = store.get(7).unwrap().unwrap();
            assert_eq!(row.user.username.as_deref(), Some("renamed"));
            // first_seen is sticky, last_seen follows the login
            assert_eq!(row.first_seen, 100);
            assert_eq!(row.last_seen, 200);

            assert_eq!(store.count().unwrap(), 1);
        }

        #[test]
        fn get_unknown_client_is_none() {
            let store = SqliteClientStore::in_memory().unwrap();
            assert!(store.get(404).unwrap().is_none());
        }
    }
}
