//! Connection wrapper that owns the registered authorizer.

use crate::authorizer::Authorizer;
use crate::boundary::AuthorizerStats;
use crate::error::{is_authorization_denied, GuardError};
use crate::ffi::{self, InstalledHook};
use rusqlite::{Connection, Statement};
use std::ops::Deref;
use std::path::Path;

/// A SQLite connection with at most one registered [`Authorizer`].
///
/// The authorizer is `'static`, so it cannot borrow the connection it
/// guards. Replacing or removing it needs `&mut self`, which rules out a
/// swap in the middle of a compilation on this connection.
pub struct GuardedConnection {
    conn: Connection,
    hook: Option<InstalledHook>,
}

impl GuardedConnection {
    /// Open a file-backed connection.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GuardError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Create an in-memory connection.
    pub fn open_in_memory() -> Result<Self, GuardError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Wrap an existing connection. Any authorizer registered through other
    /// means is left in place until [`set_authorizer`](Self::set_authorizer)
    /// or [`clear_authorizer`](Self::clear_authorizer) is called.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn, hook: None }
    }

    /// Register `authorizer`, replacing the current one. `None` removes
    /// authorization checking entirely.
    pub fn set_authorizer<A>(&mut self, authorizer: Option<A>) -> Result<(), GuardError>
    where
        A: Authorizer + 'static,
    {
        let Some(authorizer) = authorizer else {
            return self.clear_authorizer();
        };

        let hook = InstalledHook::new(Box::new(authorizer));
        hook.register(&self.conn)?;
        // SQLite now points at the new slot; the old one can go.
        let replaced = self.hook.replace(hook).is_some();
        tracing::debug!(event = "authorizer_registered", replaced);
        Ok(())
    }

    /// Remove the registered authorizer, if any.
    pub fn clear_authorizer(&mut self) -> Result<(), GuardError> {
        ffi::unregister(&self.conn)?;
        if self.hook.take().is_some() {
            tracing::debug!(event = "authorizer_cleared");
        }
        Ok(())
    }

    pub fn has_authorizer(&self) -> bool {
        self.hook.is_some()
    }

    /// Counters for the current registration. Reset on every
    /// [`set_authorizer`](Self::set_authorizer).
    pub fn authorizer_stats(&self) -> Option<AuthorizerStats> {
        self.hook.as_ref().map(InstalledHook::stats)
    }

    /// Prepare `sql`, reporting an authorizer denial as [`GuardError::Denied`].
    pub fn prepare_guarded(&self, sql: &str) -> Result<Statement<'_>, GuardError> {
        self.conn.prepare(sql).map_err(|e| {
            if is_authorization_denied(&e) {
                tracing::info!(event = "statement_denied", sql);
                GuardError::Denied {
                    sql: sql.to_string(),
                }
            } else {
                GuardError::Sqlite(e)
            }
        })
    }

    /// Compile `sql` without running it.
    pub fn check(&self, sql: &str) -> Result<(), GuardError> {
        self.prepare_guarded(sql).map(drop)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Deref for GuardedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for GuardedConnection {
    fn drop(&mut self) {
        if self.hook.is_some() {
            if let Err(e) = ffi::unregister(&self.conn) {
                tracing::warn!(event = "authorizer_unregister_failed", error = %e);
            }
        }
    }
}

impl std::fmt::Debug for GuardedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedConnection")
            .field("path", &self.conn.path())
            .field("has_authorizer", &self.has_authorizer())
            .finish()
    }
}
