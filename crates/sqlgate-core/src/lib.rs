//! Statement authorization for SQLite connections.
//!
//! SQLite consults an authorizer callback while it compiles a statement,
//! once per action (read a column, insert into a table, create an index).
//! The callback answers `allow`, `deny` (abort compilation) or `ignore`
//! (read NULL, skip the write, or skip the delete).
//!
//! - [`Authorizer`] is the typed callback contract; closures implement it
//! - [`GuardedConnection`] owns a connection and at most one installed hook
//! - [`Policy`] evaluates ordered glob rules loaded from YAML ([`Config`])
//! - [`Recording`] keeps an audit trail of every decision
//!
//! # Quick Start
//!
//! ```no_run
//! use sqlgate_core::{ActionCode, AuthRequest, Decision, GuardedConnection};
//!
//! # fn example() -> Result<(), sqlgate_core::GuardError> {
//! let mut conn = GuardedConnection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE users(name TEXT, ssn TEXT)")?;
//! conn.set_authorizer(Some(|req: &AuthRequest<'_>| {
//!     if req.action == ActionCode::Read && req.column() == Some("ssn") {
//!         Decision::Ignore
//!     } else {
//!         Decision::Allow
//!     }
//! }))?;
//! conn.execute("INSERT INTO users VALUES ('alice', '123-45-6789')", [])?;
//! let ssn: Option<String> = conn.query_row("SELECT ssn FROM users", [], |r| r.get(0))?;
//! assert_eq!(ssn, None);
//! # Ok(())
//! # }
//! ```
//!
//! Callbacks are invoked while SQLite is compiling on the same connection,
//! so an authorizer must never use that connection itself.

pub mod action;
pub mod audit;
pub mod authorizer;
mod boundary;
pub mod config;
pub mod connection;
pub mod decision;
pub mod error;
mod ffi;
pub mod policy;
pub mod request;

pub use action::{ActionCode, ArgSchema, ArgSlot, UnknownAction, ALL_ACTIONS};
pub use audit::{AuditEntry, AuditTrail, JsonlSink, Recording};
pub use authorizer::{AllowAll, Authorizer, Fallible, Raw, RawAuthorizer};
pub use boundary::AuthorizerStats;
pub use config::{AuditConfig, Config, CONFIG_VERSION};
pub use connection::GuardedConnection;
pub use decision::{Decision, ProtocolViolation, UnknownDecision};
pub use error::{is_authorization_denied, GuardError, PolicyError};
pub use policy::{Policy, PolicyAuthorizer, PolicySpec, RuleSpec};
pub use request::{AuthRequest, OwnedAuthRequest};
