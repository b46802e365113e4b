//! Exit codes for the `sqlgate` binary.
//! These codes are part of the public contract; scripts branch on them.

pub const SUCCESS: i32 = 0;
pub const STATEMENT_FAILED: i32 = 1; // SQLite rejected a statement for a reason other than authorization
pub const CONFIG_ERROR: i32 = 2; // Config invalid, unreadable, or internal failure
pub const DENIED: i32 = 3; // At least one statement denied by the authorizer
