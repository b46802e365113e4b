//! Boundary adapter between SQLite's C call frames and an [`Authorizer`].
//!
//! Nothing may unwind out of here. Malformed input (an unknown action code
//! or non-UTF-8 text), a panicking authorizer and an out-of-range result
//! all end up as `SQLITE_DENY`.

use crate::action::ActionCode;
use crate::authorizer::Authorizer;
use crate::decision::Decision;
use crate::request::AuthRequest;
use serde::Serialize;
use std::any::Any;
use std::ffi::CStr;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Counters for one registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthorizerStats {
    pub invocations: u64,
    pub allowed: u64,
    pub denied: u64,
    pub ignored: u64,
    /// Denials caused by a panic inside the authorizer.
    pub panics: u64,
    /// Denials caused by input the authorizer never saw.
    pub rejected: u64,
}

impl AuthorizerStats {
    fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Allow => self.allowed += 1,
            Decision::Deny => self.denied += 1,
            Decision::Ignore => self.ignored += 1,
        }
    }
}

/// Heap slot handed to SQLite as the authorizer's user data.
pub(crate) struct HookSlot {
    authorizer: Box<dyn Authorizer>,
    pub(crate) stats: AuthorizerStats,
}

impl HookSlot {
    pub(crate) fn new(authorizer: Box<dyn Authorizer>) -> Self {
        Self {
            authorizer,
            stats: AuthorizerStats::default(),
        }
    }

    /// Run one invocation. Returns the raw result code for SQLite.
    pub(crate) fn invoke(&mut self, action_code: i32, args: [Option<&CStr>; 4]) -> i32 {
        self.stats.invocations += 1;
        let decision = match self.decide(action_code, args) {
            Some(decision) => decision,
            None => {
                self.stats.rejected += 1;
                Decision::Deny
            }
        };
        self.stats.record(decision);
        decision.as_raw()
    }

    fn decide(&mut self, action_code: i32, args: [Option<&CStr>; 4]) -> Option<Decision> {
        let Some(action) = ActionCode::from_raw(action_code) else {
            tracing::warn!(
                event = "authorizer_unknown_action",
                code = action_code,
                "unknown action code, denying"
            );
            return None;
        };

        let [arg1, arg2, arg3, arg4] = args;
        let request = AuthRequest {
            action,
            arg1: decode_arg(action, 1, arg1)?,
            arg2: decode_arg(action, 2, arg2)?,
            arg3: decode_arg(action, 3, arg3)?,
            arg4: decode_arg(action, 4, arg4)?,
        };

        let authorizer = &mut self.authorizer;
        match catch_unwind(AssertUnwindSafe(|| authorizer.authorize(&request))) {
            Ok(decision) => {
                tracing::trace!(
                    event = "authorizer_decision",
                    action = %action,
                    arg1 = request.arg1,
                    arg2 = request.arg2,
                    decision = %decision
                );
                Some(decision)
            }
            Err(payload) => {
                self.stats.panics += 1;
                tracing::error!(
                    event = "authorizer_panicked",
                    action = %action,
                    panic = %panic_message(payload.as_ref()),
                    "authorizer panicked, denying"
                );
                Some(Decision::Deny)
            }
        }
    }
}

/// `None` means the argument could not be decoded; `Some(None)` means it was null.
fn decode_arg(action: ActionCode, position: u8, raw: Option<&CStr>) -> Option<Option<&str>> {
    match raw.map(CStr::to_str).transpose() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(
                event = "authorizer_invalid_utf8",
                action = %action,
                position,
                error = %e,
                "argument is not valid UTF-8, denying"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn slot<A: Authorizer + 'static>(a: A) -> HookSlot {
        HookSlot::new(Box::new(a))
    }

    #[test]
    fn test_invoke_passes_arguments_through() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut hook = slot(move |req: &AuthRequest<'_>| {
            sink.lock().unwrap().push(req.owned());
            Decision::Ignore
        });

        let table = CString::new("users").unwrap();
        let column = CString::new("email").unwrap();
        let db = CString::new("main").unwrap();
        let rc = hook.invoke(
            20,
            [
                Some(table.as_c_str()),
                Some(column.as_c_str()),
                Some(db.as_c_str()),
                None,
            ],
        );

        assert_eq!(rc, Decision::Ignore.as_raw());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].action, ActionCode::Read);
        assert_eq!(seen[0].arg1.as_deref(), Some("users"));
        assert_eq!(seen[0].arg2.as_deref(), Some("email"));
        assert_eq!(seen[0].arg3.as_deref(), Some("main"));
        assert_eq!(seen[0].arg4, None);
        assert_eq!(hook.stats.ignored, 1);
    }

    #[test]
    fn test_unknown_action_denied_without_calling_authorizer() {
        let mut hook = slot(|_: &AuthRequest<'_>| -> Decision { panic!("must not be called") });
        assert_eq!(hook.invoke(99, [None; 4]), Decision::Deny.as_raw());
        assert_eq!(hook.stats.rejected, 1);
        assert_eq!(hook.stats.panics, 0);
    }

    #[test]
    fn test_invalid_utf8_denied() {
        let mut hook = slot(|_: &AuthRequest<'_>| Decision::Allow);
        let bad = CStr::from_bytes_with_nul(b"t\xff\0").unwrap();
        assert_eq!(
            hook.invoke(18, [Some(bad), None, None, None]),
            Decision::Deny.as_raw()
        );
        assert_eq!(hook.stats.rejected, 1);
        assert_eq!(hook.stats.denied, 1);
    }

    #[test]
    fn test_panic_becomes_deny() {
        let mut hook = slot(|req: &AuthRequest<'_>| {
            if req.action == ActionCode::Select {
                panic!("policy backend unavailable");
            }
            Decision::Allow
        });
        assert_eq!(hook.invoke(21, [None; 4]), Decision::Deny.as_raw());
        // Still installed and usable afterwards.
        let table = CString::new("t").unwrap();
        assert_eq!(
            hook.invoke(9, [Some(table.as_c_str()), None, None, None]),
            Decision::Allow.as_raw()
        );
        assert_eq!(
            hook.stats,
            AuthorizerStats {
                invocations: 2,
                allowed: 1,
                denied: 1,
                ignored: 0,
                panics: 1,
                rejected: 0,
            }
        );
    }

    #[test]
    fn test_panic_message_downcasts() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref()), "boom");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
