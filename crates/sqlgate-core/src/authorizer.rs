//! The authorization callback contract.
//!
//! SQLite calls the registered [`Authorizer`] once for every guarded action
//! it meets while compiling a statement. The call is synchronous and runs on
//! the preparing thread, mid-compilation, so implementations should return
//! promptly and must not touch the connection being compiled.
//!
//! Implementations never need to worry about panics escaping: the boundary
//! adapter converts an unwinding authorizer into [`Decision::Deny`].

use crate::decision::Decision;
use crate::request::AuthRequest;

/// Decides whether one guarded action may proceed.
pub trait Authorizer: Send {
    fn authorize(&mut self, request: &AuthRequest<'_>) -> Decision;
}

impl<F> Authorizer for F
where
    F: FnMut(&AuthRequest<'_>) -> Decision + Send,
{
    fn authorize(&mut self, request: &AuthRequest<'_>) -> Decision {
        self(request)
    }
}

/// Integer form of the callback, matching SQLite's C signature.
///
/// Results other than 0, 1 and 2 are protocol violations and are treated
/// as a denial when lifted through [`Raw`].
pub trait RawAuthorizer: Send {
    fn authorize_raw(
        &mut self,
        action_code: i32,
        arg1: Option<&str>,
        arg2: Option<&str>,
        arg3: Option<&str>,
        arg4: Option<&str>,
    ) -> i32;
}

/// Lifts a [`RawAuthorizer`] into an [`Authorizer`].
pub struct Raw<R>(pub R);

impl<R: RawAuthorizer> Authorizer for Raw<R> {
    fn authorize(&mut self, request: &AuthRequest<'_>) -> Decision {
        let code = self.0.authorize_raw(
            request.action.as_raw(),
            request.arg1,
            request.arg2,
            request.arg3,
            request.arg4,
        );
        match Decision::from_raw(code) {
            Ok(decision) => decision,
            Err(violation) => {
                tracing::warn!(
                    event = "authorizer_protocol_violation",
                    action = %request.action,
                    code = violation.0,
                    "treating unrecognized result as deny"
                );
                Decision::Deny
            }
        }
    }
}

/// Adapts a fallible callback; any `Err` becomes [`Decision::Deny`].
pub struct Fallible<F>(pub F);

impl<F, E> Authorizer for Fallible<F>
where
    F: FnMut(&AuthRequest<'_>) -> Result<Decision, E> + Send,
    E: std::fmt::Display,
{
    fn authorize(&mut self, request: &AuthRequest<'_>) -> Decision {
        match (self.0)(request) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    event = "authorizer_failed",
                    action = %request.action,
                    error = %e,
                    "authorizer failed, denying"
                );
                Decision::Deny
            }
        }
    }
}

/// Allows everything. Useful as the inner authorizer of an audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&mut self, _request: &AuthRequest<'_>) -> Decision {
        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionCode;

    struct FixedCode(i32);

    impl RawAuthorizer for FixedCode {
        fn authorize_raw(
            &mut self,
            _action_code: i32,
            _arg1: Option<&str>,
            _arg2: Option<&str>,
            _arg3: Option<&str>,
            _arg4: Option<&str>,
        ) -> i32 {
            self.0
        }
    }

    fn read_request() -> AuthRequest<'static> {
        AuthRequest::new(ActionCode::Read).with_args(Some("t"), Some("c"))
    }

    #[test]
    fn test_closure_is_authorizer() {
        let mut seen = Vec::new();
        let mut auth = |req: &AuthRequest<'_>| {
            seen.push(req.action);
            Decision::Ignore
        };
        assert_eq!(auth.authorize(&read_request()), Decision::Ignore);
        assert_eq!(seen, vec![ActionCode::Read]);
    }

    #[test]
    fn test_raw_maps_recognized_codes() {
        assert_eq!(Raw(FixedCode(0)).authorize(&read_request()), Decision::Allow);
        assert_eq!(Raw(FixedCode(2)).authorize(&read_request()), Decision::Ignore);
    }

    #[test]
    fn test_raw_out_of_range_denies() {
        assert_eq!(Raw(FixedCode(7)).authorize(&read_request()), Decision::Deny);
        assert_eq!(Raw(FixedCode(-1)).authorize(&read_request()), Decision::Deny);
    }

    #[test]
    fn test_raw_receives_action_code() {
        struct Echo(Vec<i32>);
        impl RawAuthorizer for Echo {
            fn authorize_raw(
                &mut self,
                action_code: i32,
                _arg1: Option<&str>,
                arg2: Option<&str>,
                _arg3: Option<&str>,
                _arg4: Option<&str>,
            ) -> i32 {
                self.0.push(action_code);
                assert_eq!(arg2, Some("c"));
                0
            }
        }
        let mut raw = Raw(Echo(Vec::new()));
        raw.authorize(&read_request());
        assert_eq!(raw.0 .0, vec![20]);
    }

    #[test]
    fn test_fallible_error_denies() {
        let mut auth = Fallible(|req: &AuthRequest<'_>| -> Result<Decision, String> {
            if req.table() == Some("t") {
                Err("lookup failed".to_string())
            } else {
                Ok(Decision::Allow)
            }
        });
        assert_eq!(auth.authorize(&read_request()), Decision::Deny);
        let other = AuthRequest::new(ActionCode::Select);
        assert_eq!(auth.authorize(&other), Decision::Allow);
    }
}
