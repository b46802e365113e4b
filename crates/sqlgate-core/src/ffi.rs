//! Raw `sqlite3_set_authorizer` plumbing.
#![allow(unsafe_code)]

use crate::authorizer::Authorizer;
use crate::boundary::{AuthorizerStats, HookSlot};
use crate::decision::RAW_DENY;
use rusqlite::{ffi, Connection};
use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::{self, NonNull};

/// Owns the heap slot SQLite holds a pointer to while registered.
///
/// The pointer stays stable for the lifetime of this value; callers must
/// unregister it from SQLite before dropping.
pub(crate) struct InstalledHook(NonNull<HookSlot>);

// SAFETY: the slot only holds `Box<dyn Authorizer>` (which is `Send`) and
// plain counters. SQLite invokes it on whichever thread drives the owning
// connection, and the owning connection is not `Sync`.
unsafe impl Send for InstalledHook {}

impl InstalledHook {
    pub(crate) fn new(authorizer: Box<dyn Authorizer>) -> Self {
        let slot = Box::new(HookSlot::new(authorizer));
        Self(NonNull::from(Box::leak(slot)))
    }

    pub(crate) fn stats(&self) -> AuthorizerStats {
        // SAFETY: the slot is alive until drop, and no invocation can be in
        // flight while the owning connection is borrowed immutably by us.
        unsafe { self.0.as_ref().stats }
    }

    /// Point `conn`'s authorizer at this slot, replacing any previous one.
    pub(crate) fn register(&self, conn: &Connection) -> rusqlite::Result<()> {
        // SAFETY: `handle` is a live connection; the slot outlives the
        // registration because the owner unregisters before dropping it.
        let rc = unsafe {
            ffi::sqlite3_set_authorizer(
                conn.handle(),
                Some(authorizer_trampoline),
                self.0.as_ptr().cast::<c_void>(),
            )
        };
        check(rc)
    }
}

impl Drop for InstalledHook {
    fn drop(&mut self) {
        // SAFETY: created by `Box::leak` in `new` and freed exactly once here.
        drop(unsafe { Box::from_raw(self.0.as_ptr()) });
    }
}

/// Remove any authorizer from `conn`.
pub(crate) fn unregister(conn: &Connection) -> rusqlite::Result<()> {
    // SAFETY: `handle` is a live connection; a null callback disables checks.
    let rc = unsafe { ffi::sqlite3_set_authorizer(conn.handle(), None, ptr::null_mut()) };
    check(rc)
}

fn check(rc: c_int) -> rusqlite::Result<()> {
    if rc == ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(rusqlite::Error::SqliteFailure(
            ffi::Error::new(rc),
            Some("sqlite3_set_authorizer failed".to_string()),
        ))
    }
}

unsafe extern "C" fn authorizer_trampoline(
    user_data: *mut c_void,
    action_code: c_int,
    arg1: *const c_char,
    arg2: *const c_char,
    arg3: *const c_char,
    arg4: *const c_char,
) -> c_int {
    catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: `user_data` is the slot registered in `InstalledHook::register`,
        // still alive, and SQLite does not call the authorizer reentrantly.
        let slot = unsafe { &mut *user_data.cast::<HookSlot>() };
        let args = unsafe { [text(arg1), text(arg2), text(arg3), text(arg4)] };
        slot.invoke(action_code, args)
    }))
    .unwrap_or(RAW_DENY)
}

/// SAFETY: `p` must be null or a NUL-terminated string valid for `'a`.
unsafe fn text<'a>(p: *const c_char) -> Option<&'a CStr> {
    if p.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(p) })
    }
}
