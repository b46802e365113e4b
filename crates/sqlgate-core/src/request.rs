//! Per-call authorization inputs.

use crate::action::ActionCode;
use serde::{Deserialize, Serialize};

/// The five inputs of one authorizer invocation.
///
/// The text arguments are borrowed from SQLite and only live for the
/// duration of the call. Use [`AuthRequest::owned`] to keep them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRequest<'a> {
    pub action: ActionCode,
    pub arg1: Option<&'a str>,
    pub arg2: Option<&'a str>,
    /// Database name (`main`, `temp`, or an attached alias).
    pub arg3: Option<&'a str>,
    /// Innermost trigger or view responsible for the access.
    pub arg4: Option<&'a str>,
}

impl<'a> AuthRequest<'a> {
    pub fn new(action: ActionCode) -> Self {
        Self {
            action,
            arg1: None,
            arg2: None,
            arg3: None,
            arg4: None,
        }
    }

    pub fn with_args(mut self, arg1: Option<&'a str>, arg2: Option<&'a str>) -> Self {
        self.arg1 = arg1;
        self.arg2 = arg2;
        self
    }

    pub fn with_database(mut self, database: Option<&'a str>) -> Self {
        self.arg3 = database;
        self
    }

    pub fn with_accessor(mut self, accessor: Option<&'a str>) -> Self {
        self.arg4 = accessor;
        self
    }

    /// Table name for actions whose first argument is a table.
    pub fn table(&self) -> Option<&'a str> {
        match self.action {
            ActionCode::CreateTable
            | ActionCode::CreateTempTable
            | ActionCode::DropTable
            | ActionCode::DropTempTable
            | ActionCode::Delete
            | ActionCode::Insert
            | ActionCode::Read
            | ActionCode::Update
            | ActionCode::Analyze
            | ActionCode::CreateVtable
            | ActionCode::DropVtable => self.arg1,
            ActionCode::CreateIndex
            | ActionCode::CreateTempIndex
            | ActionCode::DropIndex
            | ActionCode::DropTempIndex
            | ActionCode::CreateTrigger
            | ActionCode::CreateTempTrigger
            | ActionCode::DropTrigger
            | ActionCode::DropTempTrigger
            | ActionCode::AlterTable => self.arg2,
            _ => None,
        }
    }

    /// Column name for `read` and `update`.
    pub fn column(&self) -> Option<&'a str> {
        match self.action {
            ActionCode::Read | ActionCode::Update => self.arg2,
            _ => None,
        }
    }

    pub fn database(&self) -> Option<&'a str> {
        self.arg3
    }

    pub fn accessor(&self) -> Option<&'a str> {
        self.arg4
    }

    /// Whether the arguments fit the catalog layout for this action.
    pub fn matches_schema(&self) -> bool {
        let schema = self.action.schema();
        schema.arg1.admits(self.arg1) && schema.arg2.admits(self.arg2)
    }

    pub fn owned(&self) -> OwnedAuthRequest {
        OwnedAuthRequest {
            action: self.action,
            arg1: self.arg1.map(str::to_string),
            arg2: self.arg2.map(str::to_string),
            arg3: self.arg3.map(str::to_string),
            arg4: self.arg4.map(str::to_string),
        }
    }
}

/// Copy of an [`AuthRequest`] that may outlive the call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedAuthRequest {
    pub action: ActionCode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arg1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arg2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arg3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arg4: Option<String>,
}

impl OwnedAuthRequest {
    pub fn as_request(&self) -> AuthRequest<'_> {
        AuthRequest {
            action: self.action,
            arg1: self.arg1.as_deref(),
            arg2: self.arg2.as_deref(),
            arg3: self.arg3.as_deref(),
            arg4: self.arg4.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_and_column_for_read() {
        let req = AuthRequest::new(ActionCode::Read)
            .with_args(Some("users"), Some("email"))
            .with_database(Some("main"));
        assert_eq!(req.table(), Some("users"));
        assert_eq!(req.column(), Some("email"));
        assert_eq!(req.database(), Some("main"));
        assert_eq!(req.accessor(), None);
        assert!(req.matches_schema());
    }

    #[test]
    fn test_table_for_index_is_second_argument() {
        let req = AuthRequest::new(ActionCode::CreateIndex).with_args(Some("idx_a"), Some("t"));
        assert_eq!(req.table(), Some("t"));
        assert_eq!(req.column(), None);
    }

    #[test]
    fn test_empty_text_is_not_absent() {
        let req = AuthRequest::new(ActionCode::Select).with_args(Some(""), None);
        assert!(!req.matches_schema());
        let owned = req.owned();
        assert_eq!(owned.arg1.as_deref(), Some(""));
        assert_eq!(owned.as_request(), req);
    }

    #[test]
    fn test_owned_request_omits_absent_args() {
        let owned = AuthRequest::new(ActionCode::Select).owned();
        let json = serde_json::to_value(&owned).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "select" }));
    }
}
