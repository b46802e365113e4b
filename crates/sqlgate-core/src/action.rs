//! SQLite authorizer action catalog.
//!
//! Codes and argument layouts mirror the `SQLITE_*` action constants in
//! `sqlite3.h`. Argument 3 carries the database name when the action is tied
//! to one (it is null for ATTACH, DETACH and statement-level actions) and
//! argument 4 the innermost trigger or view. Only the first two slots are
//! described per action here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Guarded action identified by SQLite's action code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ActionCode {
    /// Legacy code, never emitted by modern SQLite.
    Copy = 0,
    CreateIndex = 1,
    CreateTable = 2,
    CreateTempIndex = 3,
    CreateTempTable = 4,
    CreateTempTrigger = 5,
    CreateTempView = 6,
    CreateTrigger = 7,
    CreateView = 8,
    Delete = 9,
    DropIndex = 10,
    DropTable = 11,
    DropTempIndex = 12,
    DropTempTable = 13,
    DropTempTrigger = 14,
    DropTempView = 15,
    DropTrigger = 16,
    DropView = 17,
    Insert = 18,
    Pragma = 19,
    Read = 20,
    Select = 21,
    Transaction = 22,
    Update = 23,
    Attach = 24,
    Detach = 25,
    AlterTable = 26,
    Reindex = 27,
    Analyze = 28,
    CreateVtable = 29,
    DropVtable = 30,
    Function = 31,
    Savepoint = 32,
    Recursive = 33,
}

/// Every action, indexed by its raw code.
pub const ALL_ACTIONS: [ActionCode; 34] = [
    ActionCode::Copy,
    ActionCode::CreateIndex,
    ActionCode::CreateTable,
    ActionCode::CreateTempIndex,
    ActionCode::CreateTempTable,
    ActionCode::CreateTempTrigger,
    ActionCode::CreateTempView,
    ActionCode::CreateTrigger,
    ActionCode::CreateView,
    ActionCode::Delete,
    ActionCode::DropIndex,
    ActionCode::DropTable,
    ActionCode::DropTempIndex,
    ActionCode::DropTempTable,
    ActionCode::DropTempTrigger,
    ActionCode::DropTempView,
    ActionCode::DropTrigger,
    ActionCode::DropView,
    ActionCode::Insert,
    ActionCode::Pragma,
    ActionCode::Read,
    ActionCode::Select,
    ActionCode::Transaction,
    ActionCode::Update,
    ActionCode::Attach,
    ActionCode::Detach,
    ActionCode::AlterTable,
    ActionCode::Reindex,
    ActionCode::Analyze,
    ActionCode::CreateVtable,
    ActionCode::DropVtable,
    ActionCode::Function,
    ActionCode::Savepoint,
    ActionCode::Recursive,
];

/// Presence of one positional argument for a given action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "presence", content = "label", rename_all = "snake_case")]
pub enum ArgSlot {
    /// Always null.
    Absent,
    /// Always supplied.
    Required(&'static str),
    /// Supplied for some statements only (e.g. a pragma without a value).
    Optional(&'static str),
}

impl ArgSlot {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Absent => None,
            Self::Required(label) | Self::Optional(label) => Some(label),
        }
    }

    /// Whether `value` is a legal occupant of this slot.
    pub fn admits(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Absent, None) => true,
            (Self::Absent, Some(_)) => false,
            (Self::Required(_), value) => value.is_some(),
            (Self::Optional(_), _) => true,
        }
    }
}

/// Layout of the two action-specific arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArgSchema {
    pub arg1: ArgSlot,
    pub arg2: ArgSlot,
}

impl ArgSchema {
    const fn new(arg1: ArgSlot, arg2: ArgSlot) -> Self {
        Self { arg1, arg2 }
    }
}

const INDEX_ON_TABLE: ArgSchema = ArgSchema::new(
    ArgSlot::Required("index name"),
    ArgSlot::Required("table name"),
);
const TRIGGER_ON_TABLE: ArgSchema = ArgSchema::new(
    ArgSlot::Required("trigger name"),
    ArgSlot::Required("table name"),
);
const TABLE_ONLY: ArgSchema = ArgSchema::new(ArgSlot::Required("table name"), ArgSlot::Absent);
const VIEW_ONLY: ArgSchema = ArgSchema::new(ArgSlot::Required("view name"), ArgSlot::Absent);
const TABLE_COLUMN: ArgSchema = ArgSchema::new(
    ArgSlot::Required("table name"),
    ArgSlot::Required("column name"),
);
const VTABLE_MODULE: ArgSchema = ArgSchema::new(
    ArgSlot::Required("table name"),
    ArgSlot::Required("module name"),
);
const NO_ARGS: ArgSchema = ArgSchema::new(ArgSlot::Absent, ArgSlot::Absent);

impl ActionCode {
    pub fn from_raw(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| ALL_ACTIONS.get(idx))
            .copied()
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::CreateIndex => "create_index",
            Self::CreateTable => "create_table",
            Self::CreateTempIndex => "create_temp_index",
            Self::CreateTempTable => "create_temp_table",
            Self::CreateTempTrigger => "create_temp_trigger",
            Self::CreateTempView => "create_temp_view",
            Self::CreateTrigger => "create_trigger",
            Self::CreateView => "create_view",
            Self::Delete => "delete",
            Self::DropIndex => "drop_index",
            Self::DropTable => "drop_table",
            Self::DropTempIndex => "drop_temp_index",
            Self::DropTempTable => "drop_temp_table",
            Self::DropTempTrigger => "drop_temp_trigger",
            Self::DropTempView => "drop_temp_view",
            Self::DropTrigger => "drop_trigger",
            Self::DropView => "drop_view",
            Self::Insert => "insert",
            Self::Pragma => "pragma",
            Self::Read => "read",
            Self::Select => "select",
            Self::Transaction => "transaction",
            Self::Update => "update",
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::AlterTable => "alter_table",
            Self::Reindex => "reindex",
            Self::Analyze => "analyze",
            Self::CreateVtable => "create_vtable",
            Self::DropVtable => "drop_vtable",
            Self::Function => "function",
            Self::Savepoint => "savepoint",
            Self::Recursive => "recursive",
        }
    }

    /// Argument layout SQLite uses for this action.
    pub fn schema(&self) -> ArgSchema {
        match self {
            Self::Copy | Self::Select | Self::Recursive => NO_ARGS,
            Self::CreateIndex | Self::CreateTempIndex | Self::DropIndex | Self::DropTempIndex => {
                INDEX_ON_TABLE
            }
            Self::CreateTrigger
            | Self::CreateTempTrigger
            | Self::DropTrigger
            | Self::DropTempTrigger => TRIGGER_ON_TABLE,
            Self::CreateTable
            | Self::CreateTempTable
            | Self::DropTable
            | Self::DropTempTable
            | Self::Delete
            | Self::Insert
            | Self::Analyze => TABLE_ONLY,
            Self::CreateView | Self::CreateTempView | Self::DropView | Self::DropTempView => {
                VIEW_ONLY
            }
            Self::Read | Self::Update => TABLE_COLUMN,
            Self::CreateVtable | Self::DropVtable => VTABLE_MODULE,
            Self::Pragma => ArgSchema::new(
                ArgSlot::Required("pragma name"),
                ArgSlot::Optional("pragma argument"),
            ),
            Self::Transaction => ArgSchema::new(ArgSlot::Required("operation"), ArgSlot::Absent),
            // Null when the operand is neither a literal nor an identifier.
            Self::Attach => ArgSchema::new(ArgSlot::Optional("filename"), ArgSlot::Absent),
            Self::Detach => ArgSchema::new(ArgSlot::Optional("database name"), ArgSlot::Absent),
            Self::AlterTable => ArgSchema::new(
                ArgSlot::Required("database name"),
                ArgSlot::Required("table name"),
            ),
            Self::Reindex => ArgSchema::new(ArgSlot::Required("index name"), ArgSlot::Absent),
            Self::Function => ArgSchema::new(ArgSlot::Absent, ArgSlot::Required("function name")),
            Self::Savepoint => ArgSchema::new(
                ArgSlot::Required("operation"),
                ArgSlot::Required("savepoint name"),
            ),
        }
    }

    /// True for actions that create, drop or alter schema objects.
    pub fn is_schema_change(&self) -> bool {
        matches!(
            self,
            Self::CreateIndex
                | Self::CreateTable
                | Self::CreateTempIndex
                | Self::CreateTempTable
                | Self::CreateTempTrigger
                | Self::CreateTempView
                | Self::CreateTrigger
                | Self::CreateView
                | Self::DropIndex
                | Self::DropTable
                | Self::DropTempIndex
                | Self::DropTempTable
                | Self::DropTempTrigger
                | Self::DropTempView
                | Self::DropTrigger
                | Self::DropView
                | Self::AlterTable
                | Self::CreateVtable
                | Self::DropVtable
        )
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an action name that is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for ActionCode {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ALL_ACTIONS
            .iter()
            .find(|a| a.as_str() == normalized)
            .copied()
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
