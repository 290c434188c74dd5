use serde::{Deserialize, Serialize};

/// An authenticated caller.
///
/// `is_manager` is the general "may administer the directory" capability;
/// `edit_all` grants edit permission on every record without individual
/// grants. Both are deliberately separate: a mutation on a specific list
/// needs the capability AND edit permission on that record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub is_manager: bool,
    pub edit_all: bool,
}

impl Actor {
    /// The implicit actor used when authentication is disabled (local,
    /// single-admin deployments). Id 0 never collides with stored actors.
    pub fn local_admin() -> Self {
        Self {
            id: 0,
            name: "local-admin".to_string(),
            is_manager: true,
            edit_all: true,
        }
    }
}
