use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::element::{ElemId, Entity};

/// The kind of transition a [`Change`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Modify,
    Remove,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Add => "add",
            ActionKind::Modify => "modify",
            ActionKind::Remove => "remove",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition of one entity between the current and the desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Change {
    Add { after: Entity },
    Modify { before: Entity, after: Entity },
    Remove { before: Entity },
}

impl Change {
    pub fn add(after: Entity) -> Self {
        Change::Add { after }
    }

    pub fn modify(before: Entity, after: Entity) -> Self {
        Change::Modify { before, after }
    }

    pub fn remove(before: Entity) -> Self {
        Change::Remove { before }
    }

    pub fn action(&self) -> ActionKind {
        match self {
            Change::Add { .. } => ActionKind::Add,
            Change::Modify { .. } => ActionKind::Modify,
            Change::Remove { .. } => ActionKind::Remove,
        }
    }

    /// The entity that requests are built from: `after`, or `before` for removals.
    pub fn data(&self) -> &Entity {
        match self {
            Change::Add { after } | Change::Modify { after, .. } => after,
            Change::Remove { before } => before,
        }
    }

    pub fn data_mut(&mut self) -> &mut Entity {
        match self {
            Change::Add { after } | Change::Modify { after, .. } => after,
            Change::Remove { before } => before,
        }
    }

    pub fn before(&self) -> Option<&Entity> {
        match self {
            Change::Add { .. } => None,
            Change::Modify { before, .. } | Change::Remove { before } => Some(before),
        }
    }

    pub fn after(&self) -> Option<&Entity> {
        match self {
            Change::Add { after } | Change::Modify { after, .. } => Some(after),
            Change::Remove { .. } => None,
        }
    }

    pub fn after_mut(&mut self) -> Option<&mut Entity> {
        match self {
            Change::Add { after } | Change::Modify { after, .. } => Some(after),
            Change::Remove { .. } => None,
        }
    }

    pub fn elem_id(&self) -> &ElemId {
        &self.data().elem_id
    }
}
