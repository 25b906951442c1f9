use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Where a dragged project was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DropTarget {
    Folder(Uuid),
    Project(Uuid),
    Desktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePlan {
    Move { from: Uuid, to: Uuid },
    Unchanged,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("projects can only be dropped onto folders")]
    NotAFolder,
    #[error("project is no longer in the expected folder")]
    StaleOrigin { expected: Uuid, current: Uuid },
}

/// Decides what a drop of a project currently stored in `current` means.
///
/// Dropping onto the folder the project already lives in is a no-op, even
/// when `expected_origin` is stale.
pub fn plan_move(
    current: Uuid,
    target: DropTarget,
    expected_origin: Option<Uuid>,
) -> Result<MovePlan, MoveError> {
    let to = match target {
        DropTarget::Folder(id) => id,
        DropTarget::Project(_) | DropTarget::Desktop => return Err(MoveError::NotAFolder),
    };

    if to == current {
        return Ok(MovePlan::Unchanged);
    }

    if let Some(expected) = expected_origin {
        if expected != current {
            return Err(MoveError::StaleOrigin { expected, current });
        }
    }

    Ok(MovePlan::Move { from: current, to })
}
