use axum::extract::State;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::box_id;
use crate::extract::{Json, Path};
use crate::models::User;
use crate::schema::users;
use crate::state::AppState;
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

/// The identity other users may see when looking someone up by BOX ID.
#[derive(Serialize, Clone)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub box_id: String,
}

pub async fn lookup_by_box_id(
    State(state): State<AppState>,
    Path(raw_box_id): Path<String>,
    _user: AuthenticatedUser,
) -> AppResult<Json<UserSummary>> {
    let box_id = box_id::normalize(&raw_box_id)?;
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::box_id.eq(&box_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(to_user_summary(&user)))
}

pub(crate) fn to_user_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        box_id: user.box_id.clone(),
    }
}
