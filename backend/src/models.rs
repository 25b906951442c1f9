use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub box_id: String,
    pub display_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub box_id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = folders)]
pub struct Folder {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub kind: String,
    pub year: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = folders)]
pub struct NewFolder {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub kind: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = projects)]
#[diesel(belongs_to(Folder, foreign_key = folder_id))]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub folder_id: Uuid,
    pub title: String,
    pub project_type: String,
    pub status: String,
    pub metadata: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub folder_id: Uuid,
    pub title: String,
    pub project_type: String,
    pub status: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = collaborations)]
pub struct Collaboration {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub collaborator_id: Uuid,
    pub project_id: Option<Uuid>,
    pub role: String,
    pub status: String,
    pub message: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
    pub responded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = collaborations)]
pub struct NewCollaboration {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub collaborator_id: Uuid,
    pub project_id: Option<Uuid>,
    pub role: String,
    pub status: String,
    pub message: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = creative_notes)]
pub struct CreativeNote {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: serde_json::Value,
    pub is_pinned: bool,
    pub sort_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = creative_notes)]
pub struct NewCreativeNote {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: serde_json::Value,
    pub is_pinned: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = epk_profiles)]
pub struct EpkProfile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub slug: String,
    pub artist_name: String,
    pub tagline: Option<String>,
    pub bio: String,
    pub genres: serde_json::Value,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub links: serde_json::Value,
    pub is_published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = epk_profiles)]
pub struct NewEpkProfile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub slug: String,
    pub artist_name: String,
    pub tagline: Option<String>,
    pub bio: String,
    pub genres: serde_json::Value,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub links: serde_json::Value,
    pub is_published: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = contracts)]
pub struct Contract {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Option<Uuid>,
    pub template_id: String,
    pub identifier: String,
    pub title: String,
    pub fields: serde_json::Value,
    pub html: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contracts)]
pub struct NewContract {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Option<Uuid>,
    pub template_id: String,
    pub identifier: String,
    pub title: String,
    pub fields: serde_json::Value,
    pub html: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}
