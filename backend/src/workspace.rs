//! Per-user folder provisioning. Every owner gets one root folder with a
//! folder per year beneath it; both are created lazily.

use chrono::{Datelike, Utc};
use diesel::{pg::PgConnection, prelude::*, QueryResult};
use uuid::Uuid;

use crate::domain::folders::{
    year_folder_name, FolderKind, FolderNode, FolderTree, ROOT_FOLDER_NAME,
};
use crate::models::{Folder, NewFolder};
use crate::schema::folders;

pub fn kind_of(folder: &Folder) -> FolderKind {
    // The column is constrained to known kinds; anything else is treated as user data.
    folder.kind.parse().unwrap_or(FolderKind::Custom)
}

pub fn ensure_root_folder(conn: &mut PgConnection, owner_id: Uuid) -> QueryResult<Folder> {
    let existing = folders::table
        .filter(folders::owner_id.eq(owner_id))
        .filter(folders::kind.eq(FolderKind::Root.as_str()))
        .first::<Folder>(conn)
        .optional()?;
    if let Some(root) = existing {
        return Ok(root);
    }

    let new_root = NewFolder {
        id: Uuid::new_v4(),
        owner_id,
        name: ROOT_FOLDER_NAME.to_string(),
        parent_id: None,
        kind: FolderKind::Root.as_str().to_string(),
        year: None,
    };
    diesel::insert_into(folders::table)
        .values(&new_root)
        .on_conflict_do_nothing()
        .execute(conn)?;

    folders::table
        .filter(folders::owner_id.eq(owner_id))
        .filter(folders::kind.eq(FolderKind::Root.as_str()))
        .first(conn)
}

pub fn ensure_year_folder(conn: &mut PgConnection, owner_id: Uuid, year: i32) -> QueryResult<Folder> {
    let existing = folders::table
        .filter(folders::owner_id.eq(owner_id))
        .filter(folders::kind.eq(FolderKind::Year.as_str()))
        .filter(folders::year.eq(Some(year)))
        .first::<Folder>(conn)
        .optional()?;
    if let Some(folder) = existing {
        return Ok(folder);
    }

    let root = ensure_root_folder(conn, owner_id)?;
    let new_year = NewFolder {
        id: Uuid::new_v4(),
        owner_id,
        name: year_folder_name(year),
        parent_id: Some(root.id),
        kind: FolderKind::Year.as_str().to_string(),
        year: Some(year),
    };
    diesel::insert_into(folders::table)
        .values(&new_year)
        .on_conflict_do_nothing()
        .execute(conn)?;

    folders::table
        .filter(folders::owner_id.eq(owner_id))
        .filter(folders::kind.eq(FolderKind::Year.as_str()))
        .filter(folders::year.eq(Some(year)))
        .first(conn)
}

pub fn ensure_current_year_folder(conn: &mut PgConnection, owner_id: Uuid) -> QueryResult<Folder> {
    ensure_year_folder(conn, owner_id, Utc::now().year())
}

pub fn load_folders(conn: &mut PgConnection, owner_id: Uuid) -> QueryResult<Vec<Folder>> {
    folders::table
        .filter(folders::owner_id.eq(owner_id))
        .load(conn)
}

pub fn build_tree(folders: &[Folder]) -> FolderTree {
    FolderTree::new(folders.iter().map(|folder| FolderNode {
        id: folder.id,
        name: folder.name.clone(),
        parent_id: folder.parent_id,
        kind: kind_of(folder),
    }))
}

/// Loads a folder only if `owner_id` owns it.
pub fn find_owned_folder(
    conn: &mut PgConnection,
    owner_id: Uuid,
    folder_id: Uuid,
) -> QueryResult<Option<Folder>> {
    folders::table
        .find(folder_id)
        .filter(folders::owner_id.eq(owner_id))
        .first(conn)
        .optional()
}
