use anyhow::{bail, ensure, Context, Result};
use diesel::{dsl::exists, pg::PgConnection, prelude::*};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::domain::box_id;
use crate::models::{NewUser, User};
use crate::schema::users;
use crate::workspace::ensure_root_folder;

const BOX_ID_ATTEMPTS: usize = 16;
pub const DEFAULT_ROLE: &str = "artist";

pub struct NewAccount<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role: &'a str,
    pub display_name: Option<&'a str>,
}

/// Creates a user with a fresh BOX ID and provisions their root folder.
pub fn create_account(conn: &mut PgConnection, account: NewAccount<'_>) -> Result<User> {
    let username = account.username.trim();
    ensure!(!username.is_empty(), "username must not be empty");
    ensure!(!account.password.is_empty(), "password must not be empty");
    let password_hash = hash_password(account.password)?;

    conn.transaction::<User, anyhow::Error, _>(|conn| {
        let taken: bool = diesel::select(exists(users::table.filter(users::username.eq(username))))
            .get_result(conn)?;
        if taken {
            bail!("username {username} is already taken");
        }

        let mut rng = rand::thread_rng();
        for _ in 0..BOX_ID_ATTEMPTS {
            let candidate = box_id::generate(&mut rng);
            let collision: bool =
                diesel::select(exists(users::table.filter(users::box_id.eq(&candidate))))
                    .get_result(conn)?;
            if collision {
                continue;
            }

            let new_user = NewUser {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password_hash: password_hash.clone(),
                role: account.role.to_string(),
                box_id: candidate,
                display_name: account
                    .display_name
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            };
            diesel::insert_into(users::table)
                .values(&new_user)
                .execute(conn)
                .context("failed to insert user")?;
            ensure_root_folder(conn, new_user.id).context("failed to create root folder")?;

            let user: User = users::table.find(new_user.id).first(conn)?;
            return Ok(user);
        }

        bail!("could not allocate a unique BOX ID")
    })
}
