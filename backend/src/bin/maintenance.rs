use std::env;

use anyhow::{Context, Result};
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;

use backend::{
    accounts::{create_account, NewAccount, DEFAULT_ROLE},
    config::AppConfig,
    db,
    domain::collaboration::CollaborationStatus,
    schema::collaborations,
    utils::time::now_naive,
};

const USAGE: &str = "Usage:\n  maintenance create-user <username> <password> [role]\n  maintenance purge-expired-invitations";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("create-user") => {
            let (Some(username), Some(password)) = (args.get(1), args.get(2)) else {
                eprintln!("{USAGE}");
                std::process::exit(1);
            };
            let role = args.get(3).map(String::as_str).unwrap_or(DEFAULT_ROLE);
            create_user(username, password, role)?;
        }
        Some("purge-expired-invitations") => purge_expired_invitations()?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<db::PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded backend configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;
    Ok(pool)
}

fn create_user(username: &str, password: &str, role: &str) -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let user = create_account(
        &mut conn,
        NewAccount {
            username,
            password,
            role,
            display_name: None,
        },
    )?;

    println!("Created user {} ({}) with BOX ID {}", user.username, user.id, user.box_id);
    Ok(())
}

fn purge_expired_invitations() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let purged = diesel::delete(
        collaborations::table
            .filter(collaborations::status.eq(CollaborationStatus::Pending.as_str()))
            .filter(collaborations::expires_at.le(now_naive())),
    )
    .execute(&mut conn)
    .context("failed to purge expired invitations")?;

    tracing::info!(purged, "purged expired invitations");
    println!("Purged {purged} expired invitations.");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
