//! One-shot command that inserts a user with a hashed password.
//!
//! ```text
//! seed_user --username mohon --email mohon@example.com --password abcd1234
//! ```

use anyhow::Context;
use clap::Parser;
use userbase::{
    config::DEFAULT_DATABASE_URL,
    db,
    users::services::create_user,
};

#[derive(Debug, Parser)]
#[command(name = "seed_user", about = "Insert a user with a hashed password")]
struct Args {
    #[arg(long)]
    username: String,

    #[arg(long)]
    email: String,

    /// Plaintext password; hashed before it is stored.
    #[arg(long, env = "SEED_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "userbase=info".to_string()),
        )
        .init();

    let args = Args::parse();

    let pool = db::connect(&args.database_url).await?;
    db::migrate(&pool).await?;

    let user = create_user(&pool, &args.username, &args.email, Some(&args.password), true)
        .await
        .with_context(|| format!("seed user {}", args.email))?;

    tracing::info!(user_id = user.id, username = %user.username, "user created");
    println!("User created successfully! id={}", user.id);
    Ok(())
}
