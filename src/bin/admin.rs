//! CLI administration tool for quicklink.
//!
//! Manages API tokens, shows totals, and runs maintenance jobs against the
//! same database (and cache) as the server.
//!
//! # Usage
//!
//! ```bash
//! # Create a token; --admin allows deleting any link
//! cargo run --bin admin -- token create --name "CI" --admin
//!
//! # List / revoke tokens
//! cargo run --bin admin -- token list
//! cargo run --bin admin -- token revoke "CI"
//!
//! # Totals
//! cargo run --bin admin -- stats
//!
//! # Remove expired links now instead of waiting for the server's job
//! cargo run --bin admin -- cleanup
//!
//! # Database diagnostics
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `quicklink::config`). `DATABASE_URL` and
//! `TOKEN_SIGNING_SECRET` are required; the secret must match the server's or
//! issued tokens will not verify.

use quicklink::application::services::{AuthService, UrlService, UrlServiceSettings};
use quicklink::config::{self, Config};
use quicklink::domain::authorization::OwnershipPolicy;
use quicklink::domain::repositories::TokenRepository;
use quicklink::infrastructure::cache::{CacheService, NullCache, RedisCache};
use quicklink::infrastructure::persistence::{
    PgClickRepository, PgShortUrlRepository, PgTokenRepository,
};
use quicklink::utils::slug_generator::RandomSlugGenerator;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// CLI tool for managing quicklink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Show link, click and token totals
    Stats,

    /// Delete expired links and evict them from the cache
    Cleanup,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Create a new API token
    Create {
        /// Token name (e.g., "Production API", "Mobile App")
        #[arg(short, long)]
        name: Option<String>,

        /// Custom token value (optional, auto-generated if not provided)
        #[arg(short, long)]
        token: Option<String>,

        /// Grant admin rights (delete any link)
        #[arg(long)]
        admin: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List all tokens
    List,

    /// Revoke a token
    Revoke {
        /// Token name or ID to revoke
        name_or_id: String,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Token { action } => handle_token_action(action, &pool, &config).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Cleanup => handle_cleanup(&pool, &config).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    pool.close().await;
    Ok(())
}

async fn handle_token_action(action: TokenAction, pool: &PgPool, config: &Config) -> Result<()> {
    let repo = Arc::new(PgTokenRepository::new(Arc::new(pool.clone())));

    match action {
        TokenAction::Create {
            name,
            token,
            admin,
            yes,
        } => {
            let auth = AuthService::new(repo, config.token_signing_secret.clone());
            create_token(&auth, name, token, admin, yes, &config.public_base_url).await?;
        }
        TokenAction::List => list_tokens(repo.as_ref()).await?,
        TokenAction::Revoke { name_or_id } => revoke_token(repo.as_ref(), &name_or_id).await?,
    }

    Ok(())
}

/// Creates a token after showing it once.
///
/// Only the HMAC of the raw value is stored, so it cannot be shown again.
async fn create_token(
    auth: &AuthService,
    name: Option<String>,
    token: Option<String>,
    is_admin: bool,
    skip_confirm: bool,
    base_url: &str,
) -> Result<()> {
    println!("{}", "Create API Token".bright_blue().bold());
    println!();

    let token_name = match name {
        Some(n) => n,
        None => Input::new()
            .with_prompt("Token name")
            .with_initial_text("Production API")
            .interact_text()?,
    };

    let token_value = match token {
        Some(t) => {
            println!("{}", "Using provided token value".yellow());
            t
        }
        None => generate_token(),
    };

    println!();
    println!("{}", "Token details:".bright_white().bold());
    println!("  Name:  {}", token_name.cyan());
    println!(
        "  Role:  {}",
        if is_admin {
            "admin".red().bold()
        } else {
            "standard".normal()
        }
    );
    println!("  Token: {}", token_value.bright_yellow().bold());
    println!();
    println!(
        "{}",
        "Save this token now. It cannot be shown again.".red().bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this token?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let created = auth
        .create_token(&token_name, &token_value, is_admin)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create token: {}", e))?;

    println!(
        "{} (id {})",
        "Token created".green().bold(),
        created.id.to_string().bright_black()
    );
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"Authorization: Bearer {}\" {}/api/v1/urls",
        token_value.bright_yellow(),
        base_url.trim_end_matches('/')
    );
    println!();

    Ok(())
}

async fn list_tokens(repo: &dyn TokenRepository) -> Result<()> {
    let tokens = repo
        .list_tokens()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list tokens: {}", e))?;

    if tokens.is_empty() {
        println!("{}", "  No tokens found".yellow());
        println!(
            "  Create one with: {} admin token create",
            "cargo run --bin".bright_cyan()
        );
        return Ok(());
    }

    println!(
        "  {:<5} {:<28} {:<8} {:<17} {:<17} {:<8}",
        "ID".bright_white().bold(),
        "Name".bright_white().bold(),
        "Role".bright_white().bold(),
        "Created".bright_white().bold(),
        "Last used".bright_white().bold(),
        "Status".bright_white().bold()
    );
    println!("  {}", "-".repeat(88).bright_black());

    for token in &tokens {
        let status = if token.revoked_at.is_some() {
            "REVOKED".red()
        } else {
            "ACTIVE".green()
        };
        let role = if token.is_admin { "admin" } else { "standard" };
        let last_used = token
            .last_used_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {:<5} {:<28} {:<8} {:<17} {:<17} {}",
            token.id.to_string().bright_black(),
            token.name.cyan(),
            role,
            token.created_at.format("%Y-%m-%d %H:%M").to_string(),
            last_used.bright_black(),
            status
        );
    }

    println!();
    println!("  Total: {}", tokens.len().to_string().bright_white().bold());

    Ok(())
}

/// Revokes a token by numeric ID or exact name, after confirmation.
async fn revoke_token(repo: &dyn TokenRepository, name_or_id: &str) -> Result<()> {
    let token = match name_or_id.parse::<i64>() {
        Ok(id) => repo.find_by_id(id).await,
        Err(_) => repo.find_by_name(name_or_id).await,
    }
    .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
    .context("Token not found")?;

    if token.revoked_at.is_some() {
        println!("{}", "This token is already revoked".yellow());
        return Ok(());
    }

    println!("  Token: {}", token.name.cyan());
    println!("  ID:    {}", token.id.to_string().bright_black());
    println!();

    let confirmed = Confirm::new()
        .with_prompt("Revoke this token?")
        .default(false)
        .interact()?;

    if !confirmed {
        println!("{}", "Cancelled".red());
        return Ok(());
    }

    repo.revoke_token(token.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to revoke token: {}", e))?;

    println!("{}", "Token revoked".green().bold());

    Ok(())
}

async fn handle_stats(pool: &PgPool) -> Result<()> {
    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_urls")
        .fetch_one(pool)
        .await?;

    let expired: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM short_urls WHERE expires_at IS NOT NULL AND expires_at <= NOW()",
    )
    .fetch_one(pool)
    .await?;

    let clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks")
        .fetch_one(pool)
        .await?;

    let tokens: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_tokens WHERE revoked_at IS NULL")
            .fetch_one(pool)
            .await?;

    println!("{}", "Statistics".bright_blue().bold());
    println!();
    println!("  Links:         {}", links.to_string().bright_green().bold());
    println!("  Expired:       {}", expired.to_string().yellow());
    println!("  Clicks:        {}", clicks.to_string().bright_green().bold());
    println!("  Active tokens: {}", tokens.to_string().bright_green().bold());

    Ok(())
}

/// Runs one expired-link purge through [`UrlService`], so cached entries are
/// evicted exactly as the server's periodic job does.
async fn handle_cleanup(pool: &PgPool, config: &Config) -> Result<()> {
    let cache: Arc<dyn CacheService> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisCache::connect(url, Duration::from_millis(config.cache_timeout_ms))
                .await
                .context("Failed to connect to Redis")?,
        ),
        // An in-process cache lives in the server; nothing to evict from here.
        None => Arc::new(NullCache::new()),
    };

    let pool = Arc::new(pool.clone());
    let service = UrlService::new(
        Arc::new(PgShortUrlRepository::new(pool.clone())),
        Arc::new(PgClickRepository::new(pool)),
        cache,
        Arc::new(RandomSlugGenerator),
        Arc::new(OwnershipPolicy),
        UrlServiceSettings::from(config),
    );

    let removed = service
        .purge_expired()
        .await
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {}", e))?;

    println!(
        "{} {} expired link(s)",
        "Removed".green().bold(),
        removed.to_string().bright_white().bold()
    );

    Ok(())
}

async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let migrations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
                .fetch_one(pool)
                .await
                .unwrap_or(0);

            println!("{}", "Database Information".bright_blue().bold());
            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Migrations: {}", migrations.to_string().bright_white());
        }
    }

    Ok(())
}

/// Generates a 48-character alphanumeric token (~286 bits of entropy).
fn generate_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const TOKEN_LEN: usize = 48;

    let mut rng = rand::rng();

    (0..TOKEN_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
