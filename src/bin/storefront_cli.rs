use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use clothingstore_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::commerce::Cart,
    services::{accounts::AccountService, commerce::CouponService},
};
use sea_orm::EntityTrait;
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "storefront",
    about = "Maintenance commands for the clothing store database",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending database migrations
    Migrate,
    /// Apply a coupon code to a cart on behalf of its owner
    ApplyCoupon {
        /// Cart identifier
        cart_id: Uuid,
        /// Coupon code (case-insensitive)
        code: String,
    },
    /// Give an existing account access to the admin endpoints
    GrantAdmin {
        /// Account email
        email: String,
    },
}

struct CliContext {
    _config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            _config: config,
            db: Arc::new(db_pool),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::ApplyCoupon { cart_id, code } => {
            handle_apply_coupon(&context, cart_id, &code, cli.json).await?
        }
        Commands::GrantAdmin { email } => handle_grant_admin(&context, &email, cli.json).await?,
    }

    Ok(())
}

async fn handle_apply_coupon(
    context: &CliContext,
    cart_id: Uuid,
    code: &str,
    json: bool,
) -> Result<()> {
    let cart = Cart::find_by_id(cart_id)
        .one(&*context.db)
        .await
        .context("failed to load cart")?
        .ok_or_else(|| anyhow!("cart {} not found", cart_id))?;

    let service = CouponService::new(context.db.clone());
    let applied = service
        .apply(cart.user_id, code)
        .await
        .map_err(|e| anyhow!("{}", e))?;

    if json {
        print_json(&applied)?;
    } else {
        println!("{}", applied.message);
        println!(
            "Cart {} • subtotal {} • discount {} • total {}",
            applied.cart.id, applied.cart.subtotal, applied.cart.discount, applied.cart.total
        );
    }
    Ok(())
}

async fn handle_grant_admin(context: &CliContext, email: &str, json: bool) -> Result<()> {
    let service = AccountService::new(context.db.clone());
    let user = service
        .grant_admin(email)
        .await
        .map_err(|e| anyhow!("{}", e))?;

    if json {
        print_json(&serde_json::json!({
            "id": user.id,
            "email": user.email,
            "is_staff": user.is_staff,
        }))?;
    } else {
        println!("{} ({}) is now staff", user.email, user.id);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
