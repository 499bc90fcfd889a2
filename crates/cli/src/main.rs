//! CoreWell CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse and fill the cart (works signed out)
//! corewell catalog
//! corewell cart add glow-boost
//! corewell cart update 0 -1
//!
//! # Sign in; the account's saved cart replaces the anonymous one
//! corewell auth register buyer@example.com 's3cret-pass' 's3cret-pass'
//! corewell auth login buyer@example.com 's3cret-pass'
//!
//! # Place an order
//! corewell checkout --fullname "Thandi Nkosi" --address "12 Long St, Cape Town"
//! ```
//!
//! State lives under `COREWELL_DATA_DIR` (default `.corewell`).

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use corewell_storefront::config::StorefrontConfig;
use corewell_storefront::error::AppError;
use corewell_storefront::state::AppState;
use corewell_storefront::telemetry::{init_sentry, init_tracing};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "corewell")]
#[command(author, version, about = "CoreWell storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Catalog,
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the signed-in account
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Place an order for the current cart
    Checkout {
        /// Recipient's full name
        #[arg(long)]
        fullname: String,

        /// Delivery address
        #[arg(long)]
        address: String,
    },
    /// Ask to stock the CoreWell range
    Stockist {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        company: String,

        #[arg(long)]
        message: String,
    },
    /// Subscribe the signed-in account to a plan
    Subscribe {
        /// Plan name (defaults to the general subscription)
        #[arg(long)]
        plan: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product id, e.g. `glow-boost`
        id: String,
    },
    /// Change a line's quantity by a delta; zero or below removes it
    Update {
        /// Zero-based line position
        index: usize,

        /// Quantity change, e.g. 1 or -1
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Remove a line regardless of quantity
    Remove {
        /// Zero-based line position
        index: usize,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account and sign in
    Register {
        email: String,
        password: String,
        confirm: String,
    },
    /// Sign in
    Login { email: String, password: String },
    /// Sign out (the cart stays on this machine)
    Logout,
    /// Show the signed-in account
    Whoami,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = StorefrontConfig::from_env();
    let log_format = config
        .as_ref()
        .map(|config| config.log_format)
        .unwrap_or_default();

    // Sentry first so the tracing layer has a client to report to
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    if let Err(e) = init_tracing(log_format) {
        eprintln!("failed to initialize logging: {e}");
    }

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let state = AppState::open(config)?;
    let worker = state.start_outbox_worker();
    let mut ctx = Context::new(state);

    let result = dispatch(cli.command, &mut ctx).await;

    ctx.finish().await;
    worker.abort();
    result
}

async fn dispatch(command: Commands, ctx: &mut Context) -> Result<(), AppError> {
    match command {
        Commands::Catalog => commands::catalog::list(ctx),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(ctx),
            CartAction::Add { id } => commands::cart::add(ctx, &id)?,
            CartAction::Update { index, delta } => commands::cart::update(ctx, index, delta)?,
            CartAction::Remove { index } => commands::cart::remove(ctx, index)?,
            CartAction::Clear => commands::cart::clear(ctx),
        },
        Commands::Auth { action } => match action {
            AuthAction::Register {
                email,
                password,
                confirm,
            } => commands::auth::register(ctx, &email, password, confirm).await?,
            AuthAction::Login { email, password } => {
                commands::auth::login(ctx, &email, password).await?;
            }
            AuthAction::Logout => commands::auth::logout(ctx).await?,
            AuthAction::Whoami => commands::auth::whoami(ctx),
        },
        Commands::Checkout { fullname, address } => {
            commands::orders::checkout(ctx, fullname, address).await?;
        }
        Commands::Stockist {
            name,
            email,
            company,
            message,
        } => commands::orders::stockist(ctx, name, email, company, message).await?,
        Commands::Subscribe { plan } => commands::orders::subscribe(ctx, plan.as_deref()).await?,
    }
    Ok(())
}
