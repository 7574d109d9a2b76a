//! tshop CLI - Database migrations and catalog management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront and session store migrations
//! tshop-cli migrate
//!
//! # Load categories and products from YAML
//! tshop-cli seed crates/cli/seed/catalog.yaml --clear
//!
//! # Add catalog entries one at a time
//! tshop-cli category add --name "Wood Lacquers"
//! tshop-cli product add --name "Clear Satin" --price 14.50 --category wood-lacquers
//!
//! # Create an account (password read from TSHOP_USER_PASSWORD)
//! tshop-cli user add --username alice
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tshop-cli")]
#[command(author, version, about = "tshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the YAML catalog file
        file: String,

        /// Delete all products and categories first
        #[arg(long)]
        clear: bool,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Create a category
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// URL slug (derived from the name when omitted)
        #[arg(short, long)]
        slug: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create a product
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price, e.g. 12.50
        #[arg(short, long)]
        price: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Units in stock
        #[arg(long, default_value_t = 0)]
        stock: u32,

        /// Category slug
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account
    Add {
        #[arg(short, long)]
        username: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => commands::seed::run(&file, clear).await?,
        Commands::Category { action } => match action {
            CategoryAction::Add { name, slug } => {
                commands::catalog::add_category(&name, slug.as_deref()).await?;
            }
        },
        Commands::Product { action } => match action {
            ProductAction::Add {
                name,
                price,
                description,
                stock,
                category,
            } => {
                commands::catalog::add_product(
                    &name,
                    &price,
                    &description,
                    stock,
                    category.as_deref(),
                )
                .await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Add { username } => commands::user::add(&username).await?,
        },
    }
    Ok(())
}
