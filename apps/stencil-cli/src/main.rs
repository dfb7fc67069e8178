//! # Stencil CLI
//!
//! Reads products and platform pages through the context-aware clients.
//!
//! ```text
//! stencil [--config PATH] products list [--search S] [--page N] [--per-page N] [--tenant ID]
//! stencil [--config PATH] products get <ID-OR-SLUG> [--public-fallback]
//! stencil [--config PATH] content <SLUG>
//! ```
//!
//! The identity is taken from the environment:
//!
//! | Variable               | Meaning                                   |
//! |------------------------|-------------------------------------------|
//! | `STENCIL_ACCOUNT_TYPE` | `anonymous` (default), `tenant`, `platform` |
//! | `STENCIL_TOKEN`        | Bearer token, required unless anonymous   |
//! | `STENCIL_TENANT_ID`    | Active tenant for tenant accounts         |
//! | `STENCIL_TENANT_SLUG`  | Optional tenant slug                      |
//! | `STENCIL_USER_ID`      | Optional user id                          |

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use stencil_client::{create_product_service, ApiClients, ApiError, ClientConfig, StaticBoundary};
use stencil_core::product::ProductQuery;
use stencil_core::{MemorySession, SessionState, TenantInfo, UserType};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(author, version, about = "Stencil command-line client", long_about = None)]
struct Cli {
    /// Config file (defaults to stencil.toml in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },

    /// Platform page content (home, about, faq, contact, products)
    Content {
        slug: String,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products visible to the current identity
    List {
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,

        /// Tenant filter (platform accounts; tenant accounts may only name their own)
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Show one product by UUID or slug
    Get {
        id_or_slug: String,

        /// Retry slug lookups against the public catalog when not found
        #[arg(long)]
        public_fallback: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<ApiError>() {
                Some(api) => eprintln!("error [{:?}]: {}", api.kind, api.message),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = ClientConfig::load(cli.config).context("Failed to load configuration")?;
    let (session, user_type) = session_from_env(&config.demo.token_prefix)?;
    info!(user_type = %user_type, base_url = %config.api.base_url, "Stencil CLI starting");

    let clients = Arc::new(ApiClients::new(
        &config,
        Arc::new(session),
        Arc::new(StaticBoundary::new(false)),
    )?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling request");
            on_interrupt.cancel();
        }
    });

    let output = match cli.command {
        Commands::Products { action } => {
            let products = create_product_service(clients, user_type);
            match action {
                ProductsAction::List {
                    search,
                    page,
                    per_page,
                    tenant,
                } => {
                    let query = ProductQuery {
                        search,
                        page,
                        per_page,
                        tenant_id: tenant,
                        ..Default::default()
                    };
                    serde_json::to_value(products.list(&query, Some(&cancel)).await?)?
                }
                ProductsAction::Get {
                    id_or_slug,
                    public_fallback,
                } => {
                    let product = if public_fallback {
                        products
                            .get_by_slug_or_public(&id_or_slug, Some(&cancel))
                            .await?
                    } else {
                        products.get_by_id(&id_or_slug, Some(&cancel)).await?
                    };
                    serde_json::to_value(product)?
                }
            }
        }
        Commands::Content { slug } => {
            clients
                .anonymous()
                .platform_content(&slug, Some(&cancel))
                .await?
        }
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

// =============================================================================
// Session from environment
// =============================================================================

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn session_from_env(demo_prefix: &str) -> anyhow::Result<(MemorySession, UserType)> {
    let session = MemorySession::new(demo_prefix);
    let user_type = match env_value("STENCIL_ACCOUNT_TYPE") {
        Some(value) => value.parse::<UserType>()?,
        None => UserType::Anonymous,
    };
    if user_type == UserType::Anonymous {
        return Ok((session, user_type));
    }

    let Some(token) = env_value("STENCIL_TOKEN") else {
        bail!("STENCIL_TOKEN must be set for {user_type} accounts");
    };
    let tenant = env_value("STENCIL_TENANT_ID").map(|id| {
        TenantInfo::new(id, env_value("STENCIL_TENANT_SLUG").unwrap_or_default())
    });

    session.sign_in(SessionState {
        token: Some(token),
        account_type: Some(user_type),
        tenant,
        user_id: env_value("STENCIL_USER_ID"),
    });
    Ok((session, user_type))
}
