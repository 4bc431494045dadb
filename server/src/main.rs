mod config;
mod graphql;
mod http;
mod profiles;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use platform_authz::{
    Action, PermissionSummary, PolicyEngine, Resource, RoleConfig, RouteRegistry, Subject,
};
use platform_obs::{ObsConfig, init_tracing};
use tracing::info;

use crate::{
    config::AppConfig,
    graphql::GraphqlData,
    http::{AppState, ServeConfig},
    profiles::{MemoryProfileStore, ProfileStore},
};

#[derive(Parser, Debug)]
#[command(name = "portal-server", version, about = "Portal authorization service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Print everything a role configuration grants.
    Explain(ExplainCommand),
    /// Evaluate one admin route against a role configuration.
    #[command(name = "check-route")]
    CheckRoute(CheckRouteCommand),
    /// Print the GraphQL schema in SDL form.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[derive(Args, Debug)]
struct ExplainCommand {
    #[arg(long, value_name = "FILE", help = "JSON file holding one role configuration")]
    role_config: PathBuf,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    sector: Option<String>,
}

#[derive(Args, Debug)]
struct CheckRouteCommand {
    #[arg(long, value_name = "FILE", help = "JSON file holding one role configuration")]
    role_config: PathBuf,
    route: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env()?)?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, Arc::new(AppConfig::load()?)).await,
        Command::Explain(cmd) => explain(cmd),
        Command::CheckRoute(cmd) => check_route(cmd),
        Command::SchemaPrint { output } => schema_print(output),
    }
}

fn read_role_config(path: &Path) -> Result<RoleConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    RoleConfig::from_json(&raw)
        .with_context(|| format!("invalid role configuration in {}", path.display()))
}

fn explain(cmd: ExplainCommand) -> Result<()> {
    let cfg = read_role_config(&cmd.role_config)?;
    let subject = Subject::new(Some(&cfg), cmd.user.as_deref(), cmd.sector.as_deref());
    let summary = PermissionSummary::resolve(&subject, &RouteRegistry::portal());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn check_route(cmd: CheckRouteCommand) -> Result<()> {
    let cfg = read_role_config(&cmd.role_config)?;
    let decision = PolicyEngine.evaluate(
        &Subject::from_config(&cfg),
        &Resource::AdminRoute(&cmd.route),
        Action::View,
    );
    println!("{}", serde_json::to_string(&decision)?);
    decision
        .ensure(Action::View.as_str(), cmd.route.as_str())
        .context("admin route check failed")?;
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let schema = graphql::build_schema(GraphqlData {
        registry: Arc::new(RouteRegistry::portal()),
        form_listing: Default::default(),
    });
    let sdl = schema.sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => print!("{sdl}"),
    }
    Ok(())
}

fn load_profiles(config: &AppConfig) -> Result<Arc<dyn ProfileStore>> {
    let store = match &config.profiles_path {
        Some(path) => MemoryProfileStore::load(path)?,
        None => {
            tracing::warn!(
                "PORTAL_PROFILES_PATH not set; every caller is treated as unprovisioned"
            );
            MemoryProfileStore::default()
        }
    };
    Ok(Arc::new(store))
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let profiles = load_profiles(&config)?;
    let registry = Arc::new(RouteRegistry::portal());
    let schema = graphql::build_schema(GraphqlData {
        registry: registry.clone(),
        form_listing: config.form_listing,
    });
    info!(
        listing = %config.form_listing,
        routes = registry.len(),
        "policy engine ready"
    );
    let state = AppState {
        schema,
        config,
        profiles,
        registry,
    };
    http::serve(cmd.into(), state).await
}
