use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use fieldscout_api::{ACCESS_TOKEN_ENV, ARM_BASE_ENV, ArmClient, DEFAULT_ARM_BASE, DEFAULT_SERVICE_HOST, SERVICE_HOST_ENV};
use fieldscout_engine::profiles::storage_mount::ACCESS_KEY;
use fieldscout_engine::{
    ArmCollaborators, DiscoverySession, FieldscoutConfig, FixtureCollaborators, FormProfile, SiteDescriptor, function_create_session,
    load_accounts, load_config_from_path, load_site, load_templates, storage_mount_session,
};
use fieldscout_types::FormSnapshot;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "fieldscout", version, about = "Selection-triggered discovery for resource forms")]
struct Cli {
    /// Configuration file; defaults to FIELDSCOUT_CONFIG_PATH or the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer every lookup from this JSON fixture instead of the management API.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Print credentials in the snapshot instead of redacting them.
    #[arg(long, global = true)]
    show_secrets: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Storage mount form: discover containers and file shares for storage accounts.
    Storage {
        /// JSON or YAML list of storage accounts.
        #[arg(long)]
        accounts: PathBuf,
        /// JSON or YAML site descriptor.
        #[arg(long)]
        site: Option<PathBuf>,
        /// Treat the site as a Linux site when no descriptor is given.
        #[arg(long)]
        linux: bool,
        /// Account to select; repeat to supersede earlier selections.
        #[arg(long = "account", required = true)]
        accounts_selected: Vec<String>,
        /// Field edit applied after discovery settled, as FIELD=VALUE.
        #[arg(long = "set", value_parser = parse_edit)]
        edits: Vec<(String, String)>,
    },
    /// Function creation form: discover the bindings a template prompts for.
    Template {
        /// JSON or YAML template catalog.
        #[arg(long)]
        templates: PathBuf,
        /// Function app the function is created in.
        #[arg(long)]
        resource_id: String,
        /// Template to select; repeat to supersede earlier selections.
        #[arg(long = "template", required = true)]
        templates_selected: Vec<String>,
        /// Field edit applied after discovery settled, as FIELD=VALUE.
        #[arg(long = "set", value_parser = parse_edit)]
        edits: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_from_path(path).with_context(|| format!("load config {}", path.display()))?,
        None => FieldscoutConfig::load().context("load config")?,
    };

    let snapshot = match &cli.command {
        Command::Storage {
            accounts,
            site,
            linux,
            accounts_selected,
            edits,
        } => {
            let accounts = load_accounts(accounts)?;
            let site = match site {
                Some(path) => load_site(path)?,
                None => SiteDescriptor {
                    is_linux: *linux,
                    ..SiteDescriptor::default()
                },
            };
            match &cli.fixture {
                Some(path) => {
                    let collaborators = Arc::new(FixtureCollaborators::load(path)?);
                    drive(storage_mount_session(&config, &site, accounts, collaborators), accounts_selected, edits).await?
                }
                None => {
                    let collaborators = Arc::new(arm_collaborators(&config)?);
                    drive(storage_mount_session(&config, &site, accounts, collaborators), accounts_selected, edits).await?
                }
            }
        }
        Command::Template {
            templates,
            resource_id,
            templates_selected,
            edits,
        } => {
            let templates = load_templates(templates)?;
            match &cli.fixture {
                Some(path) => {
                    let collaborators = Arc::new(FixtureCollaborators::load(path)?);
                    drive(
                        function_create_session(&config, resource_id, templates, collaborators),
                        templates_selected,
                        edits,
                    )
                    .await?
                }
                None => {
                    let collaborators = Arc::new(arm_collaborators(&config)?);
                    drive(
                        function_create_session(&config, resource_id, templates, collaborators),
                        templates_selected,
                        edits,
                    )
                    .await?
                }
            }
        }
    };

    let snapshot = if cli.show_secrets { snapshot } else { redact_snapshot(snapshot) };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn init_tracing() {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Management API collaborators; config file values win over the environment.
fn arm_collaborators(config: &FieldscoutConfig) -> Result<ArmCollaborators> {
    let base_url = config
        .arm_base
        .clone()
        .or_else(|| env::var(ARM_BASE_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ARM_BASE.into());
    let service_host = config
        .service_host
        .clone()
        .or_else(|| env::var(SERVICE_HOST_ENV).ok())
        .unwrap_or_else(|| DEFAULT_SERVICE_HOST.into());
    let token = env::var(ACCESS_TOKEN_ENV).ok().filter(|token| !token.trim().is_empty());
    if token.is_none() {
        debug!("{ACCESS_TOKEN_ENV} is not set; requests go out unauthenticated");
    }
    let client = ArmClient::new(base_url, service_host, token)?;
    Ok(ArmCollaborators::new(client))
}

/// Select each key in order, wait for the last generation, then apply edits.
async fn drive<P: FormProfile>(
    mut session: DiscoverySession<P>,
    selections: &[String],
    edits: &[(String, String)],
) -> Result<FormSnapshot> {
    for key in selections {
        let outcome = session.select(key.as_str());
        debug!(selection = %key, generation = outcome.tag().generation, "selected");
    }
    session.settle().await;
    if let Some(tag) = session.current_tag() {
        info!(selection = %tag.key, generation = tag.generation, "discovery settled");
    }

    for (field, value) in edits {
        session
            .set_value(field, Some(value.clone()))
            .with_context(|| format!("apply --set {field}"))?;
    }
    Ok(session.snapshot())
}

fn parse_edit(raw: &str) -> Result<(String, String)> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{raw}'"))?;
    if field.trim().is_empty() {
        return Err(anyhow!("field name is empty in '{raw}'"));
    }
    Ok((field.trim().to_string(), value.to_string()))
}

fn redact_snapshot(mut snapshot: FormSnapshot) -> FormSnapshot {
    if let Some(value) = snapshot.field_values.get_mut(ACCESS_KEY) {
        *value = "<redacted>".into();
    }
    for error in snapshot.field_errors.values_mut() {
        *error = fieldscout_util::redact_sensitive(error);
    }
    if let Some(message) = snapshot.banner.message.as_mut() {
        *message = fieldscout_util::redact_sensitive(message);
    }
    snapshot
}
