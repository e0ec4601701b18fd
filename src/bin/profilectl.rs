//! profilectl: command line client for the profile service
//!
//! ```text
//! profilectl --consul http://localhost:8500 --tag prod get --id 001
//! profilectl --config client.toml create --file profile.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use profilesvc_client::{
    BackendType, CallContext, ClientBuilder, ClientConfig, HttpOperationFactory, Profile,
    ProfileClient, ProfileService, RegistryFactory, logging,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "profilectl", version, about = "Profile service client")]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Consul HTTP address
    #[arg(long)]
    consul: Option<String>,

    /// Static instance addresses (skips Consul)
    #[arg(long = "instance")]
    instances: Vec<String>,

    /// Service name registered in Consul
    #[arg(long)]
    service: Option<String>,

    /// Required instance tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Accept instances regardless of tags
    #[arg(long, conflicts_with = "tags")]
    any_tag: bool,

    /// Only use instances whose health checks pass
    #[arg(long)]
    passing_only: Option<bool>,

    /// Maximum attempts per call
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a profile by id
    Get {
        #[arg(long, default_value = "001")]
        id: String,
    },
    /// Create a profile from a JSON file
    Create {
        #[arg(long)]
        file: PathBuf,
    },
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(consul) = &self.consul {
            config.registry.backend = BackendType::Consul;
            config.registry.consul.url = consul.clone();
        }
        if !self.instances.is_empty() {
            config.registry.backend = BackendType::Static;
            config.registry.addresses = self.instances.clone();
        }
        if let Some(service) = &self.service {
            config.service.name = service.clone();
        }
        if self.any_tag {
            config.service.tags.clear();
        } else if !self.tags.is_empty() {
            config.service.tags = self.tags.clone();
        }
        if let Some(passing_only) = self.passing_only {
            config.service.passing_only = passing_only;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.retry.timeout_ms = timeout_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if logging::init_tracing("profilectl=info,profilesvc_client=info", cli.json_logs).is_err() {
        eprintln!("tracing subscriber already initialized");
    }

    let config = cli.client_config()?;
    info!(
        service = %config.service.name,
        backend = ?config.registry.backend,
        tags = ?config.service.tags,
        "Connecting to profile service"
    );

    let registry = RegistryFactory::create(&config.registry, &config.service)?;
    let factory = Arc::new(HttpOperationFactory::new()?);
    let client = ProfileClient::connect(
        ClientBuilder::from_config(&config),
        registry.as_ref(),
        factory,
    )
    .await
    .context("building profile client")?;

    // Ctrl-C 取消正在进行的调用
    let cancel = CancellationToken::new();
    let ctx = CallContext::from_token(cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            cancel.cancel();
        }
    });

    let result = run(&client, &ctx, &cli.command).await;
    client.shutdown().await;
    result
}

async fn run(client: &ProfileClient, ctx: &CallContext, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Get { id } => {
            let profile = client.get_profile(ctx, id).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Create { file } => {
            let contents = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let profile: Profile = serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", file.display()))?;
            let id = profile.id.clone();
            client.post_profile(ctx, profile).await?;
            info!(id = %id, "Profile created");
        }
    }
    Ok(())
}
