use anyhow::{anyhow, Context};
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ecm_core::prelude::*;
use ecm_core::{ChannelPropagator, IdentityError, InMemoryCaseStore};
use ecm_model::UserProfile;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolves the acting user from the token itself; stands in for the
/// identity service when running against a snapshot
#[derive(Debug)]
struct LocalIdentity {
    user: String,
}

#[async_trait]
impl IdentityResolver for LocalIdentity {
    async fn resolve(&self, auth: &AuthToken) -> Result<UserProfile, IdentityError> {
        if auth.expose().trim().is_empty() {
            return Err(IdentityError::InvalidToken);
        }
        Ok(UserProfile::new(
            format!("local:{}", self.user),
            format!("{}@localhost", self.user),
        ))
    }
}

fn cli() -> Command {
    let multiple_args = [
        Arg::new("snapshot")
            .long("snapshot")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("JSON store snapshot, rewritten after the run"),
        Arg::new("multiple")
            .long("multiple")
            .required(true)
            .help("Reference of the multiple to work on"),
        Arg::new("config")
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .help("Engine configuration (.toml, .yaml or .yml)"),
        Arg::new("token")
            .long("token")
            .default_value("local")
            .help("Auth token passed to the store"),
        Arg::new("user")
            .long("user")
            .default_value("ecm-cli")
            .help("Acting user name for persistent-queue workflows"),
        Arg::new("dry-run")
            .long("dry-run")
            .action(ArgAction::SetTrue)
            .help("Do not write the snapshot back"),
    ];

    Command::new("ecm")
        .version(ecm_core::VERSION)
        .about("Bulk synchronization for employment tribunal multiple cases")
        .subcommand_required(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("create")
                .about("Form a multiple from its requested case ids")
                .args(multiple_args.clone())
                .arg(
                    Arg::new("search-index")
                        .long("search-index")
                        .action(ArgAction::SetTrue)
                        .help("Retrieve candidates through the search index"),
                ),
        )
        .subcommand(
            Command::new("pre-accept")
                .about("Update singles ahead of acceptance")
                .args(multiple_args.clone())
                .arg(pq_arg()),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Recompute membership from live case state")
                .args(multiple_args.clone())
                .arg(pq_arg()),
        )
        .subcommand(
            Command::new("bulk-update")
                .about("Fan the staged bulk edit out to selected cases")
                .args(multiple_args),
        )
}

fn pq_arg() -> Arg {
    Arg::new("pq")
        .long("pq")
        .action(ArgAction::SetTrue)
        .help("Use the persistent-queue workflow")
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecm_core=info,ecm=info".into());
    let writer = std::io::stderr;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(writer)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(writer)))
        .init();
}

fn workflow(args: &ArgMatches) -> UpdateWorkflow {
    let pq = args.try_get_one::<bool>("pq").ok().flatten().copied().unwrap_or(false);
    if pq {
        UpdateWorkflow::PersistentQueue
    } else {
        UpdateWorkflow::Direct
    }
}

async fn run(command: &str, args: &ArgMatches) -> anyhow::Result<BulkResult> {
    let snapshot = args
        .get_one::<PathBuf>("snapshot")
        .ok_or_else(|| anyhow!("--snapshot is required"))?;
    let reference = args
        .get_one::<String>("multiple")
        .ok_or_else(|| anyhow!("--multiple is required"))?;
    let auth = AuthToken::new(args.get_one::<String>("token").cloned().unwrap_or_default());
    let user = args.get_one::<String>("user").cloned().unwrap_or_default();

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let store = Arc::new(
        InMemoryCaseStore::load(snapshot)
            .with_context(|| format!("loading snapshot {}", snapshot.display()))?,
    );
    let mut multiple = store
        .multiple(reference)
        .ok_or_else(|| EngineError::MultipleNotFound(reference.clone()))?;

    let (propagator, worker) =
        ChannelPropagator::spawn(store.clone(), auth.clone(), config.propagation_queue_capacity);
    let engine = BulkEngine::new(
        config,
        store.clone(),
        Arc::new(propagator),
        Arc::new(LocalIdentity { user }),
    )?;

    let result = match command {
        "create" => {
            let strategy = if args.get_flag("search-index") {
                RetrievalStrategy::BySearchIndex
            } else {
                RetrievalStrategy::ByIds
            };
            engine.create_multiple(&mut multiple, &auth, strategy).await?
        }
        "pre-accept" => engine.pre_accept(&mut multiple, &auth, workflow(args)).await?,
        "reconcile" => engine.reconcile(&mut multiple, &auth, workflow(args)).await,
        "bulk-update" => engine.bulk_update(&mut multiple, &auth).await?,
        other => return Err(anyhow!("unknown command: {other}")),
    };

    // closes the queue so the worker drains and stops
    drop(engine);
    let stats = worker.await.context("propagation worker panicked")?;
    tracing::info!(
        messages = stats.messages,
        applied = stats.applied,
        failed = stats.failed,
        "Propagation finished"
    );

    if args.get_flag("dry-run") {
        tracing::info!("Dry run, snapshot left unchanged");
    } else {
        store.save_multiple(multiple);
        store
            .save(snapshot)
            .with_context(|| format!("writing snapshot {}", snapshot.display()))?;
    }

    Ok(result)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("json-logs"));

    let (command, args) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no command given"))?;

    let result = run(command, args).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    std::process::exit(if result.is_finalizable() { 0 } else { 1 });
}
