mod cli;
mod error;

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use mediaconv::config::Config;
use mediaconv::db::{item_repo, job_repo};
use mediaconv::source::{RegistrationRequest, YoutubeDataApi};
use mediaconv::{
    delete_item, load_config, locate_artifact, register_item, CookieStore, CredentialPayload,
    CredentialStager, Database, Dispatcher, ItemId, ProcessConverter, Variant,
};

use crate::cli::{Args, Commands, CookieArgs, CookiesCommand, TargetArgs};
use crate::error::{CliError, Result};

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Error: failed to initialise logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only JSON results.
fn init_logging(level: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args.config)?;
    log::debug!("Loaded config from {}", args.config.display());

    match args.command {
        Commands::Register { url, owner, ip } => register(&config, &url, owner, &ip),
        Commands::Items => {
            let db = open_database(&config)?;
            print_json(&item_repo::list(&db)?)
        }
        Commands::Formats { item, credentials } => formats(&config, &item, &credentials),
        Commands::Convert {
            item,
            target,
            credentials,
        } => convert(&config, &item, &target, &credentials),
        Commands::Status { item } => {
            let db = open_database(&config)?;
            let item_id = ItemId::new(item)?;
            print_json(&job_repo::list_by_item(&db, &item_id)?)
        }
        Commands::Locate { item, variant } => {
            let db = open_database(&config)?;
            let location = locate_artifact(&db, &ItemId::new(item)?, &Variant::new(variant)?)?;
            print_json(&location)
        }
        Commands::Delete { item } => {
            let db = open_database(&config)?;
            print_json(&delete_item(&db, &ItemId::new(item)?)?)
        }
        Commands::Cookies(command) => cookies(&config, command),
    }
}

fn open_database(config: &Config) -> Result<Database> {
    Ok(Database::open(&config.database_path)?)
}

fn build_dispatcher(config: &Config, db: Database) -> Result<Dispatcher> {
    let converter = Arc::new(ProcessConverter::from_config(&config.converter));
    let stager = CredentialStager::new(config.credentials.staging_dir())
        .with_fallback(config.credentials.stored_cookies_path.clone());
    Ok(Dispatcher::new(
        db,
        converter,
        &config.storage_root,
        stager,
        config.worker_count,
    )?)
}

fn read_payload(credentials: &CookieArgs) -> Result<Option<CredentialPayload>> {
    credentials
        .cookies
        .as_deref()
        .map(|path| {
            std::fs::read(path)
                .map(CredentialPayload::from)
                .map_err(|e| CliError::ReadFile {
                    path: path.to_path_buf(),
                    source: e,
                })
        })
        .transpose()
}

fn register(config: &Config, url: &str, owner: Option<i64>, ip: &str) -> Result<()> {
    let db = open_database(config)?;
    let metadata = YoutubeDataApi::from_config(&config.metadata)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let registration = runtime.block_on(register_item(
        &db,
        &metadata,
        RegistrationRequest {
            url,
            owner_id: owner,
            requested_by_ip: ip,
        },
    ))?;
    print_json(&registration)
}

fn formats(config: &Config, item: &str, credentials: &CookieArgs) -> Result<()> {
    let item_id = ItemId::new(item)?;
    let payload = read_payload(credentials)?;
    let dispatcher = build_dispatcher(config, open_database(config)?)?;

    let result = dispatcher.probe_variants(&item_id, payload.as_ref());
    dispatcher.join();
    print_json(&result?)
}

fn convert(
    config: &Config,
    item: &str,
    target: &TargetArgs,
    credentials: &CookieArgs,
) -> Result<()> {
    let item_id = ItemId::new(item)?;
    let variant = match (&target.resolution, target.audio) {
        (_, true) => Variant::audio(),
        (Some(resolution), false) => Variant::new(resolution)?,
        (None, false) => {
            return Err(CliError::Usage(
                "either --resolution or --audio is required".to_string(),
            ))
        }
    };
    let payload = read_payload(credentials)?;

    let dispatcher = build_dispatcher(config, open_database(config)?)?;
    let outcome = dispatcher.dispatch(&item_id, &variant, payload.as_ref());
    // Let accepted work finish before the process exits.
    let db = dispatcher.database().clone();
    dispatcher.join();

    print_json(&outcome?)?;
    if let Some(job) = job_repo::find(&db, &item_id, &variant)? {
        print_json(&job)?;
    }
    Ok(())
}

fn cookies(config: &Config, command: CookiesCommand) -> Result<()> {
    let path = config
        .credentials
        .stored_cookies_path
        .as_deref()
        .ok_or_else(|| {
            CliError::Usage("credentials.stored_cookies_path is not configured".to_string())
        })?;
    let store = CookieStore::new(path);

    match command {
        CookiesCommand::Upload { file } => {
            let bytes = std::fs::read(&file).map_err(|e| CliError::ReadFile {
                path: file.clone(),
                source: e,
            })?;
            print_json(&store.upload(&file_name(&file), &bytes)?)
        }
        CookiesCommand::Info => print_json(&store.info()?),
        CookiesCommand::Remove => {
            store.remove()?;
            print_json(&serde_json::json!({ "removed": true }))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
