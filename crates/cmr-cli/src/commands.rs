use anyhow::Context;
use cmr_server::{CmrServer, ResolverService, ServerConfig};
use cmr_store::open_store;
use cmr_types::{AssetRefs, ComponentRecord, RecordState};
use colored::Colorize;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = effective_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Resolve(args) => cmd_resolve(&build_service(&config)?, &args, &format).await,
        Command::Register(args) => {
            cmd_register(&build_service(&config)?, args, &format).await.map(|_| ())
        }
        Command::List(args) => cmd_list(&build_service(&config)?, &args, &format).await,
        Command::Clear(args) => cmd_clear(&build_service(&config)?, &config, &args).await,
        Command::Check(args) => cmd_check(&config, &args),
    }
}

/// Config file and environment, then command-line overrides.
fn effective_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(store) = &cli.store {
        config.store_uri = store.clone();
    }
    if let Some(max) = cli.max_supply {
        config.max_component_supply = max;
    }
    Ok(config)
}

fn build_service(config: &ServerConfig) -> anyhow::Result<ResolverService> {
    if config.store_uri.starts_with("memory") {
        tracing::warn!("using an in-memory store; records will not outlive this command");
    }
    let store = open_store(&config.store_uri, config.sync_mode())
        .with_context(|| format!("opening store {}", config.store_uri))?;
    Ok(ResolverService::new(store)
        .with_validator(config.validator())
        .with_retry(config.retry_policy())
        .with_register_policy(config.register_policy()))
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    config.debug_endpoints |= args.debug_endpoints;
    config.unique_tuples |= args.unique;
    println!("CMR server on {} (store: {})", config.bind_addr.to_string().bold(), config.store_uri);
    CmrServer::new(config)?.serve().await?;
    Ok(())
}

async fn cmd_resolve(svc: &ResolverService, args: &TupleArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let uri = svc
        .resolve_raw(&args.wheel, &args.engine, &args.build, &args.wrapping)
        .await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&uri)?),
        OutputFormat::Text if uri.token_uri.is_empty() => println!("{}", "(draft: no metadata yet)".dimmed()),
        OutputFormat::Text => println!("{}", uri.token_uri.blue()),
    }
    Ok(())
}

async fn cmd_register(
    svc: &ResolverService,
    args: RegisterArgs,
    format: &OutputFormat,
) -> anyhow::Result<ComponentRecord> {
    let refs = AssetRefs::new(args.image, args.asset, args.metadata);
    let t = &args.tuple;
    let record = svc
        .register_raw(&t.wheel, &t.engine, &t.build, &t.wrapping, refs)
        .await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
        OutputFormat::Text => {
            println!("{} Registered {} as {}", "✓".green().bold(), record.tuple.to_string().yellow(), record.id);
            println!("  State: {}", state_label(record.state()));
        }
    }
    Ok(record)
}

async fn cmd_list(svc: &ResolverService, args: &ListArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let records = match args.tuple.as_deref() {
        None => svc.list_all().await?,
        Some([wheel, engine, build, wrapping]) => svc.records_for_raw(wheel, engine, build, wrapping).await?,
        Some(other) => anyhow::bail!("--tuple takes 4 ids, got {}", other.len()),
    };
    let records: Vec<ComponentRecord> = records
        .into_iter()
        .filter(|r| !args.drafts || r.state() == RecordState::Draft)
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text if records.is_empty() => println!("No records."),
        OutputFormat::Text => {
            for r in &records {
                let meta = if r.metadata_ref().is_empty() { "-" } else { r.metadata_ref() };
                println!("{}  {}  {}  {}", r.id.short_id().dimmed(), r.tuple.to_string().yellow(), state_label(r.state()), meta);
            }
            println!("{} records", records.len().to_string().bold());
        }
    }
    Ok(())
}

async fn cmd_clear(svc: &ResolverService, config: &ServerConfig, args: &ClearArgs) -> anyhow::Result<()> {
    if !args.yes {
        anyhow::bail!("refusing to clear {} without --yes", config.store_uri);
    }
    let removed = svc.clear_all().await?;
    println!("{} Removed {} records.", "✓".green(), removed);
    Ok(())
}

fn cmd_check(config: &ServerConfig, args: &TupleArgs) -> anyhow::Result<()> {
    let tuple = config
        .validator()
        .validate(&args.wheel, &args.engine, &args.build, &args.wrapping)?;
    println!("{} {} is valid (max supply {})", "✓".green().bold(), tuple.to_string().yellow(), config.max_component_supply);
    Ok(())
}

fn state_label(state: RecordState) -> colored::ColoredString {
    match state {
        RecordState::Draft => "draft".yellow(),
        RecordState::Finished => "finished".green(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use cmr_types::ComponentTuple;

    fn file_config(dir: &tempfile::TempDir) -> ServerConfig {
        ServerConfig {
            store_uri: format!("file://{}", dir.path().join("records.jsonl").display()),
            ..ServerConfig::default()
        }
    }

    fn register_args(tuple: [&str; 4], meta: &str) -> RegisterArgs {
        let [wheel, engine, build, wrapping] = tuple.map(String::from);
        RegisterArgs {
            tuple: TupleArgs { wheel, engine, build, wrapping },
            image: if meta.is_empty() { String::new() } else { "ipfs://img".into() },
            asset: if meta.is_empty() { String::new() } else { "ipfs://vox".into() },
            metadata: meta.into(),
        }
    }

    #[tokio::test]
    async fn register_persists_across_commands() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);

        let svc = build_service(&config).unwrap();
        let record = cmd_register(&svc, register_args(["6", "29", "394", "400"], "ipfs://abc"), &OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(record.tuple, ComponentTuple::new(6, 29, 394, 400));
        drop(svc);

        let svc = build_service(&config).unwrap();
        let uri = svc.resolve(&ComponentTuple::new(6, 29, 394, 400)).await.unwrap();
        assert_eq!(uri.token_uri, "ipfs://abc");
    }

    #[tokio::test]
    async fn register_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let svc = build_service(&file_config(&dir)).unwrap();
        let result = cmd_register(&svc, register_args(["7000", "0", "0", "0"], ""), &OutputFormat::Text).await;
        assert!(result.is_err());
        assert!(svc.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);
        let svc = build_service(&config).unwrap();
        cmd_register(&svc, register_args(["1", "2", "3", "4"], ""), &OutputFormat::Text).await.unwrap();

        assert!(cmd_clear(&svc, &config, &ClearArgs { yes: false }).await.is_err());
        assert_eq!(svc.list_all().await.unwrap().len(), 1);

        cmd_clear(&svc, &config, &ClearArgs { yes: true }).await.unwrap();
        assert!(svc.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_by_tuple_shows_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let svc = build_service(&file_config(&dir)).unwrap();
        cmd_register(&svc, register_args(["1", "2", "3", "4"], "ipfs://a"), &OutputFormat::Text).await.unwrap();
        cmd_register(&svc, register_args(["1", "2", "3", "4"], "ipfs://b"), &OutputFormat::Text).await.unwrap();

        let tuple = Some(vec!["1".into(), "2".into(), "3".into(), "4".into()]);
        cmd_list(&svc, &ListArgs { drafts: false, tuple }, &OutputFormat::Json).await.unwrap();

        let bad = Some(vec!["1".into(), "2".into(), "3".into(), "9999".into()]);
        assert!(cmd_list(&svc, &ListArgs { drafts: false, tuple: bad }, &OutputFormat::Text).await.is_err());
    }

    #[tokio::test]
    async fn resolve_unknown_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let svc = build_service(&file_config(&dir)).unwrap();
        let args = TupleArgs { wheel: "1".into(), engine: "1".into(), build: "1".into(), wrapping: "1".into() };
        assert!(cmd_resolve(&svc, &args, &OutputFormat::Text).await.is_err());
    }

    #[test]
    fn check_uses_configured_bound() {
        let config = ServerConfig { max_component_supply: 10, ..ServerConfig::default() };
        let ok = TupleArgs { wheel: "10".into(), engine: "0".into(), build: "0".into(), wrapping: "0".into() };
        let bad = TupleArgs { wheel: "11".into(), ..ok.clone() };
        assert!(cmd_check(&config, &ok).is_ok());
        assert!(cmd_check(&config, &bad).is_err());
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::try_parse_from(["cmr", "--store", "memory://", "--max-supply", "5", "check", "1", "1", "1", "1"]).unwrap();
        let config = effective_config(&cli).unwrap();
        assert_eq!(config.store_uri, "memory://");
        assert_eq!(config.max_component_supply, 5);
    }

    #[test]
    fn bad_store_uri_is_reported() {
        let config = ServerConfig { store_uri: "mongodb://db".into(), ..ServerConfig::default() };
        let err = build_service(&config).err().unwrap();
        assert!(err.to_string().contains("mongodb://db"));
    }
}
