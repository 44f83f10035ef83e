//! dva-index CLI

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dva_index::indexer::index_workspace;
use dva_index::{
    DefinitionKind, IndexSettings, IndexerManager, ModelInfoCache, Result, SearchQuery,
};

/// Index dva models, routes and locale keys of a workspace
#[derive(Parser, Debug)]
#[command(name = "dva-index")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Workspace root
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the workspace once and print index statistics
    Scan {
        /// Print the whole index as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one namespace, or list all of them
    Namespace { name: Option<String> },
    /// List every `namespace/action` type
    Actions,
    /// List route patterns
    Routes,
    /// Show where a locale key is defined, or list all keys
    Locale { key: Option<String> },
    /// Search definitions by name
    Search {
        text: String,

        /// Restrict to one kind (namespace, action, route, locale)
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<DefinitionKind>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Find dispatch sites of an action type, or usages of a locale key
    Refs {
        /// `namespace/action`, or a locale key with --locale
        target: String,

        #[arg(long)]
        locale: bool,
    },
    /// Keep the index live and log changes until interrupted
    Watch,
}

fn parse_kind(value: &str) -> std::result::Result<DefinitionKind, String> {
    match value {
        "namespace" => Ok(DefinitionKind::Namespace),
        "action" => Ok(DefinitionKind::Action),
        "route" => Ok(DefinitionKind::Route),
        "locale" => Ok(DefinitionKind::LocaleKey),
        other => Err(format!("unknown kind: {}", other)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let root = args.root;

    if let Command::Watch = args.command {
        return watch(&root).await;
    }

    let settings = IndexSettings::load(&root)?;
    let cache = ModelInfoCache::for_workspace(&root, &settings)?;
    let summary = index_workspace(&cache, &root, &settings).await?;

    match args.command {
        Command::Scan { json: true } => print_json(&cache.snapshot()),
        Command::Scan { json: false } => {
            let stats = cache.stats();
            println!(
                "{} files scanned, {} indexed in {}ms",
                summary.files, summary.loaded, summary.elapsed_ms
            );
            println!(
                "models: {}  routers: {}  locales: {}  sources: {}",
                stats.models, stats.routers, stats.locales, stats.sources
            );
            println!(
                "namespaces: {}  actions: {}  routes: {}  locale keys: {}  usages: {}",
                stats.namespaces, stats.actions, stats.routes, stats.locale_keys, stats.usages
            );
            Ok(())
        }
        Command::Namespace { name: Some(name) } => match cache.query_namespace(&name) {
            Some(info) => print_json(&info),
            None => {
                println!("No namespace named {}", name);
                Ok(())
            }
        },
        Command::Namespace { name: None } => print_lines(cache.all_namespaces()),
        Command::Actions => print_lines(cache.all_action_types()),
        Command::Routes => {
            for route in cache.query_all_routes() {
                println!("{}\t{}", route.pattern, route.location.path.display());
            }
            Ok(())
        }
        Command::Locale { key: Some(key) } => print_json(&cache.query_locale_key(&key)),
        Command::Locale { key: None } => print_lines(cache.query_all_locale_keys()),
        Command::Search { text, kind, limit } => {
            let mut query = SearchQuery::text(&text).with_limit(limit);
            if let Some(kind) = kind {
                query = query.with_kinds(vec![kind]);
            }
            print_json(&cache.search(&query))
        }
        Command::Refs { target, locale: true } => {
            print_json(&cache.find_locale_references(&target))
        }
        Command::Refs { target, locale: false } => match target.split_once('/') {
            Some((namespace, action)) => print_json(&cache.find_references(namespace, action)),
            None => {
                println!("Expected namespace/action, got {}", target);
                Ok(())
            }
        },
        Command::Watch => Ok(()),
    }
}

async fn watch(root: &Path) -> Result<()> {
    let manager = IndexerManager::start(root).await?;
    if !manager.is_watching() {
        info!("Watcher unavailable, serving the initial scan only");
    }

    let _ = tokio::signal::ctrl_c().await;
    let stats = manager.cache().stats();
    info!(
        "Stopping with {} namespaces, {} routes, {} locale keys",
        stats.namespaces, stats.routes, stats.locale_keys
    );
    manager.shutdown().await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: Vec<String>) -> Result<()> {
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
