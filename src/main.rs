use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use estraier_client::config;
use estraier_client::{Clause, Database, EstraierLibrary, SearchOptions};

/// Library and binary events at info unless RUST_LOG says otherwise
const DEFAULT_LOG_FILTER: &str = "estraier_client=info,estsearch=info";

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")");

/// Search a Hyper Estraier index / 搜索全文索引
#[derive(Parser)]
#[command(name = "estsearch", version, long_version = LONG_VERSION)]
struct Cli {
    /// Config file (default: ./estsearch.json) / 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// Index directory, overrides database.path / 索引目录
    #[arg(long)]
    db: Option<String>,

    /// Engine library, overrides engine.library / 引擎动态库
    #[arg(long)]
    library: Option<String>,

    /// Extra search option (sure, usual, fast, agito, noidf, simple, rough, union, isect, scfb)
    #[arg(short = 'o', long = "option")]
    options: Vec<SearchOptions>,

    /// Search phrase / 搜索短语
    phrase: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration / 加载配置
    let mut app_config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    if let Some(db) = cli.db {
        app_config.database.path = db;
    }
    if let Some(library) = cli.library {
        app_config.engine.library = library;
    }

    let mut options = app_config.search_options()?;
    for opt in cli.options {
        options |= opt;
    }

    let crt = app_config.engine.crt_library.as_deref().map(Path::new);
    let library = EstraierLibrary::load_with_crt(&app_config.engine.library, crt)
        .with_context(|| format!("cannot use engine library {}", app_config.engine.library))?;
    let db = Database::open_with(Arc::new(library), &app_config.database.path, app_config.open_mode())
        .with_context(|| format!("cannot open index {}", app_config.database.path))?;

    let mut clauses = vec![Clause::phrase(cli.phrase)];
    if !options.is_empty() {
        clauses.push(options.into());
    }

    let ids = db.search(&clauses)?;
    tracing::info!("{} hits (options: {})", ids.len(), options);

    let limit = match app_config.search.max_results {
        0 => usize::MAX,
        n => n,
    };
    for id in ids.into_iter().take(limit) {
        let doc = db.get_doc(id);
        if doc.exists() {
            println!("{}\t{}", id, doc.uri());
        }
    }

    db.close().context("failed to close index")?;
    Ok(())
}
