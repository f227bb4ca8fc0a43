use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docsync_core::config::{ConfigOverrides, SyncConfig, resolve_config};
use docsync_core::tree::forest_page_count;
use docsync_core::{
    DryRunPublisher, FsSourceTree, MarkPublisher, Orchestrator, PageBuilder, PublishNode,
    PublishReport, TitleResolver, build_forest,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "docsync",
    version,
    about = "Publish a directory of markdown documents as nested wiki pages"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Workspace root (defaults to GITHUB_WORKSPACE)")]
    workspace: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "TOML config file (defaults to <workspace>/.docsync.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved configuration diagnostics")]
    diagnostics: bool,
    #[arg(long, short, global = true, help = "Enable debug logging")]
    verbose: bool,
    #[arg(long, short, global = true, help = "Only log errors")]
    quiet: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            workspace: cli.workspace.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Publish every page under the workspace (default command)")]
    Publish(PublishArgs),
    #[command(about = "Print the page tree that would be published, as JSON")]
    Plan,
}

#[derive(Debug, Args, Default)]
struct PublishArgs {
    #[arg(long, help = "Prepare every page but do not run the publisher")]
    dry_run: bool,
    #[arg(long, value_name = "KEY", help = "Target space (overrides INPUT_CONFLUENCE_SPACE)")]
    space: Option<String>,
    #[arg(long, value_name = "PATH", help = "Publisher executable (overrides MARK_EXECUTABLE)")]
    executable: Option<PathBuf>,
    #[arg(long, help = "Print the publish report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Publish(args)) => run_publish(&runtime, args),
        Some(Commands::Plan) => run_plan(&runtime),
        None => run_publish(&runtime, PublishArgs::default()),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_publish(runtime: &RuntimeOptions, args: PublishArgs) -> Result<()> {
    let config = resolve_runtime_config(
        runtime,
        ConfigOverrides {
            space: args.space.clone(),
            executable: args.executable.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    if runtime.diagnostics {
        println!("[diagnostics]\n{}\n", config.diagnostics());
    }

    // Configuration problems must surface before any page is touched.
    let (space, credentials) = if args.dry_run {
        (config.space.clone(), None)
    } else {
        (
            Some(config.require_space()?.to_string()),
            Some(config.require_credentials()?),
        )
    };

    let forest = scan_workspace(&config)?;
    info!(
        roots = forest.len(),
        pages = forest_page_count(&forest),
        "scanned workspace"
    );

    let titles = TitleResolver::new(&config.workspace_root);
    let pages = PageBuilder::new(&config.workspace_root, space, config.source_link.clone());
    let report = match credentials {
        Some(credentials) => {
            let mut publisher = MarkPublisher::new(config.executable.clone(), credentials);
            Orchestrator::new(&FsSourceTree, &mut publisher, titles, pages)
                .publish(&forest)
                .context("publish run aborted")?
        }
        None => {
            let mut publisher = DryRunPublisher::new();
            Orchestrator::new(&FsSourceTree, &mut publisher, titles, pages)
                .publish(&forest)
                .context("dry run aborted")?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&config, &report, args.dry_run);
    }
    Ok(())
}

fn run_plan(runtime: &RuntimeOptions) -> Result<()> {
    let config = resolve_runtime_config(runtime, ConfigOverrides::default())?;
    if runtime.diagnostics {
        eprintln!("[diagnostics]\n{}\n", config.diagnostics());
    }
    let forest = scan_workspace(&config)?;
    let relative: Vec<PublishNode> = forest
        .iter()
        .map(|node| node.relative_to(&config.workspace_root))
        .collect();
    println!("{}", serde_json::to_string_pretty(&relative)?);
    Ok(())
}

fn scan_workspace(config: &SyncConfig) -> Result<Vec<PublishNode>> {
    build_forest(&FsSourceTree, &config.workspace_root).with_context(|| {
        format!(
            "failed to scan workspace {}",
            normalize_path(&config.workspace_root)
        )
    })
}

fn print_report(config: &SyncConfig, report: &PublishReport, dry_run: bool) {
    println!(
        "{} {} page(s) from {}",
        if dry_run { "would publish" } else { "published" },
        report.published(),
        normalize_path(&config.workspace_root)
    );
    for page in &report.pages {
        let source = page
            .source_path
            .as_deref()
            .map(|path| {
                normalize_path(path.strip_prefix(&config.workspace_root).unwrap_or(path))
            })
            .unwrap_or_else(|| "<folder page>".to_string());
        println!(
            "  - {} (parent: {}, source: {}, attachments: {})",
            page.title,
            page.parent_title.as_deref().unwrap_or("<none>"),
            source,
            page.attachments
        );
    }
    if !report.duplicate_titles.is_empty() {
        println!("duplicate titles:");
        for title in &report.duplicate_titles {
            println!("  - {title}");
        }
    }
}

fn resolve_runtime_config(
    runtime: &RuntimeOptions,
    overrides: ConfigOverrides,
) -> Result<SyncConfig> {
    dotenvy::dotenv().ok();

    let overrides = ConfigOverrides {
        workspace: runtime.workspace.clone(),
        config: runtime.config.clone(),
        ..overrides
    };

    let initial = resolve_config(&overrides).context("failed to resolve configuration")?;
    let workspace_env = initial.workspace_root.join(".env");
    if workspace_env.exists() {
        let _ = dotenvy::from_path_override(&workspace_env);
        return resolve_config(&overrides).context("failed to resolve configuration");
    }
    Ok(initial)
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
