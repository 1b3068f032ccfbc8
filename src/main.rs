use anyhow::{Context, Result};
use argh::FromArgs;
use help_scraper::config::{DEFAULT_HELP_FLAG, DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT};
use help_scraper::env::Environment;
use help_scraper::{ExternalProber, MarkdownRenderer, ScrapeConfig, snapshot};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Generate a Markdown command reference for a CLI by scraping its help output.
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Scrape(Scrape),
    Render(Render),
    Diff(Diff),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "scrape")]
/// Probe a tool recursively and write its command reference.
struct Scrape {
    #[argh(positional)]
    /// name or path of the tool to document.
    tool: String,

    #[argh(option, default = "DEFAULT_MAX_DEPTH")]
    /// deepest subcommand level to probe; the tool itself is level 0.
    max_depth: usize,

    #[argh(option, default = "DEFAULT_TIMEOUT.as_secs()")]
    /// seconds a single help invocation may take before it is killed.
    timeout_secs: u64,

    #[argh(option, default = "DEFAULT_HELP_FLAG.to_string()")]
    /// flag that makes the tool print its help.
    help_flag: String,

    #[argh(option, short = 'o', default = "PathBuf::from(\"cmd/commands.md\")")]
    /// where to write the Markdown document.
    output: PathBuf,

    #[argh(option)]
    /// also write a JSON snapshot of the command tree to this file.
    json: Option<PathBuf>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "render")]
/// Render a previously saved JSON snapshot without probing the tool.
struct Render {
    #[argh(positional)]
    /// snapshot written by `scrape --json`.
    snapshot: PathBuf,

    #[argh(option)]
    /// tool name used in headings, anchors and usage lines.
    tool: String,

    #[argh(option, short = 'o', default = "PathBuf::from(\"cmd/commands.md\")")]
    /// where to write the Markdown document.
    output: PathBuf,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "diff")]
/// Compare two JSON snapshots of the same tool.
struct Diff {
    #[argh(positional)]
    /// older snapshot.
    old: PathBuf,

    #[argh(positional)]
    /// newer snapshot.
    new: PathBuf,

    #[argh(switch)]
    /// print the changes as JSON instead of one line per change.
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli: Cli = argh::from_env();
    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Scrape(args) => scrape(args),
        Command::Render(args) => {
            let tree = snapshot::load(&args.snapshot)?;
            MarkdownRenderer::new(&args.tool).write_to_file(&tree, &args.output)?;
            info!("Markdown documentation saved to {}", args.output.display());
            Ok(())
        }
        Command::Diff(args) => {
            let changes = snapshot::diff(&snapshot::load(&args.old)?, &snapshot::load(&args.new)?);
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&changes).context("can't serialize changes")?
                );
            } else {
                for change in &changes {
                    println!("{}", change);
                }
            }
            Ok(())
        }
    }
}

fn scrape(args: Scrape) -> Result<()> {
    let config = ScrapeConfig {
        max_depth: args.max_depth,
        timeout: Duration::from_secs(args.timeout_secs),
        help_flag: args.help_flag,
    };
    let prober = ExternalProber::new(Environment::new(), &config);
    let tree = help_scraper::build(&prober, &args.tool, config.max_depth)?;
    info!("Discovered {} commands", tree.command_count());

    if let Some(path) = &args.json {
        snapshot::save(&tree, path)?;
        info!("JSON snapshot saved to {}", path.display());
    }

    MarkdownRenderer::new(&args.tool).write_to_file(&tree, &args.output)?;
    info!("Markdown documentation saved to {}", args.output.display());
    Ok(())
}
