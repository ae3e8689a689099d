mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{FetchFlags, EXIT_FAILURE, EXIT_FETCH_ERROR, EXIT_MANIFEST_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "codepax",
    version,
    about = "Manifest integrity and hydration engine for portable text codices"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new empty lite manifest.
    Init {
        /// Manifest name (also the default output file stem).
        name: String,
        /// Output path (defaults to <name>.codex.json).
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Check a manifest's structure and integrity without mutating it.
    Validate {
        #[arg(default_value = "codex.json")]
        manifest: PathBuf,
        /// Tolerate warnings that strict validation treats as advisory only.
        #[arg(long, default_value_t = false)]
        relaxed: bool,
    },
    /// Fetch and inline source content, producing a dense manifest.
    Hydrate {
        #[arg(default_value = "codex.json")]
        manifest: PathBuf,
        /// Write the dense manifest here instead of overwriting the input.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also pack a .codex.tar bundle at this path.
        #[arg(long)]
        bundle: Option<PathBuf>,
        /// Record failures per source instead of aborting on the first.
        #[arg(long, default_value_t = false)]
        relaxed: bool,
        /// JSON file with extra scheme resolvers.
        #[arg(long)]
        resolvers: Option<PathBuf>,
        /// JSON file with function definitions for func:// sources.
        #[arg(long)]
        functions: Option<PathBuf>,
        /// Directory for the on-disk fetch cache.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Parallel fetch workers.
        #[arg(long)]
        jobs: Option<usize>,
        /// Per-fetch HTTP timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Strip inline content, refreshing declared digests.
    Dehydrate {
        #[arg(default_value = "codex.json")]
        manifest: PathBuf,
        /// Write the lite manifest here instead of overwriting the input.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check sources against their declared digests without inlining.
    Verify {
        #[arg(default_value = "codex.json")]
        manifest: PathBuf,
        /// Persist the updated drift history to this path.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Record failures per source instead of aborting on the first.
        #[arg(long, default_value_t = false)]
        relaxed: bool,
        /// JSON file with extra scheme resolvers.
        #[arg(long)]
        resolvers: Option<PathBuf>,
        /// JSON file with function definitions for func:// sources.
        #[arg(long)]
        functions: Option<PathBuf>,
        /// Directory for the on-disk fetch cache.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Parallel fetch workers.
        #[arg(long)]
        jobs: Option<usize>,
        /// Per-fetch HTTP timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Download a published manifest from a named remote.
    Fetch {
        /// Artifact name on the remote.
        name: String,
        /// Remote alias to download from.
        #[arg(long)]
        remote: String,
        /// Remotes file (defaults to ~/.config/codepax/remotes.json).
        #[arg(long)]
        remotes: Option<PathBuf>,
        /// Download the .codex.tar bundle form instead of the lean manifest.
        #[arg(long, default_value_t = false)]
        bundle: bool,
        /// Output path (defaults to <name>.codex.json).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CODEPAX_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Init {
            name,
            out,
            author,
            category,
        } => commands::init::run(
            &name,
            out.as_deref(),
            author.as_deref(),
            category.as_deref(),
            json_output,
        ),
        Commands::Validate { manifest, relaxed } => {
            commands::validate::run(&manifest, relaxed, json_output)
        }
        Commands::Hydrate {
            manifest,
            out,
            bundle,
            relaxed,
            resolvers,
            functions,
            cache,
            jobs,
            timeout_secs,
        } => commands::hydrate::run(
            &manifest,
            out.as_deref(),
            bundle.as_deref(),
            &FetchFlags {
                relaxed,
                resolvers,
                functions,
                cache,
                jobs,
                timeout_secs,
            },
            json_output,
        ),
        Commands::Dehydrate { manifest, out } => {
            commands::dehydrate::run(&manifest, out.as_deref(), json_output)
        }
        Commands::Verify {
            manifest,
            out,
            relaxed,
            resolvers,
            functions,
            cache,
            jobs,
            timeout_secs,
        } => commands::verify::run(
            &manifest,
            out.as_deref(),
            &FetchFlags {
                relaxed,
                resolvers,
                functions,
                cache,
                jobs,
                timeout_secs,
            },
            json_output,
        ),
        Commands::Fetch {
            name,
            remote,
            remotes,
            bundle,
            out,
        } => commands::fetch::run(
            &name,
            &remote,
            remotes.as_deref(),
            bundle,
            out.as_deref(),
            json_output,
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("failed to parse manifest")
                || msg.starts_with("failed to read manifest")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("fetch error:") || msg.starts_with("remote error:") {
                EXIT_FETCH_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
