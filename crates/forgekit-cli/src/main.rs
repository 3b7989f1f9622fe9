mod source_args;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;

use forgekit_pm::{Config, ConfigLoader, Manifest, Source, SourceContext};
use forgekit_semver::Requirement;
use source_args::SourceArgs;

#[derive(Parser, Debug)]
#[command(name = "forgekit")]
#[command(about = "Query and install modules from a forge, git or svn")]
#[command(version)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Project directory holding forgekit.json
    #[arg(short = 'd', long, default_value = ".", global = true)]
    working_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the versions a source offers for a module
    Versions {
        /// Module name, e.g. puppetlabs/stdlib
        name: String,

        /// Only show versions matching this requirement
        #[arg(short = 'c', long)]
        constraint: Option<String>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the dependencies a module version declares
    Deps {
        name: String,

        /// Version to inspect (default: the newest one)
        version: Option<String>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Install a module into the install directory
    Install {
        name: String,

        /// Version to install (default: the newest one)
        #[arg(long = "module-version")]
        version: Option<String>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn open_source(mut config: Config, args: &SourceArgs) -> Result<Source> {
    args.apply_modes(&mut config);
    log::debug!(
        "Cache {}, install {}, vendor {} (local: {}, vendor: {})",
        config.get_cache_dir().display(),
        config.get_install_dir().display(),
        config.get_vendor_dir().display(),
        config.local,
        config.vendor
    );

    let context = SourceContext::from_config(config)?;
    let source = args.build(context)?;
    log::info!("Using {} source {}", source.kind(), source);
    Ok(source)
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    let working_dir = args
        .working_dir
        .canonicalize()
        .context("Failed to resolve working directory")?;
    let config = ConfigLoader::new(true)
        .load(&working_dir)
        .context("Failed to load configuration")?;
    log::debug!("Loaded configuration for {}", working_dir.display());

    match args.command {
        Commands::Versions {
            name,
            constraint,
            source,
        } => {
            let mut source = open_source(config, &source)?;

            let requirement = constraint
                .as_deref()
                .map(Requirement::parse)
                .transpose()
                .context("Invalid version constraint")?;

            let versions = source
                .versions(&name)
                .with_context(|| format!("Failed to list versions of {}", name))?;
            let mut shown = 0;
            for version in versions {
                if requirement.as_ref().map_or(true, |r| r.matches_str(&version)) {
                    println!("{}", version);
                    shown += 1;
                }
            }

            if shown == 0 {
                eprintln!("{} No matching versions of {} on {}", style("Warning:").yellow(), name, source);
                return Ok(1);
            }
            Ok(0)
        }

        Commands::Deps {
            name,
            version,
            source,
        } => {
            let mut source = open_source(config, &source)?;

            let version = source.fetch_version(&name, version.as_deref())?;
            let manifest = source.manifest(&name, &version)?;

            println!("{} {}", style(&manifest.name).green().bold(), style(&manifest.version).cyan());
            for dependency in manifest.dependencies.unwrap_or_default() {
                match &dependency.source {
                    Some(origin) => println!("  {} {} ({})", dependency.name, dependency.requirement, style(origin).dim()),
                    None => println!("  {} {}", dependency.name, dependency.requirement),
                }
            }
            Ok(0)
        }

        Commands::Install {
            name,
            version,
            source,
        } => {
            let mut source = open_source(config, &source)?;

            let version = source.fetch_version(&name, version.as_deref())?;
            let manifest = Manifest::new(source.clone(), &name, &version);
            let path = source
                .install(&manifest)
                .with_context(|| format!("Failed to install {} {}", name, version))?;

            println!(
                "{} {} ({}) into {}",
                style("Installed").green().bold(),
                name,
                version,
                path.display()
            );
            if source.is_pinned() {
                for (key, value) in source.to_lock_options() {
                    println!("  {}: {}", style(key).dim(), value);
                }
            }
            Ok(0)
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
