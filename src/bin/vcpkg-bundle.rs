//! vcpkg-bundle - provision vcpkg packages for a host build

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vcpkg_bundle::bootstrap::ensure_vcpkg;
use vcpkg_bundle::{
    Arch, BundleConfig, BundleError, ConfigOverrides, Linkage, Pipeline, Platform, Triplet,
};

#[derive(Parser)]
#[command(name = "vcpkg-bundle", version, about = "Provision vcpkg packages for a host build")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap, install, classify and generate; print or write the outputs
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        /// Write the outputs JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Bootstrap vcpkg and print the resolved package set without installing
    Resolve {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Regenerate protocol bindings only
    Generate {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the triplet for a target platform
    Triplet {
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        arch: Arch,
        #[arg(long, default_value = "static-md")]
        linkage: Linkage,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Configuration file
    #[arg(short, long, default_value = "vcpkg-bundle.toml")]
    config: PathBuf,
    /// Base for relative paths (default: the config file's directory)
    #[arg(long)]
    project_root: Option<PathBuf>,
    /// vcpkg checkout; overrides the config file and VCPKG_ROOT
    #[arg(long)]
    vcpkg_root: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<BundleConfig> {
        BundleConfig::load(
            &self.config,
            ConfigOverrides {
                project_root: self.project_root.clone(),
                vcpkg_root: self.vcpkg_root.clone(),
                env_vcpkg_root: None,
            },
        )
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output } => run(&config, output),
        Commands::Resolve { config } => resolve(&config),
        Commands::Generate { config } => generate(&config),
        Commands::Triplet {
            platform,
            arch,
            linkage,
        } => {
            let triplet = Triplet::for_target(platform, arch, linkage).ok_or(
                BundleError::UnsupportedPlatform {
                    role: "target",
                    platform,
                    arch,
                },
            )?;
            println!("{triplet}");
            Ok(())
        }
    }
}

fn run(args: &ConfigArgs, output: Option<PathBuf>) -> Result<()> {
    let config = args.load()?;
    let outputs = Pipeline::new(&config)?.run()?;
    match output {
        Some(path) => {
            outputs.write(&path)?;
            info!(path = %path.display(), "wrote build outputs");
        }
        None => print!("{}", outputs.to_json()?),
    }
    Ok(())
}

fn resolve(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    let pipeline = Pipeline::new(&config)?;
    let _lock = pipeline.lock()?;

    ensure_vcpkg(pipeline.root())?;
    for package in pipeline.resolve()? {
        println!("{package}");
    }
    Ok(())
}

fn generate(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    let pipeline = Pipeline::new(&config)?;
    let _lock = pipeline.lock()?;

    let generated = pipeline
        .generate_bindings()
        .context("generating protocol bindings")?;
    match generated {
        Some(generated) => {
            for path in generated.sources.iter().chain(&generated.headers) {
                println!("{}", path.display());
            }
        }
        None => info!("nothing to generate"),
    }
    Ok(())
}
