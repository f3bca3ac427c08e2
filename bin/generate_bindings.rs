// Generates typed bindings for one or more projects from their ABI files.
//
//   generate_bindings dfk evo --abi-dir abis --out src/generated

use abi_wrapper_sdk::generator::generate_project;
use abi_wrapper_sdk::settings::Settings;
use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_bindings", about = "Generate Rust contract bindings from JSON ABIs")]
struct Args {
    /// Project names; each is read from `<abi-dir>/<project>.json`.
    #[arg(required = true)]
    projects: Vec<String>,

    /// Settings file (defaults to ./AbiWrapper.toml when present).
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    abi_dir: Option<PathBuf>,

    #[arg(long = "out")]
    output_dir: Option<PathBuf>,

    /// Generate bindings for access-control functions too.
    #[arg(long)]
    include_access_control: bool,

    /// Bind this contract in custom-contract mode even if it has an address (repeatable).
    #[arg(long = "custom-contract")]
    custom_contracts: Vec<String>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    env_logger::init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };
    if let Some(dir) = args.abi_dir {
        settings.generator.abi_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        settings.generator.output_dir = dir;
    }
    if args.include_access_control {
        settings.generator.exclude_access_control = false;
    }
    settings.generator.custom_contracts.extend(args.custom_contracts);

    for project in &args.projects {
        let written = generate_project(project, &settings.generator)?;
        info!("[CODEGEN] {}: wrote {} files", project, written.len());
        println!("✅ {} -> {} files in {:?}", project, written.len(), settings.generator.output_dir);
    }
    Ok(())
}
