// crates/warden-cli/src/main.rs
// ============================================================================
// Module: Warden CLI Entry Point
// Description: Command dispatcher for the governance control plane.
// Purpose: Run the server, seed the registry, and verify manifests offline.
// Dependencies: clap, tokio, warden-core, warden-registry, warden-server
// ============================================================================

//! ## Overview
//! The Warden CLI wires configuration into the control plane: `serve` runs
//! the HTTP surface, `seed` loads a tool catalog into the registry, and
//! `verify` re-derives a stored manifest's signature without a running
//! server. All commands load the same TOML configuration and fail closed on
//! invalid input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use warden_core::ManifestId;
use warden_core::TenantSlug;
use warden_core::ToolName;
use warden_registry::NewTool;
use warden_registry::RegistryConfig;
use warden_registry::RegistryError;
use warden_registry::SqliteRegistry;
use warden_server::ConfigError;
use warden_server::Governor;
use warden_server::GovernorError;
use warden_server::ServerError;
use warden_server::WardenConfig;
use warden_server::serve;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Governance control plane for tenant tool integrations.
#[derive(Debug, Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "warden.toml")]
    config: PathBuf,
    /// Command to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the governance HTTP server.
    Serve,
    /// Load a tool catalog into the registry.
    Seed {
        /// Path to the TOML tool catalog.
        #[arg(long)]
        tools: PathBuf,
    },
    /// Verify a stored manifest offline.
    Verify {
        /// Identity of the manifest to verify.
        manifest_id: String,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures mapped onto exit codes.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration failed to load or validate (exit code 2).
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// Seed catalog failed to load or parse (exit code 2).
    #[error("seed catalog error: {0}")]
    Catalog(String),
    /// Orchestration failure (exit code 1).
    #[error("{0}")]
    Governor(#[from] GovernorError),
    /// Registry failure (exit code 1).
    #[error("{0}")]
    Registry(#[from] RegistryError),
    /// Server failure (exit code 1).
    #[error("{0}")]
    Server(#[from] ServerError),
    /// Runtime construction failure (exit code 1).
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl CliError {
    /// Returns the process exit code value for this failure.
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Catalog(_) => 2,
            Self::Governor(_) | Self::Registry(_) | Self::Server(_) | Self::Runtime(_) => 1,
        }
    }
}

// ============================================================================
// SECTION: Seed Catalog
// ============================================================================

/// Tool catalog loaded by the seed command.
#[derive(Debug, Deserialize)]
struct SeedCatalog {
    /// Tools to register.
    #[serde(default)]
    tools: Vec<SeedTool>,
}

/// One catalog entry.
#[derive(Debug, Deserialize)]
struct SeedTool {
    /// Owning tenant slug.
    tenant: String,
    /// Tool name.
    name: String,
    /// Endpoint URL.
    url: String,
    /// Owner contact.
    owner: String,
    /// Access scopes.
    #[serde(default)]
    scopes: Vec<String>,
    /// Free-form metadata.
    #[serde(default)]
    metadata: Option<toml::Table>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "warden: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Serve => run_serve(&cli.config),
        Command::Seed {
            tools,
        } => run_seed(&cli.config, tools),
        Command::Verify {
            manifest_id,
        } => run_verify(&cli.config, manifest_id),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the governance HTTP server until interrupted.
fn run_serve(config_path: &Path) -> Result<(), CliError> {
    let config = WardenConfig::load(config_path)?;
    let governor = Governor::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    runtime.block_on(serve(&config, governor))?;
    Ok(())
}

/// Loads the tool catalog into the registry, skipping duplicates.
fn run_seed(config_path: &Path, catalog_path: &Path) -> Result<(), CliError> {
    let config = WardenConfig::load(config_path)?;
    let catalog = load_catalog(catalog_path)?;
    let registry = SqliteRegistry::open(&RegistryConfig {
        path: config.registry.path.clone(),
        busy_timeout_ms: config.registry.busy_timeout_ms,
    })?;
    let mut created = 0_usize;
    let mut skipped = 0_usize;
    for entry in &catalog.tools {
        match registry.register_tool(&catalog_entry_to_new_tool(entry)?) {
            Ok(_) => created += 1,
            Err(RegistryError::ToolExists {
                ..
            }) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "seeded {created} tools ({skipped} already registered)");
    Ok(())
}

/// Verifies one manifest offline and prints the verdict as JSON.
fn run_verify(config_path: &Path, manifest_id: &str) -> Result<(), CliError> {
    let config = WardenConfig::load(config_path)?;
    let governor = Governor::from_config(&config)?;
    let verdict = governor.verify_manifest(&ManifestId::new(manifest_id))?;
    let report = json!({
        "manifest_id": manifest_id,
        "verified": verdict.verified,
        "manifest": verdict.manifest,
    });
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{report:#}");
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and parses the TOML seed catalog.
fn load_catalog(path: &Path) -> Result<SeedCatalog, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| CliError::Catalog(format!("read {}: {err}", path.display())))?;
    toml::from_str(&contents).map_err(|err| CliError::Catalog(err.to_string()))
}

/// Converts a catalog entry into a registration request.
fn catalog_entry_to_new_tool(entry: &SeedTool) -> Result<NewTool, CliError> {
    let metadata = match &entry.metadata {
        Some(table) => serde_json::to_value(table)
            .map_err(|err| CliError::Catalog(format!("metadata for {}: {err}", entry.name)))?,
        None => json!({}),
    };
    Ok(NewTool {
        tenant_slug: TenantSlug::new(entry.tenant.clone()),
        name: ToolName::new(entry.name.clone()),
        url: entry.url.clone(),
        owner: entry.owner.clone(),
        scopes: entry.scopes.clone(),
        metadata,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
