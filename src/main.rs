//! rusty-table CLI - compiles game-configuration workbooks

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusty_table::config::ExtractConfig;
use rusty_table::crypto::DataCipher;
use rusty_table::diagnostics::TracingSink;
use rusty_table::extract::{DeleteOrphans, KeepOrphans, OrphanResolver};
use rusty_table::{ExtractionKind, Pipeline};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rusty-table")]
#[command(
    version,
    about = "Compile game-configuration spreadsheets into JSON tables, string files and C# code"
)]
struct Cli {
    /// Settings file (JSON); command-line flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code, tables and string files
    All(ExtractArgs),

    /// Generate GameTables.cs only
    Script(ExtractArgs),

    /// Write <sheet>.json for every data sheet
    Table(ExtractArgs),

    /// Write GSTR_<language>.json from the string workbook
    #[command(name = "string")]
    Strings(ExtractArgs),

    /// Decrypt an encrypted output document
    Decrypt {
        /// Encrypted file
        input: PathBuf,

        /// Passphrase (default: the configured encryption key)
        #[arg(short, long)]
        key: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct ExtractArgs {
    /// Directory searched recursively for *.xlsx / *.xls
    #[arg(long)]
    tables: Option<PathBuf>,

    /// File stem of the string workbook
    #[arg(long)]
    string_file: Option<String>,

    /// File stem of a workbook to skip
    #[arg(long)]
    enum_file: Option<String>,

    /// Output directory of GameTables.cs
    #[arg(long)]
    script_out: Option<PathBuf>,

    /// Output directory of the table JSON files (must exist)
    #[arg(long)]
    table_out: Option<PathBuf>,

    /// Output directory of the string JSON files
    #[arg(long)]
    string_out: Option<PathBuf>,

    /// Encrypt outputs with this passphrase (at least 8 characters)
    #[arg(long)]
    key: Option<String>,

    /// Type alias list (JSON)
    #[arg(long)]
    type_aliases: Option<PathBuf>,

    /// Delete stale *.json files in output directories without asking
    #[arg(long, conflicts_with = "keep_orphans")]
    prune: bool,

    /// Keep stale *.json files in output directories without asking
    #[arg(long)]
    keep_orphans: bool,
}

impl ExtractArgs {
    fn overrides(&self) -> ExtractConfig {
        ExtractConfig {
            table_path: self.tables.clone(),
            string_file_name: self.string_file.clone(),
            enum_file_name: self.enum_file.clone(),
            script_output_path: self.script_out.clone(),
            table_output_path: self.table_out.clone(),
            string_output_path: self.string_out.clone(),
            encryption_key: self.key.clone(),
            type_alias_path: self.type_aliases.clone(),
        }
    }

    fn orphan_resolver(&self) -> Box<dyn OrphanResolver> {
        if self.prune {
            Box::new(DeleteOrphans)
        } else if self.keep_orphans || !io::stdin().is_terminal() {
            Box::new(KeepOrphans)
        } else {
            Box::new(PromptOrphans::default())
        }
    }
}

/// Asks on the terminal before deleting each stale file.
#[derive(Default)]
struct PromptOrphans {
    terminal: Mutex<()>,
}

impl OrphanResolver for PromptOrphans {
    fn should_delete(&self, path: &Path) -> bool {
        let _terminal = match self.terminal.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        eprint!("Delete unused file '{}'? [y/N] ", path.display());
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ExtractConfig::load(path).with_context(|| format!("Failed to load settings '{}'", path.display()))?,
        None => ExtractConfig::default(),
    };

    match cli.command {
        Commands::All(args) => extract(config, &args, ExtractionKind::All),
        Commands::Script(args) => extract(config, &args, ExtractionKind::Script),
        Commands::Table(args) => extract(config, &args, ExtractionKind::Table),
        Commands::Strings(args) => extract(config, &args, ExtractionKind::String),
        Commands::Decrypt { input, key, output } => decrypt(&config, &input, key, output.as_deref()),
    }
}

fn extract(config: ExtractConfig, args: &ExtractArgs, kind: ExtractionKind) -> Result<()> {
    let config = config.merge(args.overrides());
    let orphans = args.orphan_resolver();
    let pipeline = Pipeline::new(config, &TracingSink, orphans.as_ref());
    pipeline.run(kind).map_err(|error| {
        tracing::error!("{kind} extraction failed: {error}");
        error
    })?;
    Ok(())
}

fn decrypt(config: &ExtractConfig, input: &Path, key: Option<String>, output: Option<&Path>) -> Result<()> {
    let key = key
        .or_else(|| config.encryption_key.clone())
        .context("No passphrase given; pass --key or set encryption_key")?;
    let cipher = DataCipher::new(&key)?;
    let encrypted = std::fs::read_to_string(input).with_context(|| format!("Failed to read '{}'", input.display()))?;
    let text = cipher
        .decrypt(&encrypted)
        .with_context(|| format!("Failed to decrypt '{}'", input.display()))?;
    match output {
        Some(path) => std::fs::write(path, text).with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
