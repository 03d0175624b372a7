use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "excel-import", version, about = "Import Excel sheets into the record store")]
pub struct Cli {
    /// SQLite database path (defaults to $EXCEL_IMPORT_DB or the user data directory)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Site directory holding uploaded files (defaults to $EXCEL_IMPORT_SITE)
    #[arg(long, global = true)]
    pub site: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List importable entity types
    EntityTypes {
        /// Substring filter on the type name
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Compare a file's header row against the saved mapping
    Preview {
        entity_type: String,
        file: String,
    },
    /// Import a file and follow its progress
    Import {
        entity_type: String,
        file: String,

        /// Do not create records that have no match
        #[arg(long, default_value_t = false)]
        no_create: bool,

        /// Do not update records that already exist
        #[arg(long, default_value_t = false)]
        no_update: bool,

        /// User the progress events are addressed to
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Save the column mapping for an entity type
    Map {
        entity_type: String,

        /// Pairs written as Column=field
        #[arg(required = true)]
        pairs: Vec<String>,

        /// Target field used for duplicate detection
        #[arg(short, long)]
        unique: Option<String>,
    },
}

/// Parse `Column=field`; neither side may be blank
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (column, field) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Column=field, got '{raw}'"))?;
    let (column, field) = (column.trim(), field.trim());
    if column.is_empty() || field.is_empty() {
        return Err(format!("expected Column=field, got '{raw}'"));
    }
    Ok((column.to_string(), field.to_string()))
}
