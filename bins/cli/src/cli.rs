use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Default lifetime of signed URLs, in minutes.
pub const DEFAULT_URL_MINUTES: u64 = 15;

#[derive(Parser)]
#[command(name = "fotos")]
#[command(author, version, about = "Image storage for Demeter photos")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the active backend and verify the bucket
    Check,

    /// Upload a file under the base path
    Upload {
        /// File to upload
        file: PathBuf,

        /// Path relative to the base path
        path: String,

        /// Content type (guessed from the file extension if omitted)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Generate a signed read URL for a stored path
    ReadUrl {
        /// Full stored path, as returned by upload
        path: String,

        /// URL lifetime in minutes
        #[arg(long, default_value_t = DEFAULT_URL_MINUTES)]
        minutes: u64,
    },

    /// Generate a signed upload URL for a path relative to the base path
    UploadUrl {
        /// Path relative to the base path
        path: String,

        /// Content type the client must upload with
        #[arg(long)]
        content_type: String,

        /// URL lifetime in minutes
        #[arg(long, default_value_t = DEFAULT_URL_MINUTES)]
        minutes: u64,
    },

    /// Download a stored object
    Download {
        /// Full stored path
        path: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a stored object
    Delete {
        /// Full stored path
        path: String,
    },

    /// Check whether a stored object exists
    Exists {
        /// Full stored path
        path: String,
    },
}

/// Guess an image content type from a file extension.
pub fn guess_content_type(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
