use crate::showcase::Showcase;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "toastbox")]
#[command(about = "Show Windows toast notifications")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./toastbox.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// App id used for the notification, overrides the configured default
    #[arg(long, global = true)]
    pub app_id: Option<String>,

    /// Give up waiting after this many seconds and hide the toast
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show one of the built-in example toasts
    Show {
        #[arg(value_enum)]
        showcase: Showcase,
        /// Show without sound
        #[arg(long)]
        mute: bool,
    },
    /// Show a toast described by a JSON file
    Json { path: PathBuf },
    /// Register an app id with a display name and icon
    Register {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Icon path or URI (http, data:, icon://)
        #[arg(long)]
        icon: Option<String>,
        /// Icon background as ARGB hex
        #[arg(long)]
        background: Option<String>,
        /// Hide the app from notification settings
        #[arg(long)]
        hidden: bool,
    },
    /// Remove a registered app id
    Unregister { id: String },
    /// List registered app ids
    List,
    /// Print notification settings for the app id
    Status,
    /// Remove every toast of the app id from the action center
    Clear,
}
