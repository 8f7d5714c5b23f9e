//! Inspect and search the persisted clipboard history and favorites
//!
//! Run: cargo run --bin clipfolio -- search "needle" --scope folders
//!
//! Reads the same files as the desktop app (`~/.clipboard_*.json`) unless
//! `--data-dir` points elsewhere. `watch` needs the `platform` feature.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipfolio::models::{numbered_labels, preview_text, PREVIEW_MAX_CHARS};
use clipfolio::{ClipboardStore, Config, DataPaths, HotkeyCombo, SearchOptions, SearchScope};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the data files (defaults to the home directory)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List history entries, most recent first
    History,

    /// List folders, or the items of one folder
    Favorites {
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Search history and favorites
    Search {
        query: String,

        /// all, history, folders, or folder:<name>
        #[arg(short, long, default_value = "all", value_parser = parse_scope)]
        scope: SearchScope,

        #[arg(short, long)]
        regex: bool,

        #[arg(short, long)]
        case_sensitive: bool,

        #[arg(short, long)]
        whole_word: bool,
    },

    /// Print the normalized form of a hotkey combo
    Hotkey { combo: String },

    /// Record clipboard changes into history until interrupted
    #[cfg(feature = "platform")]
    Watch,
}

fn parse_scope(s: &str) -> std::result::Result<SearchScope, String> {
    match s {
        "all" => Ok(SearchScope::All),
        "history" => Ok(SearchScope::HistoryOnly),
        "folders" => Ok(SearchScope::AllFolders),
        other => match other.strip_prefix("folder:") {
            Some(name) if !name.is_empty() => Ok(SearchScope::Folder(name.to_string())),
            _ => Err(format!("unknown scope '{}'", other)),
        },
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let paths = match &args.data_dir {
        Some(dir) => DataPaths::in_dir(dir),
        None => DataPaths::in_home().context("Failed to locate data files")?,
    };
    let config = Config::load(&paths.config);

    match args.command {
        Command::History => {
            let store = ClipboardStore::open(&paths, &config);
            for label in numbered_labels(store.history().entries().iter().map(String::as_str)) {
                println!("{}", label);
            }
        }
        Command::Favorites { folder: None } => {
            let store = ClipboardStore::open(&paths, &config);
            for folder in store.favorites().collection().folders() {
                println!("{} ({})", folder.name, folder.len());
            }
        }
        Command::Favorites { folder: Some(name) } => {
            let store = ClipboardStore::open(&paths, &config);
            let folder = store.favorites().folder(&name)?;
            for (label, item) in numbered_labels(folder.items.iter().map(|i| i.text.as_str()))
                .into_iter()
                .zip(&folder.items)
            {
                if item.description.is_empty() {
                    println!("{}", label);
                } else {
                    println!("{}  # {}", label, preview_text(&item.description, PREVIEW_MAX_CHARS));
                }
            }
        }
        Command::Search {
            query,
            scope,
            regex,
            case_sensitive,
            whole_word,
        } => {
            let store = ClipboardStore::open(&paths, &config);
            let options = SearchOptions {
                use_regex: regex,
                case_sensitive,
                whole_word,
            };
            let outcome = store.search(&query, &scope, options);
            if let Some(err) = &outcome.regex_error {
                eprintln!("Invalid regex, searched literally: {}", err);
            }
            for hit in &outcome.hits {
                println!(
                    "[{}] {}. {}",
                    hit.source_label(),
                    hit.index + 1,
                    preview_text(&hit.text, PREVIEW_MAX_CHARS)
                );
            }
        }
        Command::Hotkey { combo } => {
            let combo: HotkeyCombo = combo.parse()?;
            println!("{}", combo);
        }
        #[cfg(feature = "platform")]
        Command::Watch => watch(&paths)?,
    }

    Ok(())
}

#[cfg(feature = "platform")]
fn watch(paths: &DataPaths) -> Result<()> {
    use clipfolio::platform::{ArboardClipboard, EnigoInjector, LogNotifier};
    use clipfolio::App;

    let clipboard = ArboardClipboard::new()?;
    let config = Config::load(&paths.config);
    let mut app = App::open(
        paths,
        Box::new(clipboard),
        Box::new(EnigoInjector::new(config.paste_delay())),
        Box::new(LogNotifier),
    );

    tracing::info!(interval_ms = config.poll_interval_ms, "Watching clipboard");
    loop {
        if let Some(text) = app.tick().recorded {
            println!("{}", preview_text(&text, PREVIEW_MAX_CHARS));
        }
        std::thread::sleep(config.poll_interval());
    }
}
