use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use codepad::kernel::services::adapters::{
    ensure_settings_file, get_store_path, load_settings, BuiltinLanguages, JsonFileEngine,
    MemoryBufferHost,
};
use codepad::kernel::services::ports::Settings;
use codepad::kernel::{
    PersistentStore, SearchDebouncer, SearchEngine, SearchOptions, SearchResults, WorkspaceManager,
};
use codepad::logging;
use codepad::models::{ExportDocument, ItemId};

#[derive(Parser)]
#[command(name = "codepad")]
#[command(version, about = "Persistent code workspace: files, folders, search & replace")]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace document (defaults to workspace.json in the app data dir)
    #[arg(long, env = "CODEPAD_DATA", global = true)]
    data: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every folder and file path
    Tree,

    /// Create a folder
    Mkdir {
        name: String,
        /// Parent folder path, e.g. /src
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Create a file seeded with the language starter
    New {
        /// File name; the language's default name when omitted
        name: Option<String>,
        #[arg(short, long)]
        language: Option<String>,
        #[arg(id = "lang_version", long = "lang-version")]
        version: Option<String>,
        /// Parent folder path, e.g. /src/utils
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Search every file; without a query, each stdin line is a new query,
    /// debounced like typing into a search box
    Search {
        query: Option<String>,
        #[command(flatten)]
        flags: MatchFlags,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace every match in every file
    Replace {
        query: String,
        replacement: String,
        #[command(flatten)]
        flags: MatchFlags,
    },

    /// Write a JSON backup of the whole workspace
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the workspace with a JSON backup
    Import { input: PathBuf },

    /// Print the workspace theme, or set it
    Theme { name: Option<String> },

    /// Delete every file, folder and workspace setting
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Clone, Copy)]
struct MatchFlags {
    /// Treat the query as a regular expression
    #[arg(short = 'r', long)]
    regex: bool,
    #[arg(short = 'c', long)]
    case_sensitive: bool,
    #[arg(short = 'w', long)]
    whole_word: bool,
}

impl From<MatchFlags> for SearchOptions {
    fn from(flags: MatchFlags) -> Self {
        SearchOptions {
            regex: flags.regex,
            case_sensitive: flags.case_sensitive,
            whole_word: flags.whole_word,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = ensure_settings_file() {
        eprintln!("warning: {e}");
    }
    let (settings, settings_error) = match load_settings() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    let filter = match cli.verbose {
        0 => settings.log_filter.clone(),
        1 => Some("codepad=debug".to_string()),
        _ => Some("codepad=trace".to_string()),
    };
    let _logging = logging::init(None, filter.as_deref());
    if let Some(e) = settings_error {
        tracing::warn!(error = %e, "invalid settings, using defaults");
        eprintln!("warning: {e}; using default settings");
    }

    let data = match cli.data {
        Some(path) => path,
        None => get_store_path().context("cannot determine application data directory")?,
    };
    let engine = JsonFileEngine::open(&data)
        .with_context(|| format!("failed to open workspace {}", data.display()))?;
    let store = Arc::new(PersistentStore::open(Arc::new(engine))?);
    store.ensure_workspace_state(&settings.theme)?;

    match cli.command {
        Commands::Tree => print_tree(&store),
        Commands::Mkdir { name, parent } => {
            let parent_id = resolve_folder(&store, parent)?;
            let folder = store.create_folder(&name, parent_id.as_ref())?;
            println!("{}/ ({})", folder.path, folder.id);
            Ok(())
        }
        Commands::New {
            name,
            language,
            version,
            parent,
        } => create_file(&store, &settings, name, language, version, parent),
        Commands::Search { query, flags, json } => {
            let engine = SearchEngine::new(store);
            match query {
                Some(query) => print_results(&engine.search(&query, flags.into())?, json),
                None => search_stdin(&engine, &settings, flags.into(), json),
            }
        }
        Commands::Replace {
            query,
            replacement,
            flags,
        } => {
            let engine = SearchEngine::new(store);
            let results = engine.search(&query, flags.into())?;
            let summary = engine.replace_all_across_files(&results, &replacement)?;
            println!(
                "replaced {} matches in {} files",
                summary.replacements, summary.files
            );
            Ok(())
        }
        Commands::Export { output } => {
            let doc = store.export_all()?;
            let text = serde_json::to_string_pretty(&doc)?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => writeln!(io::stdout(), "{text}")?,
            }
            Ok(())
        }
        Commands::Import { input } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let doc: ExportDocument =
                serde_json::from_str(&text).context("invalid backup document")?;
            let summary = store.import_all(doc)?;
            println!(
                "imported {} files and {} folders",
                summary.files, summary.folders
            );
            Ok(())
        }
        Commands::Theme { name } => {
            let mut state = store.get_workspace_state()?;
            if let Some(name) = name {
                state.theme = name;
                store.save_workspace_state(&state)?;
            }
            println!("{}", state.theme);
            Ok(())
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("refusing to wipe the workspace without --yes");
            }
            store.clear_all()?;
            println!("workspace cleared");
            Ok(())
        }
    }
}

fn print_results(results: &SearchResults, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    for file in &results.files {
        for m in &file.matches {
            println!("{}:{}:{}: {}", file.file_name, m.line, m.column, m.line_text);
        }
    }
    eprintln!(
        "{} matches in {} files",
        results.total_matches(),
        results.files.len()
    );
    Ok(())
}

/// Feeds stdin lines through the debouncer; a query runs once input has
/// been quiet for the configured delay.
fn search_stdin(
    engine: &SearchEngine,
    settings: &Settings,
    options: SearchOptions,
    json: bool,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut debouncer = SearchDebouncer::new(settings.search_debounce());
    let mut input_open = true;
    loop {
        let received = match (debouncer.deadline(), input_open) {
            (Some(deadline), true) => {
                rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            (Some(deadline), false) => {
                std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                Err(RecvTimeoutError::Timeout)
            }
            (None, true) => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            (None, false) => break,
        };
        match received {
            Ok(query) => debouncer.input(query, options),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => input_open = false,
        }

        if let Some(pending) = debouncer.poll(Instant::now()) {
            tracing::debug!(query = %pending.query, "debounced query issued");
            print_results(&engine.search(&pending.query, pending.options)?, json)?;
        }
    }
    Ok(())
}

fn print_tree(store: &PersistentStore) -> Result<()> {
    let mut entries: Vec<(String, bool)> = store
        .get_all_folders()?
        .into_iter()
        .map(|f| (f.path, true))
        .chain(store.get_all_files()?.into_iter().map(|f| (f.path, false)))
        .collect();
    entries.sort();
    for (path, is_dir) in entries {
        if is_dir {
            println!("{path}/");
        } else {
            println!("{path}");
        }
    }
    Ok(())
}

fn create_file(
    store: &Arc<PersistentStore>,
    settings: &Settings,
    name: Option<String>,
    language: Option<String>,
    version: Option<String>,
    parent: Option<String>,
) -> Result<()> {
    let parent_id = resolve_folder(store, parent)?;

    let language = language.unwrap_or_else(|| settings.default_language.clone());
    let version = version.unwrap_or_else(|| settings.default_version.clone());

    let mut workspace = WorkspaceManager::new(
        store.clone(),
        Arc::new(BuiltinLanguages::new()),
        Arc::new(MemoryBufferHost::new()),
    )
    .with_autosave_delay(settings.autosave_delay());
    workspace.init(&settings.default_language, &settings.default_version)?;
    let tab = workspace.create_new_file(&language, &version, name.as_deref(), parent_id.as_ref())?;

    println!("{} ({})", tab.path(), tab.id());
    Ok(())
}

fn resolve_folder(store: &PersistentStore, path: Option<String>) -> Result<Option<ItemId>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let path = format!("/{}", path.trim_matches('/'));
    let folder = store
        .get_all_folders()?
        .into_iter()
        .find(|f| f.path == path)
        .with_context(|| format!("no folder at {path}"))?;
    Ok(Some(folder.id))
}
