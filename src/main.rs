// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CLI entry point for rekey
//!
//! Runs the remapper (with or without a window) and edits the mapping file
//! from the shell. Edits made here reach a running instance through its
//! file watch.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use rekey::{
    config::ConfigStore,
    core::{ConflictDetector, KeyMapping, KeyNames, MappingId},
    hook::{OfflineHook, X11Hook},
    remapper::{LoadReport, MappingEdit, RemapEvent, Remapper, Setting},
    runtime::Session,
    ui::App,
};
use std::{cell::Cell, path::PathBuf, rc::Rc};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rekey")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mapping file (default: ~/.config/rekey/mappings.json)
    #[arg(short, long, global = true, env = "REKEY_CONFIG")]
    config: Option<PathBuf>,

    /// Log more detail (debug level)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start remapping (the default). Opens the window unless started minimized.
    Run {
        /// Never open a window; stop with Ctrl+C
        #[arg(long)]
        headless: bool,
    },

    /// Start remapping and always open the window
    Gui,

    /// List all mappings
    List,

    /// Report source keys claimed by more than one mapping
    Check,

    /// Add a mapping, e.g. `rekey add Ctrl+Alt+T Ctrl+Shift+T`
    Add {
        /// Combo to intercept
        source: String,

        /// Combos to type instead, in order (or text with --text)
        #[arg(required = true, num_args = 1..)]
        target: Vec<String>,

        /// Type the target as literal text
        #[arg(long)]
        text: bool,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete a mapping
    Remove { id: String },

    /// Enable a mapping
    Enable { id: String },

    /// Disable a mapping
    Disable { id: String },

    /// Change parts of a mapping
    Edit {
        id: String,

        #[arg(long)]
        source: Option<String>,

        /// Space-separated combos (or text with --text)
        #[arg(long)]
        target: Option<String>,

        #[arg(long, requires = "target")]
        text: bool,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Print the next combo pressed anywhere on the desktop
    Capture {
        /// Give up after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout: u32,
    },

    /// Change a setting
    Set {
        setting: SettingArg,
        value: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SettingArg {
    StartMinimized,
    EnableOnStartup,
}

impl From<SettingArg> for Setting {
    fn from(arg: SettingArg) -> Self {
        match arg {
            SettingArg::StartMinimized => Setting::StartMinimized,
            SettingArg::EnableOnStartup => Setting::EnableOnStartup,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    #[value(alias = "true", alias = "yes")]
    On,
    #[value(alias = "false", alias = "no")]
    Off,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = resolve_store(cli.config)?;

    match cli.command.unwrap_or(Commands::Run { headless: false }) {
        Commands::Run { headless } => run(store, headless, false)?,
        Commands::Gui => run(store, false, true)?,
        Commands::List => list_mappings(&store)?,
        Commands::Check => check_shadowed(&store)?,
        Commands::Add {
            source,
            target,
            text,
            description,
        } => add_mapping(store, &source, &target.join(" "), text, description)?,
        Commands::Remove { id } => {
            let mut remapper = offline_remapper(store)?;
            remapper.remove_mapping(&MappingId::from(id.as_str()))?;
            println!("{} Removed {}", "✓".green(), id.yellow());
        }
        Commands::Enable { id } => toggle_mapping(store, &id, true)?,
        Commands::Disable { id } => toggle_mapping(store, &id, false)?,
        Commands::Edit {
            id,
            source,
            target,
            text,
            description,
        } => edit_mapping(store, &id, source, target, text, description)?,
        Commands::Capture { timeout } => capture_combo(store, timeout)?,
        Commands::Set { setting, value } => {
            let mut remapper = offline_remapper(store)?;
            let value = matches!(value, Toggle::On);
            remapper.set_setting(setting.into(), value);
            println!("{} Setting saved", "✓".green());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins unless `-v` was given
fn init_logging(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("rekey=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rekey=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_store(config: Option<PathBuf>) -> anyhow::Result<ConfigStore> {
    let path = match config {
        Some(path) => {
            let raw = path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;
            PathBuf::from(shellexpand::tilde(raw).as_ref())
        }
        None => ConfigStore::default_path()?,
    };

    Ok(ConfigStore::new(path))
}

fn print_load_report(report: &LoadReport) {
    if let Some(problem) = &report.problem {
        println!("{} {}, starting empty", "⚠".yellow(), problem);
    }
    if let Some(copy) = &report.recovered_to {
        println!(
            "{} Mapping file was unreadable; a copy was kept at {}",
            "⚠".yellow(),
            copy.display()
        );
    }
    if report.skipped > 0 {
        println!("{} Skipped {} invalid mapping(s)", "⚠".yellow(), report.skipped);
    }
    for failure in &report.failed {
        println!("{} {}", "✗".red(), failure);
    }
}

// ============================================================================
// Running
// ============================================================================

fn run(store: ConfigStore, headless: bool, force_window: bool) -> anyhow::Result<()> {
    let (session, report) = Session::connect(store).context("Could not start interception")?;
    print_load_report(&report);

    let minimized = session.read(|r| r.settings().start_minimized);
    if headless || (minimized && !force_window) {
        session.run_headless();
        return Ok(());
    }

    let code = App::new(session).run();
    if code != gtk4::glib::ExitCode::SUCCESS {
        bail!("GTK application exited with an error");
    }
    Ok(())
}

fn capture_combo(store: ConfigStore, timeout: u32) -> anyhow::Result<()> {
    let hook = X11Hook::connect().context("Could not connect to the X server")?;
    // No load: nothing is grabbed while recording
    let session = Session::new(Remapper::new(Box::new(hook), store));

    let main_loop = gtk4::glib::MainLoop::new(None, false);
    let captured = Rc::new(Cell::new(None));

    {
        let captured = captured.clone();
        let main_loop = main_loop.clone();
        session.subscribe(move |event| {
            if let RemapEvent::KeyCaptured(combo) = event {
                captured.set(Some(*combo));
                main_loop.quit();
            }
        });
    }

    session.with(|r| r.begin_capture())?;
    session.attach_engine();

    {
        let main_loop = main_loop.clone();
        gtk4::glib::timeout_add_seconds_local_once(timeout, move || main_loop.quit());
    }

    println!("{} Press the combo to record...", "→".cyan());
    main_loop.run();
    session.shutdown();

    match captured.get() {
        Some(combo) => {
            println!("{}", combo.to_string().cyan().bold());
            Ok(())
        }
        None => bail!("Nothing was pressed within {} seconds", timeout),
    }
}

// ============================================================================
// Reading
// ============================================================================

fn list_mappings(store: &ConfigStore) -> anyhow::Result<()> {
    let loaded = store.load();
    if let Some(problem) = &loaded.problem {
        bail!("{}", problem);
    }

    println!("{}", format!("Mappings from: {}\n", store.path().display()).bold());

    for mapping in &loaded.mappings {
        print_mapping(mapping);
    }

    let enabled = loaded.mappings.iter().filter(|m| m.enabled).count();
    println!(
        "\n{} Total: {} mappings ({} enabled)",
        "✓".green(),
        loaded.mappings.len(),
        enabled
    );
    println!(
        "  start_minimized = {}, enable_on_startup = {}",
        loaded.settings.start_minimized, loaded.settings.enable_on_startup
    );
    if loaded.skipped > 0 {
        println!("{} {} entries could not be read", "⚠".yellow(), loaded.skipped);
    }

    Ok(())
}

fn print_mapping(mapping: &KeyMapping) {
    let state = if mapping.enabled {
        "on ".green()
    } else {
        "off".dimmed()
    };
    let description = if mapping.description.is_empty() {
        String::new()
    } else {
        format!("  ({})", mapping.description)
    };

    println!(
        "{} {} {} → {}{}",
        mapping.id.as_str().yellow(),
        state,
        mapping.source.to_string().cyan().bold(),
        mapping.target_label().green(),
        description.dimmed()
    );
}

fn check_shadowed(store: &ConfigStore) -> anyhow::Result<()> {
    let loaded = store.load();
    if let Some(problem) = &loaded.problem {
        bail!("{}", problem);
    }
    println!("{} Checking: {}", "→".cyan(), store.path().display());
    println!("{} Found {} mappings\n", "✓".green(), loaded.mappings.len());

    let conflicts = ConflictDetector::from_mappings(&loaded.mappings).find_conflicts();

    if conflicts.is_empty() {
        println!("{} {}", "✓".green().bold(), "Every source key is unique".bold());
        return Ok(());
    }

    println!(
        "{} Found {} shared source key{}:\n",
        "✗".red().bold(),
        conflicts.len(),
        if conflicts.len() == 1 { "" } else { "s" }
    );

    for (i, conflict) in conflicts.iter().enumerate() {
        println!(
            "{} {}",
            format!("Source {}", i + 1).yellow().bold(),
            conflict.source.to_string().cyan()
        );
        for mapping in &conflict.mappings {
            print!("  ");
            print_mapping(mapping);
        }
        println!();
    }

    println!("{}", "⚠ Only one mapping per source key can be enabled".yellow());
    std::process::exit(1);
}

// ============================================================================
// Editing
// ============================================================================

/// Orchestrator over the offline engine: validates and saves, grabs nothing
fn offline_remapper(store: ConfigStore) -> anyhow::Result<Remapper> {
    let mut remapper = Remapper::new(Box::new(OfflineHook::new()), store);
    let report = remapper.load_as_written();
    print_load_report(&report);
    if let (Some(problem), None) = (&report.problem, &report.recovered_to) {
        bail!("Refusing to edit: {}", problem);
    }
    Ok(remapper)
}

fn parse_target(target: &str, text: bool) -> anyhow::Result<Vec<rekey::KeyCombo>> {
    let names = KeyNames::global();
    let combos = if text {
        names.expand_text(target)
    } else {
        names.parse_sequence(target)
    };
    combos.with_context(|| format!("Invalid target: {}", target))
}

fn add_mapping(
    store: ConfigStore,
    source: &str,
    target: &str,
    text: bool,
    description: String,
) -> anyhow::Result<()> {
    let source = KeyNames::global()
        .parse_combo(source)
        .with_context(|| format!("Invalid source: {}", source))?;
    let target = parse_target(target, text)?;

    let mut remapper = offline_remapper(store)?;
    let id = remapper.add_mapping(source, target, description)?;

    if let Some(mapping) = remapper.mapping(&id) {
        print!("{} Added ", "✓".green());
        print_mapping(mapping);
    }
    Ok(())
}

fn toggle_mapping(store: ConfigStore, id: &str, enabled: bool) -> anyhow::Result<()> {
    let mut remapper = offline_remapper(store)?;
    let id = MappingId::from(id);
    remapper.set_enabled(&id, enabled)?;

    if let Some(mapping) = remapper.mapping(&id) {
        print_mapping(mapping);
    }
    Ok(())
}

fn edit_mapping(
    store: ConfigStore,
    id: &str,
    source: Option<String>,
    target: Option<String>,
    text: bool,
    description: Option<String>,
) -> anyhow::Result<()> {
    let source = source
        .map(|s| {
            KeyNames::global()
                .parse_combo(&s)
                .with_context(|| format!("Invalid source: {}", s))
        })
        .transpose()?;
    let target = target.map(|t| parse_target(&t, text)).transpose()?;

    if source.is_none() && target.is_none() && description.is_none() {
        bail!("Nothing to change: pass --source, --target or --description");
    }

    let mut remapper = offline_remapper(store)?;
    let id = MappingId::from(id);
    remapper.edit_mapping(
        &id,
        MappingEdit {
            source,
            target,
            description,
        },
    )?;

    if let Some(mapping) = remapper.mapping(&id) {
        print!("{} Updated ", "✓".green());
        print_mapping(mapping);
    }
    Ok(())
}
