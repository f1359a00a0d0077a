#![forbid(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use touch_layout::{
    bundle, ImportOutcome, LayoutContext, LayoutStore, MemoryAtlas, Settings, StaticBindings, Viewport,
};

#[derive(Parser, Debug)]
#[command(name = "touch-layout", version, about = "Manage touchscreen control layouts")]
struct Cli {
    /// Layouts directory, overriding the settings file
    #[arg(long)]
    root: Option<PathBuf>,

    /// Settings file to use instead of the platform default
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored layouts
    List,
    /// Print a layout's widgets
    Show { name: String },
    /// Write a layout and its textures to a zip bundle
    Export { name: String, dest: PathBuf },
    /// Install a layout from a zip bundle
    Import {
        archive: PathBuf,
        /// Replace an existing layout without asking
        #[arg(long)]
        yes: bool,
    },
    Rename { old: String, new: String },
    Delete { name: String },
    /// Show a widget
    Enable { layout: String, widget: String },
    /// Hide a widget
    Disable { layout: String, widget: String },
    /// Make a layout the active one
    Select { name: String },
}

fn init_logging() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

/// Layouts directory for this run. `--root` is never written back to the settings file.
fn run_root(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.root.clone().unwrap_or_else(|| settings.layouts_root())
}

fn confirm_replace(name: &str) -> bool {
    print!("Layout '{name}' already exists. Replace it? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn show(store: &mut LayoutStore, name: &str) -> Result<()> {
    let layout = store.load(name)?;
    println!(
        "{} (alpha {:.2}, left stick {}, right stick {}, taps activate {})",
        layout.name,
        layout.global_alpha,
        layout.left_joystick_enabled,
        layout.right_joystick_enabled,
        layout.tap_activates_center_object,
    );
    for button in &layout.buttons {
        let state = if button.enabled { "on " } else { "off" };
        println!(
            "  {state} {:<16} {:<14} {:<12} pos ({:.0}, {:.0}) size ({:.0}, {:.0}) {} {}",
            button.name,
            button.kind,
            button.anchor,
            button.position.x,
            button.position.y,
            button.size.x,
            button.size.y,
            button.action,
            button.key,
        );
        if !button.drawer_members.is_empty() {
            println!("      contains {}", button.drawer_members.join(", "));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::path);
    let mut settings = Settings::load_from(&settings_path)?;
    let root = run_root(&cli, &settings);
    info!(root = %root.display(), "Using layouts directory");

    let mut store = LayoutStore::open(&root)
        .with_context(|| format!("Failed to open layouts directory {:?}", root))?;

    match cli.command {
        Command::List => {
            for name in store.list()? {
                let marker = if name == settings.last_layout { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        Command::Show { name } => show(&mut store, &name)?,
        Command::Export { name, dest } => {
            let layout = store.load(&name)?;
            let written = bundle::export(&store, &layout, &dest)?;
            println!("exported {} to {}", name, written.display());
        }
        Command::Import { archive, yes } => {
            let outcome = bundle::import(&mut store, &archive, |name| yes || confirm_replace(name))
                .with_context(|| format!("Failed to import {:?}", archive))?;
            match outcome {
                ImportOutcome::Imported(layout) => println!("imported {}", layout.name),
                ImportOutcome::Declined { name } => println!("kept existing {name}"),
            }
        }
        Command::Rename { old, new } => {
            store.rename(&old, &new)?;
            if settings.last_layout == old {
                settings.last_layout = new.clone();
                settings.save_to(&settings_path)?;
            }
            println!("renamed {old} to {new}");
        }
        Command::Delete { name } => {
            store.delete(&name)?;
            println!("deleted {name}");
        }
        Command::Enable { layout, widget } => {
            store.set_widget_enabled(&layout, &widget, true)?;
            println!("{layout}: {widget} enabled");
        }
        Command::Disable { layout, widget } => {
            store.set_widget_enabled(&layout, &widget, false)?;
            println!("{layout}: {widget} disabled");
        }
        Command::Select { name } => {
            drop(store);
            let mut ctx = LayoutContext::open_in(
                &root,
                settings,
                StaticBindings::new(),
                MemoryAtlas::new(),
                Viewport::new(1920.0, 1080.0),
            )?
            .with_settings_file(&settings_path);
            let selected = ctx.switch_layout(&name)?.name.clone();
            println!("selected {selected}");
        }
    }

    Ok(())
}
