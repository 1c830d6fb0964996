// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use std::collections::HashSet;
use std::env;
use std::io;

// Use library instead of local modules
use roll_explorer::{write_summary_csv, SelectionOutcome, Session};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("regions") => run_regions()?,
        Some("analyze") => run_analyze(&args[2..])?,
        _ => run_ui_mode()?,
    }

    Ok(())
}

/// List the region directory, one "name<TAB>url" line per region
fn run_regions() -> Result<()> {
    println!("📍 Fetching region directory...");

    let session = Session::start();
    let regions = session.regions();

    if regions.is_empty() {
        println!("⚠️  No regions available (directory unavailable or empty).");
        return Ok(());
    }

    println!("✓ {} regions\n", regions.len());
    for region in regions {
        println!("{}\t{}", region.name, region.source_url);
    }

    Ok(())
}

/// One-shot load + aggregate: analyze <url> <code> [<code>...]
fn run_analyze(args: &[String]) -> Result<()> {
    let Some((url, codes)) = args.split_first() else {
        eprintln!("Usage: roll-explorer analyze <roll-url> <code> [<code>...]");
        std::process::exit(2);
    };

    let mut session = Session::new(Vec::new());

    println!("🚀 Loading roll from {}...", url);
    match session.load_region(url) {
        Ok(count) => println!("✓ Loaded {} parcel records\n", count),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    let selected: HashSet<String> = codes.iter().cloned().collect();

    match session.aggregate(&selected) {
        SelectionOutcome::NoData => {
            println!("⚠️  No records found.");
        }
        SelectionOutcome::Ready(result) => {
            println!("Selected parcels:  {}", result.building_count);
            println!("Housing units:     {}\n", result.unit_total);
            write_summary_csv(io::stdout(), &result)?;
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    println!("🖥️  Loading Roll Explorer UI...\n");

    println!("📍 Fetching region directory...");
    let session = Session::start();

    if session.regions().is_empty() {
        eprintln!("❌ No regions to choose from!");
        eprintln!("   The Données Québec directory is unavailable.");
        eprintln!("   Try again later, or use: roll-explorer analyze <url> <codes...>");
        std::process::exit(1);
    }

    println!("✓ {} regions loaded\n", session.regions().len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(session);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run one-shot: roll-explorer analyze <roll-url> <codes...>");
    std::process::exit(1);
}
