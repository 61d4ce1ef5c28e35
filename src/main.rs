//! Astrophysics Calculator
//!
//! Command-line front end. Each invocation runs one calculation pass against
//! the session stored in the SQLite database.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use astro_calculator::calculator::{self, Snapshot};
use astro_calculator::capacity;
use astro_calculator::config::{Field, SessionConfig};
use astro_calculator::conversion::Command;
use astro_calculator::db;
use astro_calculator::fleet;
use astro_calculator::models::{FleetLine, Resource};
use astro_calculator::units::{format_quantity, parse_count};

#[derive(Parser)]
#[command(name = "astro-calculator")]
#[command(about = "Resource balance and conversion calculator for astrophysics research")]
struct Cli {
    /// Path to the SQLite session database
    #[arg(short, long, default_value = "astro_calc.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty session database
    Init,

    /// Replace the session inputs with a JSON config file
    Import {
        /// Path to the session config
        path: PathBuf,
    },

    /// Print the session inputs as JSON
    Export,

    /// Set one input (e.g. "stock.metal", "rates.crystal", "storage.level.deuterium", "debris")
    Set {
        field: String,
        value: String,
    },

    /// Add a row of lost ships to the fleet
    AddShip {
        /// Ship key (see `ships`)
        ship: String,
        /// Number of ships lost
        quantity: String,
    },

    /// List the fleet rows with their row numbers
    Fleet,

    /// Remove one fleet row
    RemoveShip {
        /// Row number as shown by `fleet`
        row: usize,
    },

    /// Change the quantity of one fleet row
    SetShip {
        /// Row number as shown by `fleet`
        row: usize,
        quantity: String,
    },

    /// Remove all fleet rows
    ClearFleet,

    /// List the ship catalog
    Ships,

    /// Show storage capacity for the given levels using the session bonuses
    Capacity {
        levels: Vec<i64>,
    },

    /// Calculate deficits, surpluses and the plan to cover them
    Calc {
        /// Show the per-ship debris breakdown and debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Convert surplus of one resource into a missing one ("none" for no selection)
    Convert {
        from: String,
        to: String,
    },

    /// Forget all applied conversions
    ClearConversion,

    /// Forget all inputs and conversions
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Calc { verbose: true });
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if verbose {
        "debug"
    } else {
        "warn"
    }))
    .init();

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { path } => {
            let config = SessionConfig::from_file(&path)?;
            db::save_config(&conn, &config)?;
            println!("Imported session from {}", path.display());
        }

        Commands::Export => {
            let config = db::load_config(&conn)?;
            println!("{}", config.to_json_string()?);
        }

        Commands::Set { field, value } => {
            let field: Field = field.parse()?;
            let mut config = db::load_config(&conn)?;
            config.set_field(field, &value)?;
            db::save_config(&conn, &config)?;
            println!("Set {}. Run 'calc' to update the results.", field);
        }

        Commands::AddShip { ship, quantity } => {
            let ship_type =
                fleet::find_ship(&ship).ok_or_else(|| anyhow!("Unknown ship '{}'. Run 'ships' for the catalog.", ship))?;
            let mut config = db::load_config(&conn)?;
            config.fleet.push(FleetLine {
                ship: ship_type.key.to_string(),
                quantity: parse_count(&quantity),
            });
            db::save_config(&conn, &config)?;
            println!("Added {} x {}", format_quantity(parse_count(&quantity) as f64), ship_type.name);
        }

        Commands::Fleet => {
            let config = db::load_config(&conn)?;
            if config.fleet.is_empty() {
                println!("No ships in the fleet.");
            }
            for (i, line) in config.fleet.iter().enumerate() {
                let name = fleet::find_ship(&line.ship).map_or(line.ship.as_str(), |s| s.name);
                println!("{:>3}  {:<18} {:>10}", i + 1, name, format_quantity(line.quantity as f64));
            }
        }

        Commands::RemoveShip { row } => {
            let mut config = db::load_config(&conn)?;
            let removed = config.remove_fleet_row(row)?;
            db::save_config(&conn, &config)?;
            println!("Removed row {} ({} x {})", row, format_quantity(removed.quantity as f64), removed.ship);
        }

        Commands::SetShip { row, quantity } => {
            let mut config = db::load_config(&conn)?;
            let line = config.set_fleet_quantity(row, &quantity)?.clone();
            db::save_config(&conn, &config)?;
            println!("Row {} is now {} x {}", row, format_quantity(line.quantity as f64), line.ship);
        }

        Commands::ClearFleet => {
            let mut config = db::load_config(&conn)?;
            config.fleet.clear();
            db::save_config(&conn, &config)?;
            println!("Fleet cleared.");
        }

        Commands::Ships => {
            println!("{:<6} {:<18} {:>12} {:>12} {:>12}", "Key", "Ship", "Metal", "Crystal", "Deuterium");
            println!("{}", "-".repeat(64));
            for s in fleet::SHIPS {
                println!(
                    "{:<6} {:<18} {:>12} {:>12} {:>12}",
                    s.key,
                    s.name,
                    format_quantity(s.metal_cost),
                    format_quantity(s.crystal_cost),
                    format_quantity(s.deuterium_cost)
                );
            }
        }

        Commands::Capacity { levels } => {
            let config = db::load_config(&conn)?.sanitized();
            let class_bonus = config.storage.ally_class.storage_bonus_percent();
            println!("{:>6} {:>14}", "Level", "Capacity");
            for level in levels {
                let cap = capacity::capacity(level, config.storage.bonus_percent, class_bonus);
                println!("{:>6} {:>14}", level, format_quantity(cap));
            }
        }

        Commands::Calc { verbose } => {
            let snapshot = run_pass(&conn, Command::Recalculate)?;
            if verbose && !snapshot.fleet.lines.is_empty() {
                println!("Lost fleet:\n");
                println!("{}", calculator::format_fleet_lines(&snapshot.fleet));
            }
            println!("{}", snapshot);
        }

        Commands::Convert { from, to } => {
            let from = Resource::parse_selection(&from)?;
            let to = Resource::parse_selection(&to)?;
            let snapshot = run_pass(&conn, Command::ApplyConversion { from, to })?;
            println!("{}", snapshot);
        }

        Commands::ClearConversion => {
            let snapshot = run_pass(&conn, Command::ClearConversion)?;
            println!("{}", snapshot);
        }

        Commands::Reset => {
            db::clear_session(&conn)?;
            run_pass(&conn, Command::Reset)?;
            println!("Session reset.");
        }
    }

    Ok(())
}

/// Run one pass against the stored session and persist the new conversion state
fn run_pass(conn: &Connection, command: Command) -> Result<Snapshot> {
    let config = db::load_config(conn)?;
    let state = db::load_conversion_state(conn)?;
    let (next, snapshot) = calculator::run(&state, &config, command);
    db::save_conversion_state(conn, &next)?;
    Ok(snapshot)
}
