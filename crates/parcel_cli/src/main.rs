//! Command-line front end for the parcel store.
//!
//! # Responsibility
//! - Map flags and environment to a database and logging setup.
//! - Run one parcel use-case per invocation and print JSON results.

use clap::{Parser, Subcommand};
use log::error;
use parcel_core::db::open_db;
use parcel_core::{
    init_logging, ClientId, LogLevel, ParcelNumber, ParcelService, SqliteParcelStore,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "parcel", version, about = "Track parcels in a SQLite database")]
struct Cli {
    /// SQLite database file, created on first use. Required by every parcel command.
    #[arg(long, env = "PARCEL_DB", global = true)]
    db: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(
        long,
        env = "PARCEL_LOG_LEVEL",
        global = true,
        value_parser = LogLevel::parse,
        default_value_t = LogLevel::default_for_build()
    )]
    log_level: LogLevel,
    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long, env = "PARCEL_LOG_DIR", global = true)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new parcel for a client.
    Register {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
    },
    /// Show one parcel.
    Show { number: ParcelNumber },
    /// List all parcels of a client.
    Client { client: ClientId },
    /// Advance a parcel to its next status.
    NextStatus { number: ParcelNumber },
    /// Change the address of a registered parcel.
    SetAddress {
        number: ParcelNumber,
        address: String,
    },
    /// Delete a registered parcel.
    Delete { number: ParcelNumber },
    /// Print core linkage info.
    Ping,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(cli.log_level.as_str(), log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, Box<dyn std::error::Error>> {
    if let Command::Ping = cli.command {
        return Ok(format!(
            "parcel_core ping={} version={}",
            parcel_core::ping(),
            parcel_core::core_version()
        ));
    }

    let db = cli
        .db
        .as_ref()
        .ok_or("no database given; pass --db <FILE> or set PARCEL_DB")?;
    let conn = open_db(db)?;
    let service = ParcelService::new(SqliteParcelStore::try_new(&conn)?);

    let output = match &cli.command {
        Command::Register { client, address } => {
            serde_json::to_string_pretty(&service.register(*client, address.as_str())?)?
        }
        Command::Show { number } => serde_json::to_string_pretty(&service.parcel(*number)?)?,
        Command::Client { client } => {
            serde_json::to_string_pretty(&service.client_parcels(*client)?)?
        }
        Command::NextStatus { number } => {
            let status = service.next_status(*number)?;
            format!("parcel {number} is now {status}")
        }
        Command::SetAddress { number, address } => {
            service.change_address(*number, address)?;
            format!("parcel {number} address updated")
        }
        Command::Delete { number } => {
            service.delete(*number)?;
            format!("parcel {number} deleted")
        }
        Command::Ping => unreachable!("handled before opening the database"),
    };

    Ok(output)
}
