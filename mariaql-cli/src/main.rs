//! `mariaql <database> [-e "SQL"] [--batch]` — translate MariaDB-dialect
//! SQL and run it against MongoDB, or start the interactive shell.
//!
//! Exit codes: 0 success, 1 translation error, 2 database error, 3 usage
//! error.

mod config;
mod exec;
mod repl;
mod table;

use clap::Parser;
use config::MongoConfig;
use mariaql::TranslateOptions;
use mongodb::sync::Client;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum CliError {
    Translation(mariaql::result::Error),
    Database(String),
    Usage(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CliError::Translation(e) => write!(f, "ERROR {}: {e}", e.kind()),
            CliError::Database(e) => write!(f, "ERROR DatabaseError: {e}"),
            CliError::Usage(e) => write!(f, "ERROR Usage: {e}"),
        }
    }
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Translation(_) => 1,
            CliError::Database(_) => 2,
            CliError::Usage(_) => 3,
        }
    }
}

impl From<mariaql::result::Error> for CliError {
    fn from(e: mariaql::result::Error) -> Self {
        CliError::Translation(e)
    }
}

impl From<mongodb::error::Error> for CliError {
    fn from(e: mongodb::error::Error) -> Self {
        CliError::Database(e.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mariaql",
    version,
    about = "Translate MariaDB-dialect SQL into MongoDB invocations and run them"
)]
struct Cli {
    #[arg(index = 1, help = "The database to run against (default: MONGO_DATABASE)")]
    database: Option<String>,
    #[arg(short = 'e', long = "execute", help = "Run one statement and exit")]
    execute: Option<String>,
    #[arg(long, help = "Treat the -e input as a semicolon-delimited batch")]
    batch: bool,
    #[arg(long, help = "Print the translation as JSON instead of executing")]
    translate_only: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: Cli) -> Result<(), CliError> {
    let config = MongoConfig::from_env();
    let database = args
        .database
        .clone()
        .or_else(|| config.database.clone())
        .ok_or_else(|| {
            CliError::Usage("no database given and MONGO_DATABASE is not set".into())
        })?;
    let options = TranslateOptions::default();

    let Some(sql) = &args.execute else {
        if args.batch || args.translate_only {
            return Err(CliError::Usage(
                "--batch and --translate-only require -e".into(),
            ));
        }
        let client = connect(&config)?;
        return repl::run(&client, database, &options);
    };

    let invocations = if args.batch {
        mariaql::translate_many(sql, &database, &options)?
    } else {
        vec![mariaql::translate(sql, &database, &options)?]
    };

    if args.translate_only {
        for invocation in &invocations {
            let json = serde_json::to_string_pretty(invocation)
                .map_err(|e| CliError::Database(e.to_string()))?;
            println!("{json}");
        }
        return Ok(());
    }

    let client = connect(&config)?;
    let db = client.database(&database);
    for invocation in &invocations {
        debug!(collection = ?invocation.collection(), "dispatching invocation");
        match exec::run(&db, invocation)? {
            exec::Outcome::Rows(rows) => {
                if rows.is_empty() {
                    println!("Empty set");
                } else {
                    println!("{}", table::render(&rows));
                    println!(
                        "{} row{} in set",
                        rows.len(),
                        if rows.len() == 1 { "" } else { "s" }
                    );
                }
            }
            exec::Outcome::Affected(verb, count) => {
                println!(
                    "Query OK, {count} row{} {verb}",
                    if count == 1 { "" } else { "s" }
                );
            }
        }
    }
    Ok(())
}

fn connect(config: &MongoConfig) -> Result<Client, CliError> {
    let uri = config.uri();
    debug!(host = %config.host, port = config.port, "connecting");
    Ok(Client::with_uri_str(&uri)?)
}
