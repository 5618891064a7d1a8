//! The interactive shell: reads statements terminated by `;`, handles the
//! shell-only commands (`help`, `show collections`, `use <db>`, `quit`),
//! and hands everything else to the translator.

use crate::{exec, table, CliError};
use mariaql::TranslateOptions;
use mongodb::sync::Client;
use std::io::{self, BufRead, Write};
use std::time::Instant;

pub fn run(client: &Client, mut database: String, options: &TranslateOptions) -> Result<(), CliError> {
    let stdin = io::stdin();
    let mut buffer = String::new();

    println!("Welcome to the mariaql shell. Type 'help' for help, 'quit' to exit.");
    loop {
        if buffer.is_empty() {
            print!("mariaql [{database}]> ");
        } else {
            print!("    -> ");
        }
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            return Ok(()); // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // shell commands are single-line and not part of the SQL surface
        if buffer.is_empty() {
            match command(line) {
                Some(Command::Quit) => return Ok(()),
                Some(Command::Help) => {
                    print_help();
                    continue;
                }
                Some(Command::Use(db)) => {
                    database = db;
                    println!("Database changed");
                    continue;
                }
                Some(Command::ShowCollections) => {
                    match client.database(&database).list_collection_names().run() {
                        Ok(names) => {
                            let rows: Vec<bson::Document> = names
                                .into_iter()
                                .map(|n| bson::doc! {"Collections": n})
                                .collect();
                            print_rows(&rows, 0.0);
                        }
                        Err(e) => println!("ERROR DatabaseError: {e}"),
                    }
                    continue;
                }
                None => {}
            }
        }

        buffer.push_str(line);
        buffer.push(' ');
        if !line.ends_with(';') {
            continue;
        }
        let sql = std::mem::take(&mut buffer);

        let started = Instant::now();
        match mariaql::translate(&sql, &database, options) {
            Ok(invocation) => match exec::run(&client.database(&database), &invocation) {
                Ok(exec::Outcome::Rows(rows)) => {
                    print_rows(&rows, started.elapsed().as_secs_f64())
                }
                Ok(exec::Outcome::Affected(verb, count)) => {
                    println!(
                        "Query OK, {count} row{} {verb} ({:.2} sec)",
                        if count == 1 { "" } else { "s" },
                        started.elapsed().as_secs_f64()
                    );
                }
                Err(e) => println!("{e}"),
            },
            Err(e) => println!("ERROR {}: {e}", e.kind()),
        }
    }
}

enum Command {
    Help,
    Quit,
    Use(String),
    ShowCollections,
}

fn command(line: &str) -> Option<Command> {
    let trimmed = line.trim_end_matches(';').trim();
    let lower = trimmed.to_lowercase();
    match lower.as_str() {
        "help" => Some(Command::Help),
        "quit" | "exit" => Some(Command::Quit),
        "show collections" | "show tables" => Some(Command::ShowCollections),
        _ if lower.starts_with("use ") => {
            Some(Command::Use(trimmed[4..].trim().to_string()))
        }
        _ => None,
    }
}

fn print_rows(rows: &[bson::Document], seconds: f64) {
    if rows.is_empty() {
        println!("Empty set ({seconds:.2} sec)");
        return;
    }
    println!("{}", table::render(rows));
    println!(
        "{} row{} in set ({seconds:.2} sec)",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    );
}

fn print_help() {
    println!("Enter MariaDB-dialect SQL terminated by ';'.");
    println!("Shell commands:");
    println!("  help                 show this help");
    println!("  show collections     list collections in the current database");
    println!("  use <db>             switch database");
    println!("  quit | exit          leave the shell");
}
