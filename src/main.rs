use std::io::{self, BufRead, Write};
use std::process;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rowstore::engine::{parse_meta_command, prepare_statement, MetaCommand};
use rowstore::{Database, TableConfig};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rowstore=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        println!("Must supply a database filename.");
        process::exit(1);
    };

    let config = match TableConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let db = match Database::open_with_config(&path, config) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(path = %path, "Unable to open database: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(db) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

/// Reads lines until `.exit` or end of input, then closes the database.
fn run(mut db: Database) -> rowstore::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("db > ");
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim_end();

        if line.starts_with('.') {
            match parse_meta_command(line) {
                Some(MetaCommand::Exit) => break,
                Some(MetaCommand::BTree) => {
                    println!("Tree:");
                    print!("{}", db.tree()?);
                }
                Some(MetaCommand::Constants) => {
                    println!("Constants:");
                    print!("{}", db.constants());
                }
                None => println!("Unrecognized command '{line}'"),
            }
            continue;
        }

        let statement = match prepare_statement(line) {
            Ok(statement) => statement,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let result = db.execute(&statement, |row| println!("{row}"))?;
        println!("{result}");
    }

    db.close()
}
