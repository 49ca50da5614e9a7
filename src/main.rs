mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, QueueCommands, RulesCommands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let db = cli.db.as_deref();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Scan { file, date, image } => {
            cli::scan::run(db, &file, date.as_deref(), image.as_deref())
        }
        Commands::Queue { command } => match command {
            QueueCommands::List { image, search } => {
                cli::queue::list(db, image.as_deref(), search.as_deref())
            }
            QueueCommands::Confirm {
                id,
                account,
                category,
            } => cli::queue::confirm(db, id, account.as_deref(), category.as_deref()),
            QueueCommands::Edit {
                id,
                date,
                description,
                amount,
                currency,
                category,
                tags,
                necessity,
                account,
            } => cli::queue::edit(
                db,
                id,
                cli::queue::EditArgs {
                    date,
                    description,
                    amount,
                    currency,
                    category,
                    tags,
                    necessity,
                },
                account.as_deref(),
            ),
            QueueCommands::Reject { id } => cli::queue::reject(db, id),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                pattern,
                category,
                priority,
                necessity,
            } => cli::rules::add(db, &pattern, &category, priority, necessity.as_deref()),
            RulesCommands::Tag { pattern, tag } => cli::rules::add_tag(db, &pattern, &tag),
            RulesCommands::List => cli::rules::list(db),
            RulesCommands::Delete { id } => cli::rules::delete(db, id),
            RulesCommands::DeleteTag { id } => cli::rules::delete_tag(db, id),
        },
        Commands::Ledger { limit } => cli::ledger::list(db, limit),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
