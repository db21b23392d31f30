//! CLI entry point for the Foodstagram admin tool.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use foodstagram_store::SqliteStore;

use foodstagram_admin::commands;
use foodstagram_admin::config::{load_admin_config, OutputConfig};

#[derive(Parser)]
#[command(name = "foodstagram-admin")]
#[command(about = "Inspect and maintain a Foodstagram database")]
struct Cli {
    /// Config file prefix (default: foodstagram).
    #[arg(short, long, default_value = "foodstagram")]
    config: String,

    /// Override the database path from config.
    #[arg(short, long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database (if needed), migrate it, and print row counts.
    Init,
    /// List every user with follower and post counts.
    Users,
    /// List every post, oldest first.
    Posts,
    /// Show the feed of a user: posts by accounts they follow, newest first.
    Feed { username: String },
    /// Register a new user.
    CreateUser {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        bio: String,
    },
    /// Delete a user together with their posts, likes, comments and follows.
    DeleteUser { username: String },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut admin_config = load_admin_config(&cli.config)?;
    if let Some(path) = cli.database {
        admin_config.store.database_path = path;
    }

    let mut store = SqliteStore::open(&admin_config.store)?;
    let output = &admin_config.output;

    match cli.command {
        Command::Init => print_json(output, &commands::table_counts(&store)?)?,
        Command::Users => print_json(output, &commands::list_users(&store)?)?,
        Command::Posts => print_json(output, &commands::list_posts(&store)?)?,
        Command::Feed { username } => print_json(output, &commands::feed(&store, &username)?)?,
        Command::CreateUser {
            username,
            password,
            bio,
        } => {
            let id = commands::create_user(&mut store, &username, &password, &bio)?;
            print_json(output, &serde_json::json!({ "created": id }))?;
        }
        Command::DeleteUser { username } => {
            let id = commands::delete_user(&mut store, &username)?;
            print_json(output, &serde_json::json!({ "deleted": id }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(output: &OutputConfig, value: &T) -> anyhow::Result<()> {
    let text = if output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
