use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli;

use cli::bucket::BucketCommand;
use cli::completions::CompletionsCommand;
use cli::config::ConfigCommand;
use cli::drain::DrainCommand;
use cli::exec::ExecCommand;
use cli::innodb::InnodbCommand;
use cli::join_token::JoinTokenCommand;
use cli::label::LabelCommand;

#[derive(Parser)]
#[command(name = "nodeops")]
#[command(version)]
#[command(
    about = "Day-2 operations for Kubernetes nodes, MinIO and MySQL InnoDB clusters over SSH",
    long_about = None
)]
pub struct Cli {
    /// Enable debug logging for nodeops
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    JoinToken(JoinTokenCommand),
    Drain(DrainCommand),
    Label(LabelCommand),
    Bucket(BucketCommand),
    Innodb(InnodbCommand),
    Exec(ExecCommand),
    Config(ConfigCommand),
    Completions(CompletionsCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info,nodeops=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::JoinToken(cmd) => cmd.execute(),
        Commands::Drain(cmd) => cmd.execute(),
        Commands::Label(cmd) => cmd.execute(),
        Commands::Bucket(cmd) => cmd.execute(),
        Commands::Innodb(cmd) => cmd.execute(),
        Commands::Exec(cmd) => cmd.execute(),
        Commands::Config(cmd) => cmd.execute(),
        Commands::Completions(cmd) => cmd.execute(),
    }
}
