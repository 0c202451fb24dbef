use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "foxfury")]
#[command(author, version, about = "Telegram tap-to-earn bot with a Mini App HTTP backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot and the Mini App API (the default when no subcommand is given)
    Run,

    /// Apply database migrations and exit (does not require a bot token)
    Migrate,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
