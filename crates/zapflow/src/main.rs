pub mod api;
pub mod db;
pub mod error;
pub mod flow;
pub mod ingress;
pub mod outbound;
pub mod server;
pub mod settings;
pub mod utils;
pub mod whatsapp;

use clap::{Parser, Subcommand};

use error::ZapflowError;

/// The Zapflow server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Server(server::ServerArgs),
}

////////////////////////////////////////////////////////////////////////////////
// PUBLIC FUNCTION
////////////////////////////////////////////////////////////////////////////////

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ZapflowError> {
    let args = Cli::parse();
    match args.command {
        Commands::Server(server) => server::init_server(server).await,
    }
}
