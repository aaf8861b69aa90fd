//! Ticket token utility
//!
//! Commands:
//! - encode: Print the QR token for a registration id
//! - decode: Print the registration id carried by a token

use clap::{Parser, Subcommand};
use checkin_common::ticket;

#[derive(Parser)]
#[command(name = "checkin-ticket")]
#[command(about = "Encode and decode event check-in ticket tokens")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token to embed in a ticket QR code
    Encode {
        /// Registration id
        registration_id: String,
    },

    /// Print the registration id a scanned token refers to
    Decode {
        /// Scanned token (`REG_TICKET:<id>`) or bare id
        token: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { registration_id } => println!("{}", ticket::encode(registration_id.trim())),
        Commands::Decode { token } => println!("{}", ticket::decode(token.trim()).trim()),
    }
}
