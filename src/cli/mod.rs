//! CLI module for the blacklist gateway
//!
//! - `serve`: run the HTTP server
//! - `sync`: rebuild tenant membership sets once and exit
//! - `sign`: print the headers a client must send for a request

pub mod serve;
pub mod sign;
pub mod sync;

use clap::{Parser, Subcommand};

/// Blacklist verification gateway
#[derive(Parser)]
#[command(name = "blacklist-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Rebuild membership sets from the canonical store and exit
    Sync(sync::SyncArgs),

    /// Compute the authentication headers for a request
    Sign(sign::SignArgs),
}
