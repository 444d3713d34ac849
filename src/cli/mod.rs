//! CLI module for the User Directory API

pub mod serve;

use clap::{Parser, Subcommand};

/// User Directory API - CRUD and search over user records
#[derive(Parser)]
#[command(name = "user-directory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,
}
