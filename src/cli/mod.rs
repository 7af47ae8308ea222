//! CLI module - Command-line interface for usrkit
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Args, Parser, Subcommand};

use crate::domain::StatusKind;

/// usrkit - user identity management
#[derive(Parser)]
#[command(name = "usrkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Register a new account
    Register {
        username: String,
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Check credentials and print the session auth key
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// List accounts matching the given filters
    #[command(alias = "ls")]
    Users(UserFilterArgs),

    /// Flip one account flag (verified, active, disabled)
    Toggle { id: i32, status: StatusKind },

    /// Issue a new activation key, invalidating the previous one
    ActivationKey { username: String },

    /// Confirm an email address with an activation key
    VerifyEmail { username: String, key: String },

    /// Change a password
    Passwd {
        username: String,
        #[arg(long)]
        current: Option<String>,
        #[arg(long)]
        new: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct UserFilterArgs {
    #[arg(long)]
    pub id: Option<i32>,
    /// Substring, case-sensitive
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub created_on: Option<String>,
    #[arg(long)]
    pub updated_on: Option<String>,
    #[arg(long)]
    pub last_visit_on: Option<String>,
    #[arg(long)]
    pub verified: Option<bool>,
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub disabled: Option<bool>,
    #[arg(long, default_value = "1")]
    pub page: u64,
    #[arg(long)]
    pub page_size: Option<u64>,
    /// Print the page as JSON
    #[arg(long)]
    pub json: bool,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchFilter;

    #[test]
    fn users_flags_map_to_search_filter() {
        let cli = Cli::try_parse_from([
            "usrkit",
            "users",
            "--updated-on",
            "2026-03-01",
            "--created-on",
            "2026-02-01",
            "--active",
            "true",
        ])
        .unwrap();

        let Some(Commands::Users(args)) = cli.command else {
            panic!("expected users command");
        };
        let filter = SearchFilter::from(&args);

        assert_eq!(filter.updated_on.as_deref(), Some("2026-03-01"));
        assert_eq!(filter.created_on.as_deref(), Some("2026-02-01"));
        assert_eq!(filter.is_active, Some(true));
        assert_eq!(filter.last_visit_on, None);
    }
}
