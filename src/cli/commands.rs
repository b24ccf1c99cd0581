//! CLI command definitions

use clap::{Args, Parser, Subcommand};

const MAX_AGE_LIMIT: u64 = 10 * 365 * 24 * 60 * 60;
const CLOCK_SKEW_LIMIT: u64 = 24 * 60 * 60;

#[derive(Parser)]
#[command(name = "traxx")]
#[command(about = "Signed stream keys for Traxx live broadcasts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub signing: SigningArgs,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Options shared by every command that signs or verifies keys
#[derive(Args)]
pub struct SigningArgs {
    /// Stream key signing secret
    #[arg(long, env = "STREAM_KEY_SECRET", hide_env_values = true, global = true)]
    pub secret: Option<String>,

    /// Fall back to the built-in development secret when none is configured
    #[arg(long, env = "TRAXX_ALLOW_INSECURE_SECRET", global = true)]
    pub allow_insecure_secret: bool,

    /// Maximum key age in seconds (at most ten years)
    #[arg(
        long,
        env = "STREAM_KEY_MAX_AGE",
        default_value_t = 86_400,
        value_parser = clap::value_parser!(u64).range(1..=MAX_AGE_LIMIT),
        global = true
    )]
    pub max_age: u64,

    /// Accepted clock skew, in seconds, for keys stamped in the future (at most one day)
    #[arg(
        long,
        env = "STREAM_KEY_CLOCK_SKEW",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(0..=CLOCK_SKEW_LIMIT),
        global = true
    )]
    pub clock_skew: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:5000", env = "TRAXX_BIND")]
        bind: String,
    },

    /// Issue a stream key
    ///
    /// Example:
    ///   traxx issue --user 123
    Issue {
        /// User id the key is scoped to
        #[arg(short, long, value_parser = parse_user_id)]
        user: u64,
    },

    /// Verify a stream key for a user
    ///
    /// Example:
    ///   traxx verify '123:1700000000:...' --user 123
    Verify {
        /// The stream key
        key: String,

        /// User id the key must belong to
        #[arg(short, long, value_parser = parse_user_id)]
        user: u64,
    },

    /// Show the fields of a stream key without checking its signature
    Inspect {
        /// The stream key
        key: String,
    },

    /// Generate a random signing secret
    GenSecret,
}

fn parse_user_id(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("Invalid user id: {}. Must be a positive integer", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("123"), Ok(123));
        assert!(parse_user_id("0").is_err());
        assert!(parse_user_id("-4").is_err());
        assert!(parse_user_id("abc").is_err());
    }

    #[test]
    fn test_cli_parses_issue() {
        let cli = Cli::try_parse_from(["traxx", "issue", "--user", "42", "--secret", "s"]).unwrap();
        assert!(matches!(cli.command, Commands::Issue { user: 42 }));
        assert_eq!(cli.signing.secret.as_deref(), Some("s"));
    }

    #[test]
    fn test_cli_verify_max_age_override() {
        let cli = Cli::try_parse_from([
            "traxx", "verify", "1:2:sig", "--user", "1", "--max-age", "600",
        ])
        .unwrap();
        assert_eq!(cli.signing.max_age, 600);
        assert!(matches!(cli.command, Commands::Verify { user: 1, .. }));
    }

    #[test]
    fn test_cli_bounds_max_age() {
        let overflow = u64::MAX.to_string();
        assert!(Cli::try_parse_from(["traxx", "issue", "--user", "1", "--max-age", &overflow]).is_err());
        assert!(Cli::try_parse_from(["traxx", "issue", "--user", "1", "--max-age", "0"]).is_err());

        let limit = MAX_AGE_LIMIT.to_string();
        let cli = Cli::try_parse_from(["traxx", "issue", "--user", "1", "--max-age", &limit]).unwrap();
        assert_eq!(cli.signing.max_age, MAX_AGE_LIMIT);
    }

    #[test]
    fn test_cli_bounds_clock_skew() {
        assert!(Cli::try_parse_from(["traxx", "gen-secret", "--clock-skew", "86401"]).is_err());
        let cli = Cli::try_parse_from(["traxx", "gen-secret", "--clock-skew", "0"]).unwrap();
        assert_eq!(cli.signing.clock_skew, 0);
    }

    #[test]
    fn test_cli_rejects_zero_user() {
        assert!(Cli::try_parse_from(["traxx", "issue", "--user", "0"]).is_err());
    }
}
