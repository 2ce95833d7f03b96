use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wicket-server", about = "Admin access-control server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/wicket.toml")]
    pub config: String,

    /// Path to directory containing the exported admin UI (overrides config)
    #[arg(long)]
    pub web_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print an argon2 hash for seeding `[[admins]]` or the `admins` table.
    /// Reads the password from stdin when it is not given as an argument.
    HashPassword { password: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serving_with_bundled_config_path() {
        let args = Args::parse_from(["wicket-server"]);
        assert_eq!(args.config, "config/wicket.toml");
        assert!(args.web_dir.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn parses_hash_password_subcommand() {
        let args = Args::parse_from(["wicket-server", "hash-password", "s3cret!"]);
        match args.command {
            Some(Command::HashPassword { password }) => {
                assert_eq!(password.as_deref(), Some("s3cret!"))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
