use clap::{Parser, Subcommand};
use crumb_token::DEFAULT_SECRET_LEN;
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "crumb", version, about = "Signed-cookie session tooling")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Key management (generate HMAC secrets)
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Session token operations (mint/inspect/verify)
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },

    /// Start the demo session server.
    Serve {
        /// Path to crumb.yaml
        #[arg(long, short, default_value = "crumb.yaml")]
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a random HMAC secret.
    Generate {
        /// Directory to write secret.key into. Prints to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Number of random bytes
        #[arg(long, default_value_t = DEFAULT_SECRET_LEN)]
        length: usize,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Mint a signed session token.
    Mint {
        /// Path to crumb.yaml
        #[arg(long, short, default_value = "crumb.yaml")]
        config: PathBuf,

        /// Subject (`sub`) claim
        #[arg(long)]
        subject: Option<String>,

        /// Lifetime, e.g. "90s", "30m", "12h", "7d". Defaults to cookie.max_age_secs.
        #[arg(long)]
        ttl: Option<String>,

        /// Extension claim as key=value; JSON values are parsed (repeatable)
        #[arg(long = "claim")]
        claims: Vec<String>,

        /// Write the token to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Decode a token without verifying it.
    Inspect {
        /// Token string, or a path to a file containing one
        token: String,
    },

    /// Verify a token against the configured signing method and key.
    Verify {
        /// Path to crumb.yaml
        #[arg(long, short, default_value = "crumb.yaml")]
        config: PathBuf,

        /// Token string, or a path to a file containing one
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so minted tokens can be piped from stdout
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output, length } => commands::keys::generate(output, length)?,
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Mint {
                config,
                subject,
                ttl,
                claims,
                output,
            } => commands::token::mint(&config, subject, ttl, claims, output)?,
            TokenCommand::Inspect { token } => commands::token::inspect(token)?,
            TokenCommand::Verify { config, token } => commands::token::verify(&config, token)?,
        },

        Command::Serve { config } => commands::serve::run(&config).await?,
    }

    Ok(())
}
