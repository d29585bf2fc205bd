use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokenward_core::TokenwardConfig;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::token::{MintOptions, VerifyOptions};

#[derive(Parser, Debug)]
#[command(name = "tokenward", version, about = "Mint and verify signed JWTs")]
struct Cli {
    /// Configuration file (YAML).
    #[arg(long, global = true, env = "TOKENWARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Key file management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Token issuance and verification
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new random HMAC key file.
    Generate {
        /// Algorithm: HS256, HS384 or HS512
        #[arg(long, default_value = "HS256")]
        alg: String,

        /// Key identifier written into issued token headers
        #[arg(long)]
        kid: Option<String>,

        /// Write the key file here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Sign a claims set into a compact token.
    Mint {
        /// Signing key: a key file path or the key file JSON
        #[arg(long, env = "TOKENWARD_SIGNING_KEY")]
        key: Option<String>,

        /// Claims JSON: a file path, `-` for stdin, or inline JSON
        #[arg(long)]
        claims: Option<String>,

        /// Issuer (`iss`)
        #[arg(long)]
        iss: Option<String>,

        /// Subject (`sub`)
        #[arg(long)]
        sub: Option<String>,

        /// Audience (`aud`); repeat for several audiences
        #[arg(long)]
        aud: Vec<String>,

        /// Lifetime from now (e.g. "1h", "7d"); sets `exp`
        #[arg(long)]
        expires: Option<String>,

        /// Delay from now before the token is valid; sets `nbf`
        #[arg(long = "not-before")]
        not_before: Option<String>,

        /// Token identifier (`jti`)
        #[arg(long)]
        jti: Option<String>,

        /// Write the token here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Verify a token and print its claims.
    Verify {
        /// Token string, token file, or `-` for stdin
        token: String,

        /// Key file or key directory
        #[arg(long, env = "TOKENWARD_KEYS")]
        keys: Option<PathBuf>,

        /// Accepted audience; repeat for several
        #[arg(long)]
        audience: Vec<String>,

        /// Allowed clock skew in seconds for `exp` and `nbf`
        #[arg(long)]
        leeway: Option<u64>,

        /// Reject tokens without an `aud` claim
        #[arg(long, default_value_t = false)]
        require_audience: bool,

        /// Only try keys whose `kid` matches the token header
        #[arg(long = "require-kid-match", default_value_t = false)]
        require_kid_match: bool,
    },

    /// Show a token's header and payload without verifying it.
    Inspect {
        /// Token string, token file, or `-` for stdin
        token: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TokenwardConfig::load_with_context(path)?,
        None => TokenwardConfig::default(),
    };

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { alg, kid, output } => {
                commands::keys::generate(&alg, kid, output)
            }
        },
        Command::Token { cmd } => match cmd {
            TokenCommand::Mint {
                key,
                claims,
                iss,
                sub,
                aud,
                expires,
                not_before,
                jti,
                output,
            } => commands::token::mint(
                key,
                MintOptions {
                    claims,
                    issuer: iss,
                    subject: sub,
                    audience: aud,
                    expires,
                    not_before,
                    token_id: jti,
                    output,
                },
                &config.signing,
            ),
            TokenCommand::Verify {
                token,
                keys,
                audience,
                leeway,
                require_audience,
                require_kid_match,
            } => commands::token::verify(
                token,
                VerifyOptions {
                    keys,
                    audiences: audience,
                    leeway,
                    require_audience,
                    require_kid_match,
                },
                &config.verify,
            ),
            TokenCommand::Inspect { token } => commands::token::inspect(token),
        },
    }
}
