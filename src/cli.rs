use clap::{Args, Parser, Subcommand};
use clubsign::config::DEFAULT_AUTH_COOKIE_NAME;
use clubsign::types::model::Role;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use time::Duration;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, clubsign::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Init(args)) => return RunOutcome::Exit(run_init(args)),
        Some(Command::AuthKey) => return RunOutcome::Exit(run_auth_key()),
        Some(Command::User(UserCommand::Add(ref args))) => {
            return RunOutcome::Exit(match resolve_root(cli.root.as_deref()) {
                Ok(root) => run_user_add(&root, args),
                Err(err) => {
                    eprintln!("error: {err}");
                    2
                }
            });
        }
        None => {}
    }

    let root = match resolve_root(cli.root.as_deref()) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    let auth = match resolve_auth_config(&cli) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve(
        cli.bind,
        clubsign::config::AppConfig {
            root,
            app_name: cli.app_name,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
            auth,
            seed: cli.seed,
        },
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "clubsign",
    version,
    about = "Club document approval and signature tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Directory holding the database and uploaded attachments.
    #[arg(long, env = "CLUBSIGN_ROOT")]
    root: Option<PathBuf>,
    #[arg(long, env = "CLUBSIGN_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, env = "CLUBSIGN_APP_NAME", default_value = "Clubsign")]
    app_name: String,
    #[arg(long, env = "CLUBSIGN_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "CLUBSIGN_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "CLUBSIGN_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "CLUBSIGN_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "CLUBSIGN_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "CLUBSIGN_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "CLUBSIGN_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
    /// TOML file of accounts to create on startup.
    #[arg(long, env = "CLUBSIGN_SEED")]
    seed: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh VAPID key pair.
    Init(InitArgs),
    /// Print a fresh token signing key.
    AuthKey,
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create an account in the database under --root.
    Add(UserAddArgs),
}

#[derive(Args, Debug)]
struct UserAddArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_role, default_value = "member")]
    role: Role,
    #[arg(long, env = "CLUBSIGN_USER_PASSWORD")]
    password: String,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| format!("unknown role '{raw}'; expected admin or member"))
}

fn resolve_root(root: Option<&Path>) -> Result<PathBuf, String> {
    let root = root.ok_or("--root is required unless using init or auth-key")?;
    let root = std::fs::canonicalize(root)
        .map_err(|err| format!("failed to resolve root directory: {err}"))?;
    if !root.is_dir() {
        return Err(format!("root path is not a directory: {}", root.display()));
    }
    Ok(root)
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match clubsign::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("CLUBSIGN_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("CLUBSIGN_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("CLUBSIGN_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace CLUBSIGN_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn run_auth_key() -> i32 {
    let secret = match clubsign::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn run_user_add(root: &Path, args: &UserAddArgs) -> i32 {
    let store = match clubsign::db::Store::open(root) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open database: {err}");
            return 1;
        }
    };
    let user = clubsign::seed::SeedUser {
        email: args.email.clone(),
        display_name: args.name.clone(),
        role: args.role,
        password: args.password.clone(),
    };
    let conn = store.lock();
    match clubsign::seed::add_user(&conn, &user) {
        Ok(user) => {
            println!("created {} <{}> ({})", user.display_name, user.email, user.role.as_str());
            println!("id: {}", user.id);
            0
        }
        Err(err) => {
            eprintln!("failed to create user: {err}");
            1
        }
    }
}

fn resolve_auth_config(cli: &Cli) -> Result<clubsign::config::AuthConfig, String> {
    let auth_key = cli
        .auth_key
        .as_deref()
        .ok_or("--auth-key (or CLUBSIGN_AUTH_KEY) is required; generate one with `clubsign auth-key`")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_auth_token_ttl(raw)?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(clubsign::config::AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
        cookie_name,
        cookie_secure: cli.auth_cookie_secure,
    })
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(14)
}

/// `<number>[s|m|h|d]`; a bare number is seconds.
fn parse_auth_token_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    let invalid = || format!("invalid auth token ttl '{value}'; expected <number>[s|m|h|d]");

    let digits = value.trim_end_matches(|ch: char| ch.is_ascii_alphabetic());
    let unit_seconds: i64 = match value[digits.len()..].to_ascii_lowercase().as_str() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(invalid()),
    };
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err("auth token ttl must be greater than 0".to_string());
    }
    let seconds = amount.checked_mul(unit_seconds).ok_or_else(invalid)?;
    Ok(Duration::seconds(seconds))
}
