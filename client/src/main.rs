//! `carelink` command: profile and session operations against a hosted backend.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use carelink::config::BackendSettings;
use carelink::context::BackendContext;
use carelink::domain::ports::IdentityProviderError;
use carelink::domain::{
    AuthState, Email, Error, OperationOutcome, ProfileData, ProfileService, Role, UserId,
};
use carelink::outbound::firebase::FirebaseConnector;
use carelink::outbound::storage::{FileStorage, MemoryStorage};
use clap::{Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `carelink` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "carelink",
    about = "Save and read care profiles, end sessions, and watch auth state",
    version
)]
struct CliArgs {
    /// Sign in with this email before running the command.
    #[arg(long, value_name = "email", requires = "password")]
    email: Option<String>,
    /// Password used with `--email`.
    #[arg(long, value_name = "password", requires = "email")]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the profile stored for a user.
    GetProfile {
        /// Backend-issued user id.
        uid: String,
    },
    /// Register a user's lookup record and role profile.
    SaveProfile {
        /// Backend-issued user id.
        uid: String,
        /// `patient` or `caretaker`.
        #[arg(long, value_name = "role")]
        role: String,
        /// JSON object holding the profile fields, including `email`.
        #[arg(long, value_name = "path")]
        profile: PathBuf,
    },
    /// End the session and clear client storage.
    SignOut,
    /// Print auth state transitions as JSON lines.
    WatchAuth {
        /// Stop after this many states; runs until interrupted when omitted.
        #[arg(long, value_name = "n")]
        count: Option<usize>,
    },
}

fn main() -> io::Result<ExitCode> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::try_parse().unwrap_or_else(|error| error.exit());
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: CliArgs) -> io::Result<ExitCode> {
    let settings = BackendSettings::load_from_iter([OsString::from("carelink")])
        .map_err(|error| io::Error::other(format!("load backend settings: {error}")))?;
    let connector = FirebaseConnector::default();
    let context = BackendContext::initialize(&settings, &connector);

    let durable = FileStorage::open(&settings.storage_dir())
        .map_err(|error| io::Error::other(format!("open durable storage: {error}")))?;
    let service = ProfileService::new(context, Arc::new(MemoryStorage::new()), Arc::new(durable));

    if let (Some(email), Some(password)) = (args.email.as_deref(), args.password.as_deref()) {
        if let Err(error) = sign_in(&connector, email, password).await {
            return print_outcome(&OperationOutcome::<()>::from(Err(error)));
        }
    }

    match args.command {
        Command::GetProfile { uid } => {
            let result = match parse_user_id(&uid) {
                Ok(id) => service.get_user_profile(&id).await,
                Err(error) => Err(error),
            };
            print_outcome(&OperationOutcome::from(result))
        }
        Command::SaveProfile { uid, role, profile } => {
            let result = match parse_save_request(&uid, &role, &profile) {
                Ok((id, role, data)) => service.save_user_profile(&id, data, role).await,
                Err(error) => Err(error),
            };
            print_outcome(&OperationOutcome::from(result))
        }
        Command::SignOut => print_outcome(&OperationOutcome::from(service.sign_out().await)),
        Command::WatchAuth { count } => watch_auth(&service, count).await,
    }
}

async fn sign_in(connector: &FirebaseConnector, email: &str, password: &str) -> Result<(), Error> {
    let provider = connector
        .identity_provider()
        .ok_or_else(Error::not_configured)?;
    let email = Email::new(email).map_err(|error| Error::invalid_request(error.to_string()))?;
    provider
        .sign_in_with_password(&email, password)
        .await
        .map(|_| ())
        .map_err(|error| match error {
            IdentityProviderError::Rejected { message } => Error::unauthorized(message),
            IdentityProviderError::Unavailable { message } => Error::service_unavailable(message),
        })
}

async fn watch_auth(service: &ProfileService, count: Option<usize>) -> io::Result<ExitCode> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<AuthState>();
    let observer = match service.on_auth_state_change(move |state| {
        if sender.send(state).is_err() {
            warn!("auth state printer has stopped");
        }
    }) {
        Ok(observer) => observer,
        Err(error) => return print_outcome(&OperationOutcome::<()>::from(Err(error))),
    };

    let mut printed = 0_usize;
    while count.is_none_or(|limit| printed < limit) {
        let Some(state) = receiver.recv().await else {
            break;
        };
        let line = serde_json::to_string(&state)
            .map_err(|error| io::Error::other(format!("encode auth state: {error}")))?;
        println!("{line}");
        printed += 1;
    }
    observer.unsubscribe();
    Ok(ExitCode::SUCCESS)
}

fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|error| Error::invalid_request(error.to_string()))
}

fn parse_save_request(
    uid: &str,
    role: &str,
    profile: &Path,
) -> Result<(UserId, Role, ProfileData), Error> {
    let id = parse_user_id(uid)?;
    let role = Role::from_str(role).map_err(|error| Error::invalid_request(error.to_string()))?;
    let data = read_profile(profile)?;
    Ok((id, role, data))
}

fn read_profile(path: &Path) -> Result<ProfileData, Error> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::invalid_request("profile path must name a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        Error::invalid_request(format!(
            "open profile directory '{}': {error}",
            parent.display()
        ))
    })?;
    let contents = directory.read_to_string(file_name).map_err(|error| {
        Error::invalid_request(format!("read profile '{}': {error}", path.display()))
    })?;
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(Error::invalid_request("profile must be a JSON object")),
        Err(error) => Err(Error::invalid_request(format!(
            "parse profile '{}': {error}",
            path.display()
        ))),
    }
}

fn print_outcome<T: Serialize>(outcome: &OperationOutcome<T>) -> io::Result<ExitCode> {
    let json = serde_json::to_string_pretty(outcome)
        .map_err(|error| io::Error::other(format!("encode outcome: {error}")))?;
    println!("{json}");
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
