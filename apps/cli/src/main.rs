use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{LearningBackend, MemoClient, ReviewSession};
use shared::{
    domain::{UserId, WordlistId},
    protocol::{UserProfile, UserSettings},
};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod controller;
mod session_store;

use config::load_settings;
use controller::{
    events::{describe_failure, session_rejected},
    learn::{render_progress, reset_if_complete, run_learn},
};
use session_store::SessionStore;

const DEFAULT_DAILY_NEW_WORDS: u32 = 10;
const DEFAULT_DAILY_REVISING_WORDS: u32 = 30;

#[derive(Parser, Debug)]
#[command(name = "kantanmemo", about = "Flashcard review client for a KantanMemo backend")]
struct Cli {
    /// Overrides `backend_url` from config and environment.
    #[arg(long, global = true)]
    backend_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in with it.
    Register { name: String },
    /// Sign in with an existing user id.
    Login { user_id: i64 },
    Logout,
    Whoami,
    /// List the word lists available on the backend.
    Wordlists,
    /// Upload a word list file (CSV).
    Upload { path: PathBuf },
    /// Show settings, or change them with `settings set`.
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Show today's progress.
    Progress,
    /// Start today's review over.
    Reset,
    /// Review today's words interactively.
    Learn,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Set {
        #[arg(long)]
        wordlist: Option<i64>,
        /// New words per day.
        #[arg(long = "new")]
        new_words: Option<u32>,
        /// Revised words per day.
        #[arg(long)]
        revising: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref());
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = MemoClient::new(&settings.backend_url)
        .with_context(|| format!("invalid backend url '{}'", settings.backend_url))?;
    let store = SessionStore::new(settings.session_file);
    info!(
        backend = client.server_url(),
        session_file = %store.path().display(),
        "starting"
    );

    run(cli.command, client, &store).await
}

async fn run(command: Command, mut client: MemoClient, store: &SessionStore) -> Result<()> {
    match command {
        Command::Register { name } => {
            let user_id = client
                .register(&name)
                .await
                .map_err(|err| anyhow!(describe_failure(&err)))?;
            store.save(user_id)?;
            println!("Registered as user_id={user_id}. Keep this id to sign in again.");
        }
        Command::Login { user_id } => {
            let profile = client
                .login(UserId(user_id))
                .await
                .map_err(|err| anyhow!(describe_failure(&err)))?;
            store.save(profile.id)?;
            println!("Logged in as {} (ID: {})", profile.name, profile.id);
        }
        Command::Logout => {
            client.logout();
            if store.clear()? {
                println!("Logged out.");
            } else {
                println!("Not logged in.");
            }
        }
        Command::Whoami => {
            let (_, profile) = authenticated(client, store).await?;
            println!("{} (ID: {})", profile.name, profile.id);
            match &profile.user_settings {
                Some(settings) => print_settings(settings),
                None => print_pick_wordlist(),
            }
        }
        Command::Wordlists => {
            let (client, profile) = authenticated(client, store).await?;
            print_wordlists(&client, &profile).await?;
        }
        Command::Upload { path } => {
            let (client, profile) = authenticated(client, store).await?;
            let ack = client
                .upload_wordlist(&path)
                .await
                .map_err(|err| anyhow!(describe_failure(&err)))?;
            println!("Uploaded {}: {}", path.display(), ack.trim());
            print_wordlists(&client, &profile).await?;
        }
        Command::Settings { action: None } => {
            let (client, _) = authenticated(client, store).await?;
            match client
                .settings()
                .await
                .map_err(|err| anyhow!(describe_failure(&err)))?
            {
                Some(settings) => print_settings(&settings),
                None => print_pick_wordlist(),
            }
        }
        Command::Settings {
            action:
                Some(SettingsAction::Set {
                    wordlist,
                    new_words,
                    revising,
                }),
        } => {
            let (client, _) = authenticated(client, store).await?;
            let updated = edit_settings(&client, wordlist.map(WordlistId), new_words, revising)
                .await?;
            println!("Settings saved.");
            print_settings(&updated);
        }
        Command::Progress => {
            let (client, _) = authenticated(client, store).await?;
            let progress = client
                .progress()
                .await
                .map_err(|err| anyhow!(describe_failure(&err)))?;
            println!("{}", render_progress(&progress));
        }
        Command::Reset => {
            let (client, _) = authenticated(client, store).await?;
            let session = ReviewSession::new(Arc::new(client));
            reset_if_complete(&session).await.map_err(|reason| anyhow!(reason))?;
            println!("Today's finished words were reset.");
        }
        Command::Learn => {
            let (client, profile) = authenticated(client, store).await?;
            if profile.user_settings.is_none() {
                print_pick_wordlist();
                return Ok(());
            }

            let session = ReviewSession::new(Arc::new(client));
            let _ = session.load_initial().await;
            session.refresh_progress().await;
            let mut stdout = std::io::stdout();
            run_learn(session, BufReader::new(tokio::io::stdin()), &mut stdout).await?;
        }
    }

    Ok(())
}

/// Restores the stored session and checks it with the backend. A session the
/// backend rejects is forgotten.
async fn authenticated(
    client: MemoClient,
    store: &SessionStore,
) -> Result<(MemoClient, UserProfile)> {
    let Some(stored) = store.load()? else {
        bail!("Not logged in; run `kantanmemo login <user-id>` or `kantanmemo register <name>`.");
    };

    let client = client.with_session(stored.user_id);
    match client.me().await {
        Ok(profile) => Ok((client, profile)),
        Err(err) if session_rejected(&err) => {
            warn!(user_id = %stored.user_id, "backend rejected stored session: {err}");
            store.clear()?;
            bail!("Session for user {} is no longer valid; log in again.", stored.user_id)
        }
        Err(err) => Err(anyhow!(describe_failure(&err))),
    }
}

/// Merges the given changes into the current settings and saves them.
async fn edit_settings(
    client: &MemoClient,
    wordlist: Option<WordlistId>,
    new_words: Option<u32>,
    revising: Option<u32>,
) -> Result<UserSettings> {
    if wordlist.is_none() && new_words.is_none() && revising.is_none() {
        bail!("Nothing to change; pass --wordlist, --new or --revising.");
    }

    if let Some(wordlist) = wordlist {
        let known = client
            .wordlists()
            .await
            .map_err(|err| anyhow!(describe_failure(&err)))?;
        if !known.iter().any(|list| list.id == wordlist) {
            bail!("Unknown word list id {wordlist}; see `kantanmemo wordlists`.");
        }
    }

    let current = client
        .settings()
        .await
        .map_err(|err| anyhow!(describe_failure(&err)))?;
    let updated = match current {
        Some(current) => UserSettings {
            current_wordlist_id: wordlist.unwrap_or(current.current_wordlist_id),
            daily_new_word_count: new_words.unwrap_or(current.daily_new_word_count),
            daily_revising_word_count: revising.unwrap_or(current.daily_revising_word_count),
        },
        None => UserSettings {
            current_wordlist_id: wordlist
                .context("Pick a word list first: `kantanmemo settings set --wordlist <id>`")?,
            daily_new_word_count: new_words.unwrap_or(DEFAULT_DAILY_NEW_WORDS),
            daily_revising_word_count: revising.unwrap_or(DEFAULT_DAILY_REVISING_WORDS),
        },
    };

    client
        .update_settings(&updated)
        .await
        .map_err(|err| anyhow!(describe_failure(&err)))
}

async fn print_wordlists(client: &MemoClient, profile: &UserProfile) -> Result<()> {
    let lists = client
        .wordlists()
        .await
        .map_err(|err| anyhow!(describe_failure(&err)))?;
    if lists.is_empty() {
        println!("No word lists yet; add one with `kantanmemo upload <file>`.");
        return Ok(());
    }

    let current = profile
        .user_settings
        .as_ref()
        .map(|settings| settings.current_wordlist_id);
    for list in lists {
        let marker = if Some(list.id) == current { '*' } else { ' ' };
        println!("{marker} {:>4}  {}", list.id.0, list.name);
    }
    Ok(())
}

fn print_settings(settings: &UserSettings) {
    println!("word list:          {}", settings.current_wordlist_id);
    println!("new words/day:      {}", settings.daily_new_word_count);
    println!("revising words/day: {}", settings.daily_revising_word_count);
}

fn print_pick_wordlist() {
    println!("Pick a word list to start: `kantanmemo wordlists`, then `kantanmemo settings set --wordlist <id>`.");
}
