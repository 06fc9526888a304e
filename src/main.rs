mod clipboard;
mod prompt;

use crate::clipboard::Clipboard;
use crate::prompt::{
    confirm, prompt_hidden_with_default, prompt_password_hidden, prompt_string,
    prompt_with_default,
};
use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use pm_wallet::config::config_path;
use pm_wallet::entry::decode_otp_secret;
use pm_wallet::{Config, Entry, Wallet, random_string, store};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

/// How long an index prompt waits before the command is aborted.
const SELECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Lifetime of a `copy` session; the clipboard is wiped when it ends.
const COPY_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Parser, Debug)]
#[command(name = "pm", version, about = "Encrypted password wallet with TOTP support")]
struct Cli {
    /// Config file (default: ~/.config/pm/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Wallet name (default: `wallet_default` from config)
    #[arg(short, long, global = true)]
    wallet: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List entries, grouped
    ///
    /// Examples:
    ///   pm ls
    ///   pm ls -g work -p git
    Ls(Filter),

    /// Add a new entry
    Add {
        /// Generate the password instead of asking for it
        #[arg(short, long)]
        random: bool,
    },

    /// Update an entry
    Update {
        #[command(flatten)]
        filter: Filter,
        /// Generate a new password
        #[arg(short, long)]
        random: bool,
    },

    /// Delete an entry
    Delete(Filter),

    /// Interactive copy of login / password / OTP code to the clipboard
    Copy(Filter),

    /// Show the current OTP code of an entry
    Otp(Filter),

    /// Import entries from a JSON export
    Import {
        /// JSON file with an array of entries
        file: PathBuf,
    },

    /// Export the wallet as plaintext JSON
    ///
    /// Examples:
    ///   pm export
    ///   pm export backup.json
    Export {
        /// Output file (default: export_<timestamp>.json)
        file: Option<PathBuf>,
    },

    /// Print a random password
    Generate {
        /// Length (default: `password_length` from config)
        #[arg(short, long)]
        length: Option<usize>,
        #[arg(long)]
        no_letters: bool,
        #[arg(long)]
        no_digits: bool,
        /// Include special characters
        #[arg(short, long)]
        special: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct Filter {
    /// Case-insensitive search in name, URI, user and comment
    #[arg(short, long, default_value = "")]
    pattern: String,
    /// Exact group
    #[arg(short, long, default_value = "")]
    group: String,
}

struct App {
    config: Config,
    wallet_name: String,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config_file = match cli.config {
        Some(path) => path,
        None => config_path()?,
    };
    let config = Config::load(&config_file)?;
    let app = App {
        wallet_name: cli.wallet.unwrap_or_else(|| config.wallet_default.clone()),
        config,
    };

    match cli.command {
        Commands::Ls(filter) => cmd_ls(&app, &filter)?,
        Commands::Add { random } => cmd_add(&app, random)?,
        Commands::Update { filter, random } => cmd_update(&app, &filter, random)?,
        Commands::Delete(filter) => cmd_delete(&app, &filter)?,
        Commands::Copy(filter) => cmd_copy(&app, &filter)?,
        Commands::Otp(filter) => cmd_otp(&app, &filter)?,
        Commands::Import { file } => cmd_import(&app, &file)?,
        Commands::Export { file } => cmd_export(&app, file)?,
        Commands::Generate {
            length,
            no_letters,
            no_digits,
            special,
        } => {
            let cfg = &app.config;
            let pw = random_string(
                length.unwrap_or(cfg.password_length),
                cfg.password_letter && !no_letters,
                cfg.password_digit && !no_digits,
                cfg.password_special || special,
            )?;
            println!("{pw}");
        }
    }

    Ok(())
}

/// Logs go to stderr, stdout is kept for tables and generated secrets.
/// Level comes from `RUST_LOG`, `warn` by default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl App {
    /// Asks for the passphrase and unlocks the wallet. A wallet without a
    /// vault file starts empty and is created on the first save.
    fn open_wallet(&self) -> anyhow::Result<Wallet> {
        let passphrase = prompt_password_hidden("Enter the passphrase to unlock the wallet: ")?;
        let mut wallet = Wallet::new(
            self.wallet_name.as_str(),
            self.config.wallet_path(&self.wallet_name),
            passphrase,
        );

        if wallet.exists() {
            wallet
                .load()
                .with_context(|| format!("cannot unlock wallet '{}'", wallet.name()))?;
        } else {
            info!(wallet = %wallet.name(), path = %wallet.path().display(), "new wallet");
        }
        Ok(wallet)
    }

    fn generate_password(&self) -> anyhow::Result<String> {
        let cfg = &self.config;
        Ok(random_string(
            cfg.password_length,
            cfg.password_letter,
            cfg.password_digit,
            cfg.password_special,
        )?)
    }
}

fn cmd_ls(app: &App, filter: &Filter) -> anyhow::Result<()> {
    let wallet = app.open_wallet()?;
    let entries = wallet.search(&filter.pattern, &filter.group);
    if entries.is_empty() {
        bail!("no entry found");
    }
    print_entries(&entries);
    Ok(())
}

fn cmd_add(app: &App, random: bool) -> anyhow::Result<()> {
    let mut wallet = app.open_wallet()?;

    let mut entry = Entry::new();
    entry.name = prompt_string("Enter the name: ")?;
    entry.group = prompt_string("Enter the group: ")?;
    entry.uri = prompt_string("Enter the URI: ")?;
    entry.user = prompt_string("Enter the username: ")?;
    entry.password = if random {
        app.generate_password()?
    } else {
        let pw = prompt_password_hidden("Enter the new password (leave empty to generate): ")?;
        if pw.is_empty() {
            app.generate_password()?
        } else {
            pw
        }
    };
    entry.otp_secret = parse_otp_input(&prompt_password_hidden("Enter the OTP key: ")?)?;
    entry.comment = prompt_string("Enter a comment: ")?;

    wallet.add_entry(entry)?;
    wallet.save()?;
    println!("the entry has been added");
    Ok(())
}

fn cmd_update(app: &App, filter: &Filter, random: bool) -> anyhow::Result<()> {
    let mut wallet = app.open_wallet()?;
    let mut entry = select_entry(&wallet, filter)?;

    entry.name = prompt_with_default("Enter the new name: ", &entry.name)?;
    entry.group = prompt_with_default("Enter the new group: ", &entry.group)?;
    entry.uri = prompt_with_default("Enter the new URI: ", &entry.uri)?;
    entry.user = prompt_with_default("Enter the new username: ", &entry.user)?;
    entry.password = if random {
        app.generate_password()?
    } else {
        prompt_hidden_with_default("Enter the new password: ", &entry.password)?
    };
    let otp = prompt_hidden_with_default("Enter the new OTP key: ", &entry.otp_secret)?;
    entry.otp_secret = parse_otp_input(&otp)?;
    entry.comment = prompt_with_default("Enter a new comment: ", &entry.comment)?;

    wallet.update_entry(entry)?;
    wallet.save()?;
    println!("the entry has been updated");
    Ok(())
}

fn cmd_delete(app: &App, filter: &Filter) -> anyhow::Result<()> {
    let mut wallet = app.open_wallet()?;
    let entry = select_entry(&wallet, filter)?;

    if confirm("are you sure you want to remove this entry")? {
        wallet.delete_entry(&entry.id)?;
        wallet.save()?;
        println!("the entry has been deleted");
    }
    Ok(())
}

fn cmd_otp(app: &App, filter: &Filter) -> anyhow::Result<()> {
    let wallet = app.open_wallet()?;
    let entry = select_entry(&wallet, filter)?;
    let (code, remaining) = entry.otp_code(OffsetDateTime::now_utc())?;
    println!("{code}");
    eprintln!("this OTP code is available for {remaining} seconds");
    Ok(())
}

fn cmd_copy(app: &App, filter: &Filter) -> anyhow::Result<()> {
    let wallet = app.open_wallet()?;
    let entry = select_entry(&wallet, filter)?;
    let clipboard = Clipboard::detect()?;

    // true once the session is over; checked under the lock before every copy
    let closed = Arc::new(Mutex::new(false));
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let worker_closed = Arc::clone(&closed);
    thread::spawn(move || {
        loop {
            let Ok(choice) = prompt_string("select one action: ") else {
                break;
            };
            let value = match choice.trim() {
                "l" => entry.user.clone(),
                "p" => entry.password.clone(),
                "o" => match entry.otp_code(OffsetDateTime::now_utc()) {
                    Ok((code, remaining)) => {
                        println!("this OTP code is available for {remaining} seconds");
                        code
                    }
                    Err(e) => {
                        eprintln!("ERROR: {e}");
                        continue;
                    }
                },
                "q" => break,
                _ => {
                    println!("l -> copy login");
                    println!("p -> copy password");
                    println!("o -> copy OTP code");
                    println!("q -> quit");
                    continue;
                }
            };

            let Ok(closed) = worker_closed.lock() else {
                break;
            };
            if *closed {
                break;
            }
            if let Err(e) = clipboard.set(&value) {
                eprintln!("ERROR: {e}");
            }
        }
        let _ = done_tx.send(());
    });

    let outcome = done_rx.recv_timeout(COPY_TIMEOUT);

    let mut closed = closed
        .lock()
        .map_err(|_| anyhow!("copy session state poisoned"))?;
    *closed = true;
    clipboard.clear()?;
    drop(closed);

    match outcome {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => Ok(()),
        Err(RecvTimeoutError::Timeout) => {
            bail!(
                "copy session expired after {}s, clipboard cleared",
                COPY_TIMEOUT.as_secs()
            )
        }
    }
}

fn cmd_import(app: &App, file: &Path) -> anyhow::Result<()> {
    let mut wallet = app.open_wallet()?;
    let data =
        std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;

    let added = wallet.import(&data)?;
    wallet.save()?;
    println!("the import was successful ({added} new entries)");
    Ok(())
}

fn cmd_export(app: &App, file: Option<PathBuf>) -> anyhow::Result<()> {
    let wallet = app.open_wallet()?;

    let path = match file {
        Some(p) => p,
        None => {
            let timestamp = OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)?
                .replace(':', "-");
            PathBuf::from(format!("export_{timestamp}.json"))
        }
    };

    let data = zeroize::Zeroizing::new(wallet.export()?);
    store::write_private(&path, &data)?;
    println!("the export was successful: {}", path.display());
    Ok(())
}

/// Shows the matches and lets the user pick one. The index prompt races
/// [`SELECT_TIMEOUT`]; whichever comes first decides the outcome.
fn select_entry(wallet: &Wallet, filter: &Filter) -> anyhow::Result<Entry> {
    let mut entries = wallet.search(&filter.pattern, &filter.group);
    if entries.is_empty() {
        bail!("no entry found");
    }

    print_entries(&entries);
    if entries.len() == 1 {
        return Ok(entries.remove(0));
    }

    let max = entries.len();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        loop {
            let Ok(input) = prompt_string("Select the entry: ") else {
                return;
            };
            match input.trim().parse::<usize>() {
                Ok(index) if index < max => {
                    let _ = tx.send(index);
                    return;
                }
                _ => println!("your choice is not an integer or is out of range"),
            }
        }
    });

    match rx.recv_timeout(SELECT_TIMEOUT) {
        Ok(index) => Ok(entries.swap_remove(index)),
        Err(RecvTimeoutError::Timeout) => bail!(
            "no entry selected within {}s",
            SELECT_TIMEOUT.as_secs()
        ),
        Err(RecvTimeoutError::Disconnected) => bail!("input closed before an entry was selected"),
    }
}

/// Разобрать то, что пользователь ввёл как OTP:
/// - пусто → OTP выключен
/// - otpauth:// URL → достаём secret (поддерживается только totp/SHA1/6/30)
/// - иначе строка считается base32 секретом
fn parse_otp_input(input: &str) -> anyhow::Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(String::new());
    }

    let secret = if input.starts_with("otpauth://") {
        let url = Url::parse(input).map_err(|e| anyhow!("Invalid otpauth URL: {e}"))?;

        let kind = url.host_str().unwrap_or("").to_lowercase();
        if kind != "totp" {
            bail!("Unsupported otpauth type '{kind}', only 'totp' is supported");
        }

        let mut secret = None;
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "secret" => secret = Some(v.to_string()),
                "algorithm" if !v.eq_ignore_ascii_case("SHA1") => {
                    bail!("Unsupported OTP algorithm '{v}', only SHA1 is supported")
                }
                "digits" if v != "6" => bail!("Unsupported OTP digits '{v}', only 6 is supported"),
                "period" if v != "30" => {
                    bail!("Unsupported OTP period '{v}', only 30 is supported")
                }
                _ => {}
            }
        }
        secret.ok_or_else(|| anyhow!("otpauth URL missing 'secret' param"))?
    } else {
        input.to_string()
    };

    decode_otp_secret(&secret)?;
    Ok(secret)
}

fn print_entries(entries: &[Entry]) {
    // tables per group, groups in first-seen order, indexes relative to `entries`
    let mut groups: Vec<(&str, Vec<(usize, &Entry)>)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match groups.iter_mut().find(|(g, _)| *g == entry.group) {
            Some((_, rows)) => rows.push((i, entry)),
            None => groups.push((entry.group.as_str(), vec![(i, entry)])),
        }
    }

    for (group, rows) in groups {
        println!();
        println!("{}", if group.is_empty() { "(no group)" } else { group });
        println!();

        let table: Vec<[String; 6]> = rows
            .iter()
            .map(|(i, e)| {
                [
                    i.to_string(),
                    e.name.clone(),
                    e.uri.clone(),
                    e.user.clone(),
                    if e.has_otp() { "X" } else { "" }.to_string(),
                    e.comment.clone(),
                ]
            })
            .collect();
        print_table(["", "NAME", "URI", "USER", "OTP", "COMMENT"], &table);
        println!();
    }
}

fn print_table(header: [&str; 6], rows: &[[String; 6]]) {
    let mut widths = header.map(|h| h.chars().count());
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 6]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("  {}", render(header).trim_end());
    for row in rows {
        println!("  {}", render(row.each_ref().map(String::as_str)).trim_end());
    }
}
