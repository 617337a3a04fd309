//! applock: 保護対象アプリの登録／解除、保護の有効化、自動起動、パスフレーズを管理する CLI。
//! 監視デーモン（al-monitor）は設定ファイルの変更を検出して反映する。

use al_composition::cli::CliRuntime;
use al_composition::log;
use al_composition::{ProtectionStatus, ProtectionUseCase};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "applock", version, about = "Manage applications protected by AppLock")]
struct Cli {
    /// Data directory override
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter (EnvFilter syntax)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Protect applications (e.g. "Notes.app")
    Add {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Stop protecting applications
    Remove {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Print protected applications
    List,
    /// Print protection state
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Turn protection on
    Enable,
    /// Turn protection off
    Disable,
    /// Turn protection on and quit running protected applications
    LockAll,
    /// Turn protection off
    UnlockAll,
    /// Start the monitor at login
    Autostart {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Set the passphrase used by the password prompt
    SetPassphrase {
        /// Read a single line from stdin without confirmation
        #[arg(long, conflicts_with = "clear")]
        stdin: bool,
        /// Remove the stored passphrase
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView<'a> {
    locking_enabled: bool,
    auto_start_enabled: bool,
    locked_apps: &'a [String],
    passphrase_configured: bool,
    settings_path: String,
    config_path: String,
}

fn main() {
    let cli = Cli::parse();
    let _ = log::init_tracing(&cli.log_level, None);
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let runtime = match &cli.data_dir {
        Some(dir) => CliRuntime::with_root(dir)?,
        None => CliRuntime::new()?,
    };
    let controller = runtime.controller();

    match cli.command {
        Command::Add { identifiers } => {
            for id in identifiers {
                if controller.add_identifier(&id)? {
                    println!("Protected: {id}");
                } else {
                    println!("Already protected: {id}");
                }
            }
        }
        Command::Remove { identifiers } => {
            for id in identifiers {
                if controller.remove_identifier(&id)? {
                    println!("Removed: {id}");
                } else {
                    println!("Not protected: {id}");
                }
            }
        }
        Command::List => {
            let ids = controller.identifiers();
            if ids.is_empty() {
                println!("No protected applications.");
            }
            for id in ids {
                println!("{id}");
            }
        }
        Command::Status { json } => {
            let status = controller.status();
            let passphrase = runtime.load_config()?.passphrase_sha256.is_some();
            if json {
                let view = status_view(&runtime, &status, passphrase);
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_status(&runtime, &status, passphrase);
            }
        }
        Command::Enable => {
            controller.set_enabled(true)?;
            println!("Protection enabled.");
        }
        Command::Disable => {
            controller.set_enabled(false)?;
            println!("Protection disabled.");
        }
        Command::LockAll => {
            let terminated = controller.lock_all()?;
            println!("Protection enabled. Quit {terminated} running protected application(s).");
        }
        Command::UnlockAll => {
            controller.unlock_all()?;
            println!("Protection disabled.");
        }
        Command::Autostart { state } => {
            let on = matches!(state, Toggle::On);
            controller.set_autostart(on)?;
            println!("Start at login: {}", if on { "on" } else { "off" });
        }
        Command::SetPassphrase { stdin, clear } => {
            if clear {
                runtime.clear_passphrase()?;
                println!("Passphrase removed. Password prompts will be denied.");
            } else {
                let passphrase = if stdin {
                    read_line(None)?
                } else {
                    read_confirmed_passphrase()?
                };
                runtime.set_passphrase(&passphrase)?;
                println!("Passphrase updated.");
            }
        }
    }
    Ok(())
}

fn status_view<'a>(
    runtime: &CliRuntime,
    status: &'a ProtectionStatus,
    passphrase_configured: bool,
) -> StatusView<'a> {
    StatusView {
        locking_enabled: status.enabled,
        auto_start_enabled: status.autostart,
        locked_apps: &status.identifiers,
        passphrase_configured,
        settings_path: runtime.settings_path().display().to_string(),
        config_path: runtime.config_path().display().to_string(),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn print_status(runtime: &CliRuntime, status: &ProtectionStatus, passphrase_configured: bool) {
    println!("Protection:     {}", on_off(status.enabled));
    println!("Start at login: {}", on_off(status.autostart));
    println!(
        "Passphrase:     {}",
        if passphrase_configured { "configured" } else { "not set" }
    );
    println!("Protected apps: {}", status.identifiers.len());
    for id in &status.identifiers {
        println!("  - {id}");
    }
    println!("Settings:       {}", runtime.settings_path().display());
    println!("Config:         {}", runtime.config_path().display());
}

fn read_line(prompt: Option<&str>) -> Result<String> {
    if let Some(prompt) = prompt {
        eprint!("{prompt}");
        io::stderr().flush().ok();
    }
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        bail!("no input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_confirmed_passphrase() -> Result<String> {
    let first = read_line(Some("New passphrase: "))?;
    let second = read_line(Some("Confirm passphrase: "))?;
    if first != second {
        bail!("passphrases do not match");
    }
    Ok(first)
}
