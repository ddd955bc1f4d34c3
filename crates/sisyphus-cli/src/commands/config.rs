use clap::Subcommand;
use sisyphus_core::Tracker;

use super::{flush_notices, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting value
    Get {
        /// Dot-separated key (e.g. "timer.work_duration", "sound.alarm_volume")
        key: String,
    },
    /// Set a setting value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
    /// Show or change the default user stored in config.toml
    User {
        /// New default user; omit to print the current one
        name: Option<String>,
        /// Forget the default user (back to anonymous, in-memory use)
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },
}

pub fn run(ctx: &Context, action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => with_tracker(ctx, |tracker| {
            match tracker.settings().get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
            Ok(())
        }),
        ConfigAction::Set { key, value } => with_tracker(ctx, |tracker| {
            tracker.set_setting(&key, &value)?;
            println!("ok");
            Ok(())
        }),
        ConfigAction::List => with_tracker(ctx, |tracker| print_json(tracker.settings())),
        ConfigAction::Reset => with_tracker(ctx, |tracker| {
            tracker.reset_settings()?;
            println!("settings reset to defaults");
            Ok(())
        }),
        ConfigAction::User { name, clear } => default_user(ctx, name, clear),
    }
}

/// Per-user settings live in the store, so these need the tracker.
fn with_tracker(ctx: &Context, f: impl FnOnce(&mut Tracker) -> CliResult) -> CliResult {
    let mut tracker = ctx.tracker()?;
    f(&mut tracker)?;
    flush_notices(&mut tracker);
    Ok(())
}

/// The default user lives in config.toml; no tracker is opened.
fn default_user(ctx: &Context, name: Option<String>, clear: bool) -> CliResult {
    if name.is_none() && !clear {
        match &ctx.config().user {
            Some(user) => println!("{user}"),
            None => println!("(anonymous)"),
        }
        return Ok(());
    }

    let mut config = ctx.config().clone();
    config.user = match name.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => return Err("user name must not be empty".into()),
        other => other,
    };
    config.save()?;
    match &config.user {
        Some(user) => println!("default user set to {user}"),
        None => println!("default user cleared"),
    }
    Ok(())
}
