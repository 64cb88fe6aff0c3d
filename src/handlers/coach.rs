//! Coach command handler
//!
//! Either forwards a raw JSON request body (from a file or piped stdin) or
//! builds one from a message and today's stats.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::io::Read;
use std::path::Path;

use crate::coach::{self, CoachRequest, CoachResponse};
use crate::settings::SyncSettings;
use crate::store::{LocalStore, Partition};
use crate::tracker::UserStats;

fn read_body(input: Option<&Path>) -> Result<Option<String>> {
    if let Some(path) = input {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request body from {}", path.display()))?;
        return Ok(Some(body));
    }

    if atty::isnt(atty::Stream::Stdin) {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request body from stdin")?;
        if !body.trim().is_empty() {
            return Ok(Some(body));
        }
    }

    Ok(None)
}

fn todays_stats(settings: &SyncSettings) -> Result<serde_json::Value> {
    let store = LocalStore::open_default()?;
    let key = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let stats = store
        .get_local::<UserStats>(Partition::UserStats, &key)?
        .unwrap_or_else(|| UserStats::with_goal(settings.hydration_goal_liters));
    Ok(serde_json::to_value(stats)?)
}

/// Ask the coach and print its reply
///
/// With `raw`, the proxy's JSON body is printed instead of the text.
pub fn handle_coach(
    message: Option<&str>,
    user_name: Option<&str>,
    input: Option<&Path>,
    raw: bool,
) -> Result<()> {
    let settings = SyncSettings::load()?;

    let body = match (read_body(input)?, message) {
        (Some(body), _) => body,
        (None, Some(text)) => {
            let mut request = CoachRequest {
                user_text: text.to_string(),
                stats: todays_stats(&settings)?,
                ..Default::default()
            };
            if let Some(name) = user_name {
                request.user_name = name.to_string();
            }
            serde_json::to_string(&request)?
        }
        (None, None) => bail!("Give a message, --input <file>, or pipe a JSON body on stdin"),
    };

    let reply = coach::handle_with_env(&body, settings.coach_endpoint.clone());

    if raw {
        println!("{}", reply.to_json());
    } else {
        match &reply.body {
            CoachResponse::Text { text } => println!("{} {}", "Coach:".cyan().bold(), text),
            CoachResponse::Error { error } => eprintln!("{} {}", "Error:".red().bold(), error),
        }
    }

    if !reply.is_success() {
        bail!("Coach request failed with status {}", reply.status);
    }
    Ok(())
}
