//! Operator commands typed on stdin while a run is active.

use std::io::BufRead;
use std::sync::Arc;

use mapscout_browser::ChromiumLauncher;
use mapscout_scraper::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlCommand {
    Stop,
    StopReviews,
    Target(usize),
}

/// Parse a positive integer, as accepted by `--max-reviews` and `target`.
pub(crate) fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a whole number", raw.trim())),
    }
}

pub(crate) fn parse_command(line: &str) -> Result<ControlCommand, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    let argument = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments: {}", line.trim()));
    }

    match (command.as_str(), argument) {
        ("stop", None) => Ok(ControlCommand::Stop),
        ("stop-reviews", None) => Ok(ControlCommand::StopReviews),
        ("target", Some(n)) => parse_positive(n).map(ControlCommand::Target),
        ("target", None) => Err("usage: target <n>".to_string()),
        ("stop" | "stop-reviews", Some(_)) => Err(format!("'{command}' takes no argument")),
        ("", _) => Err("empty command".to_string()),
        (other, _) => Err(format!(
            "unknown command '{other}' (expected stop, stop-reviews or target <n>)"
        )),
    }
}

fn apply(session: &Session<ChromiumLauncher>, command: ControlCommand) {
    match command {
        ControlCommand::Stop => {
            if !session.stop() {
                eprintln!("no run is active");
            }
        }
        ControlCommand::StopReviews => session.controls().request_reviews_stop(),
        ControlCommand::Target(n) => {
            if session.controls().adjust_target(n) {
                println!("review target set to {n}");
            }
        }
    }
}

/// Read commands from stdin on a plain thread, so a pending read never
/// holds the runtime open at exit.
pub(crate) fn spawn_stdin_commands(session: Arc<Session<ChromiumLauncher>>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(command) => {
                    tracing::debug!(?command, "operator command");
                    apply(&session, command);
                }
                Err(e) => eprintln!("{e}"),
            }
        }
    });
}
