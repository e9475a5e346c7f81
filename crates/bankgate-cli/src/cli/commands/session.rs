//! Session inspection.

use std::time::Duration;

use anyhow::{Context, Result};
use bankgate_core::portal::Portal;
use bankgate_core::session::{Credential, SessionEvent, mask_token};
use chrono::{DateTime, Local};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

pub async fn status(portal: &Portal, json: bool) -> Result<()> {
    // Expires a stale stored credential before reporting on it.
    let redirect = portal.clock().check();
    let store = portal.session().credentials();
    let credential = store.get();
    let remaining = store.remaining();

    if json {
        let value = json!({
            "authenticated": store.is_authenticated(),
            "token": credential.as_ref().map(|c| mask_token(&c.token)),
            "expires_at": credential.as_ref().and_then(|c| c.expires_at),
            "remaining_secs": remaining.map(|d| d.as_secs()),
            "last_logout": store.last_logout(),
            "redirect": redirect.as_ref().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if let Some(redirect) = redirect {
        if let Some(reason) = redirect.reason {
            println!("{}", reason.message());
        }
        println!("Sign in again at {redirect}");
        return Ok(());
    }

    let Some(credential) = credential else {
        println!("Not signed in.");
        return Ok(());
    };
    println!("Signed in (token {}).", mask_token(&credential.token));
    println!("{}", describe_expiry(&credential, remaining));

    if let Some(landing) = portal.landing(None).await {
        println!("Home: {landing}");
    }
    Ok(())
}

/// Starts the session clock and prints events until the session ends or
/// the process is interrupted.
pub async fn watch(portal: &Portal) -> Result<()> {
    let mut events = portal.session().subscribe();

    if let Some(redirect) = portal.start() {
        println!("Session expired. Sign in again at {redirect}");
        return Ok(());
    }
    if !portal.session().credentials().is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }

    let store = portal.session().credentials();
    if let Some(credential) = store.get() {
        println!("{}", describe_expiry(&credential, store.remaining()));
    }
    println!(
        "Watching session every {}s (Ctrl-C to stop)...",
        portal.clock().interval().as_secs()
    );

    loop {
        let event = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listen for Ctrl-C")?;
                println!("Stopped.");
                break;
            }
            event = events.recv() => event,
        };
        match event {
            Ok(event) => {
                let ended = !matches!(event, SessionEvent::SignedIn);
                print_event(&event);
                if ended {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session watcher lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }

    portal.shutdown();
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::SignedIn => println!("Signed in."),
        SessionEvent::SignedOut => println!("Signed out."),
        SessionEvent::Expired { redirect } | SessionEvent::Invalidated { redirect } => {
            if let Some(reason) = redirect.reason {
                println!("{}", reason.message());
            }
            println!("Sign in again at {redirect}");
        }
    }
}

fn describe_expiry(credential: &Credential, remaining: Option<Duration>) -> String {
    let at = credential
        .expires_at
        .and_then(|ms| i64::try_from(ms).ok())
        .and_then(DateTime::from_timestamp_millis)
        .map(|utc| utc.with_timezone(&Local));
    match (at, remaining) {
        (Some(at), Some(remaining)) => format!(
            "Expires at {} (in {}).",
            at.format("%Y-%m-%d %H:%M:%S"),
            format_remaining(remaining)
        ),
        _ => "No expiry recorded.".to_string(),
    }
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
