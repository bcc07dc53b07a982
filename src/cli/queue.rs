//! CLI handlers for the queue, request toggle, watch and settings commands.

use tokio::sync::broadcast::error::RecvError;

use crate::cli::context::Context;
use crate::cli::{QueueCommands, RequestsCommands, SettingsCommands, SettingsSetArgs};
use crate::config::SettingsStore;
use crate::error::SrError;
use crate::events::SrEvent;
use crate::queue::Queue;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `nightbot-sr queue ...`.
pub async fn handle_queue(ctx: &Context, command: QueueCommands) -> CliResult {
    ctx.require_login()?;
    let handle = match command {
        QueueCommands::Show => {
            print_queue(&ctx.client.fetch_queue().await);
            return Ok(());
        }
        QueueCommands::Add { query } => {
            let query = query.join(" ");
            return match ctx.sync.add_song(query).await? {
                Some(Ok(message)) => {
                    println!("✅ {message}");
                    Ok(())
                }
                Some(Err(e)) => Err(failure_text(&e).into()),
                None => Err("shutting down".into()),
            };
        }
        QueueCommands::Play => ctx.sync.play(),
        QueueCommands::Pause => ctx.sync.pause(),
        QueueCommands::Skip => ctx.sync.skip(),
        QueueCommands::Delete { id } => ctx.sync.delete_song(id),
        QueueCommands::Promote { id } => ctx.sync.promote_song(id),
    };
    handle.await?;
    // Give the API time to settle before showing the result.
    tokio::time::sleep(ctx.config.refetch_delay()).await;
    print_queue(&ctx.client.fetch_queue().await);
    Ok(())
}

/// The inline failure message plus what the user can do about it.
fn failure_text(error: &SrError) -> String {
    let message = error.user_message();
    match error.recovery_suggestion().hint() {
        Some(hint) => format!("{message}; {hint}"),
        None => message,
    }
}

/// Handle `nightbot-sr requests on|off`.
pub async fn handle_requests(ctx: &Context, command: RequestsCommands) -> CliResult {
    ctx.require_login()?;
    let enabled = matches!(command, RequestsCommands::On);
    ctx.sync.set_requests_enabled(enabled).await?;
    println!(
        "🎵 Song requests {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Handle `nightbot-sr watch`: print every fetched snapshot until Ctrl-C.
pub async fn handle_watch(ctx: &Context, interval: Option<u32>) -> CliResult {
    ctx.require_login()?;
    let interval = interval.unwrap_or_else(|| ctx.settings.auto_refresh_interval_secs());
    let mut rx = ctx.events.subscribe();
    let follower = ctx.sync.follow_session(&ctx.events);

    if !ctx.sync.start_auto_refresh(interval) {
        follower.abort();
        return Err(format!("refresh interval must be between 5 and 300 seconds, got {interval}").into());
    }
    ctx.sync.refresh();
    println!("👀 Watching the queue every {interval}s (Ctrl-C to stop)");

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = rx.recv() => match event {
                Ok(SrEvent::QueueFetched(queue)) => print_queue(&queue),
                Ok(SrEvent::RequestsEnabled(enabled)) => {
                    println!("🎵 Requests {}", if enabled { "open" } else { "closed" });
                }
                Ok(SrEvent::SessionExpired) => break Err("session expired; sign in again".into()),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "display fell behind");
                }
                Err(RecvError::Closed) => break Ok(()),
            }
        }
    };
    follower.abort();
    ctx.sync.shutdown();
    result
}

/// Handle `nightbot-sr settings show|set`.
pub async fn handle_settings(ctx: &Context, command: SettingsCommands) -> CliResult {
    match command {
        SettingsCommands::Show => {
            let settings = ctx.settings.get();
            println!("⚙️  Settings ({})\n", ctx.settings.path().display());
            println!("  Auto-refresh: {}", settings.auto_refresh_enabled);
            println!("  Interval: {}s", settings.auto_refresh_interval_secs);
            if !settings.user_name.is_empty() {
                println!("  User: {}", settings.user_name);
            }
            Ok(())
        }
        SettingsCommands::Set(SettingsSetArgs {
            auto_refresh,
            interval,
        }) => {
            if let Some(secs) = interval {
                ctx.settings.set_auto_refresh_interval_secs(secs)?;
            }
            if let Some(enabled) = auto_refresh {
                ctx.settings.set_auto_refresh_enabled(enabled)?;
            }
            println!("✅ Settings saved");
            Ok(())
        }
    }
}

fn print_queue(queue: &Queue) {
    if queue.is_empty() {
        println!("📭 Queue is empty");
        return;
    }
    if let Some(current) = queue.current() {
        println!("▶️  {} [{}] ({})", current.title, current.duration_label(), current.submitted_by);
    }
    for entry in queue.upcoming() {
        println!(
            "  {:>3}. {} [{}] ({}) id={}",
            entry.position,
            entry.title,
            entry.duration_label(),
            entry.submitted_by,
            entry.id
        );
    }
    let total = queue.total_duration_secs();
    println!("  {} song(s), {}:{:02} total", queue.len(), total / 60, total % 60);
}
