//! CLI auth command handlers for login, status, and logout.

use tokio::sync::broadcast::error::RecvError;

use crate::auth::{AuthStart, AuthState};
use crate::cli::context::Context;
use crate::config::SettingsStore;
use crate::events::SrEvent;

/// Handle `nightbot-sr auth login`.
pub async fn handle_login(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = ctx.events.subscribe();

    match ctx.session.authenticate().await? {
        AuthStart::Started(device) => {
            println!("🔗 Visit: {}", device.verification_url);
            println!("📋 Enter code: {}", device.user_code);
            println!("⏳ Waiting for authorization...");
        }
        AuthStart::AlreadyAuthenticated => {
            println!("✅ Already signed in");
            return Ok(());
        }
        AuthStart::InProgress | AuthStart::Cancelled => {
            return Err("another sign-in is in progress".into());
        }
    }

    loop {
        match rx.recv().await {
            Ok(SrEvent::AuthCountdown { remaining_secs }) if remaining_secs % 60 == 0 => {
                println!("   {} minute(s) left", remaining_secs / 60);
            }
            Ok(SrEvent::AuthCompleted { success: true }) => break,
            Ok(SrEvent::AuthCompleted { success: false }) => {
                return Err("authorization failed or expired; please try again".into());
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return Err("event bus closed".into()),
        }
    }

    let name = ctx
        .sync
        .on_authenticated()
        .await?
        .unwrap_or_default();
    if name.is_empty() {
        println!("✅ Nightbot login successful!");
    } else {
        println!("✅ Signed in as {name}");
    }
    Ok(())
}

/// Handle `nightbot-sr auth status`.
pub async fn handle_status(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔐 Authentication Status\n");

    match (ctx.session.state(), ctx.tokens.snapshot()) {
        (AuthState::Authenticated, Some(token)) => {
            let status = match token.expires_at {
                Some(expires) => format!("✅ Logged in (expires {})", expires.format("%Y-%m-%d %H:%M")),
                None => "✅ Logged in".to_string(),
            };
            println!("  Nightbot: {status}");
            let user = ctx.settings.user_name();
            if !user.is_empty() {
                println!("  User: {user}");
            }
        }
        _ => println!("  Nightbot: ❌ Not logged in"),
    }

    println!("\n📌 Environment Variables:");
    for name in ["NIGHTBOT_CLIENT_ID", "NIGHTBOT_CLIENT_SECRET"] {
        let status = if std::env::var(name).is_ok() {
            "✅ Set"
        } else {
            "❌ Not set"
        };
        println!("  {name}: {status}");
    }
    println!("\n📁 Data directory: {}", ctx.config.data_dir().display());
    Ok(())
}

/// Handle `nightbot-sr auth logout`.
pub async fn handle_logout(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    ctx.session.clear_tokens();
    ctx.sync.on_signed_out();
    if let Err(e) = ctx.settings.set_user_name("") {
        tracing::warn!(error = %e, "failed to clear stored user name");
    }
    println!("✅ Logged out");
    Ok(())
}
