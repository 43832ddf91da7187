//! Telegram update handlers
//!
//! Wires callback queries into the interaction router and exposes a small
//! set of admin commands. Everything heavier lives in the publisher, the
//! scheduler, and the pagination modules.

use crate::bot::publish::CardPublisher;
use crate::card::CardSource;
use crate::config::Settings;
use crate::pagination::router::{info_notice, CallbackOutcome, InteractionRouter};
use crate::scheduler::Scheduler;
use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

/// Supported admin commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Send one random card right now
    #[command(description = "Send one random card now.")]
    Card,
    /// Show scheduler and session statistics
    #[command(description = "Show bot statistics.")]
    Stats,
    /// List available commands
    #[command(description = "Show this help.")]
    Help,
}

/// Extract the sender's user id, or 0 when the message has no sender
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Build the dispatcher tree: navigation callbacks plus admin commands
#[must_use]
pub fn handler_tree() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_card_callback))
        .branch(
            Update::filter_message()
                .filter(|msg: Message, settings: Arc<Settings>| {
                    settings.admin_users().contains(&get_user_id_safe(&msg))
                })
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
}

async fn handle_card_callback(
    bot: Bot,
    q: CallbackQuery,
    router: Arc<InteractionRouter>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = process_callback(&bot, q, &router).await {
        error!("Callback handler error: {e}");
    }
    respond(())
}

async fn process_callback(
    bot: &Bot,
    q: CallbackQuery,
    router: &InteractionRouter,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    debug!("Received callback: {data}");

    let Some(outcome) = router.process(data).await else {
        debug!("Ignoring malformed callback payload: {data}");
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    match outcome {
        CallbackOutcome::Info {
            view: Some(view), ..
        } => {
            // The notice rides on the mandatory callback answer
            let _ = bot
                .answer_callback_query(q.id.clone())
                .text(info_notice(&view))
                .show_alert(true)
                .await;
        }
        CallbackOutcome::Navigate {
            new_view: Some(view),
            ..
        } => {
            // Answer right away so the button stops spinning during the repost
            let _ = bot.answer_callback_query(q.id.clone()).await;
            let Some(message) = q.message.as_ref() else {
                return Ok(());
            };
            let destination = message.chat().id.to_string();
            router
                .render_navigation(&destination, message.id(), &view)
                .await?;
        }
        // Boundary presses, stale sessions, and noop buttons: just stop the spinner
        _ => {
            let _ = bot.answer_callback_query(q.id.clone()).await;
        }
    }
    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    publisher: Arc<CardPublisher>,
    source: Arc<dyn CardSource>,
    scheduler: Arc<Scheduler>,
    router: Arc<InteractionRouter>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Card => send_card_now(&bot, &msg, &publisher, source.as_ref()).await,
        Command::Stats => send_stats(&bot, &msg, &router, &scheduler).await,
        Command::Help => send_help(&bot, &msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {e}");
    }
    respond(())
}

async fn send_card_now(
    bot: &Bot,
    msg: &Message,
    publisher: &CardPublisher,
    source: &dyn CardSource,
) -> Result<()> {
    let user_id = get_user_id_safe(msg);
    info!("User {user_id} requested an immediate card send.");

    let card = source.random_card().await?;
    let report = publisher.publish_card(&card).await?;

    let reply = if report.any_delivered() {
        format!(
            "✅ <b>{}</b> sent to {}/{} channels.",
            html_escape::encode_text(&card.display_name),
            report.success_count,
            report.total_destinations
        )
    } else {
        "❌ The card reached no channel.".to_string()
    };
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn send_stats(
    bot: &Bot,
    msg: &Message,
    router: &InteractionRouter,
    scheduler: &Scheduler,
) -> Result<()> {
    let status = scheduler.status().await;
    let next_send = status
        .next_send_time
        .map_or_else(|| "—".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string());

    let stats_text = format!(
        "<b>📊 Bot Statistics</b>\n\n\
         <b>Browsing sessions:</b> {}\n\
         <b>Scheduler:</b> {}\n\
         <b>Interval:</b> every {} hour(s)\n\
         <b>Next send:</b> {next_send}",
        router.store().active_sessions().await,
        if status.is_running { "running" } else { "stopped" },
        status.config.interval_hours,
    );

    bot.send_message(msg.chat.id, stats_text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn send_help(bot: &Bot, msg: &Message) -> Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}
