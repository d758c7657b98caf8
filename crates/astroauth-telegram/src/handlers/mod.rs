//! Telegram update handlers.
//!
//! Only `/start` is meaningful to this bot; every other message is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::{error, warn};

use astroauth_core::{domain::StartEvent, replies};

use crate::router::AppState;

mod commands;

pub use commands::parse_start_payload;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = commands::start_event(&msg) else {
        return Ok(());
    };

    run_start(&state, &event).await
}

/// Handler boundary: any failure gets the generic reply; the dispatcher keeps running.
async fn run_start(state: &AppState, event: &StartEvent) -> ResponseResult<()> {
    let Err(e) = state.authorizer.handle_start(event).await else {
        return Ok(());
    };

    error!(
        chat_id = event.chat_id.0,
        telegram_id = event.requester.id.0,
        error = %e,
        "start handler failed"
    );
    if let Err(e) = state
        .messenger
        .send_text(event.chat_id, replies::INTERNAL_ERROR)
        .await
    {
        warn!(chat_id = event.chat_id.0, error = %e, "internal error reply failed");
    }

    Ok(())
}
