use std::sync::Arc;

use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
};
use tracing::{info, warn};

use astroauth_core::{
    authorizer::SessionAuthorizer,
    config::Config,
    messaging::port::MessagingPort,
    ports::{ManagerDirectory, SessionStore},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<SessionAuthorizer>,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Long-poll Telegram until SIGINT/SIGTERM, then let in-flight updates finish.
pub async fn run_polling(
    cfg: Arc<Config>,
    managers: Arc<dyn ManagerDirectory>,
    sessions: Arc<dyn SessionStore>,
) -> anyhow::Result<()> {
    let telegram = TelegramMessenger::new(Bot::new(cfg.bot_token.clone()));
    let bot = telegram.bot();

    let me = bot.get_me().await?;
    info!(bot = %me.username(), "astroauth bot started");

    let messenger: Arc<dyn MessagingPort> = Arc::new(telegram);
    let authorizer = Arc::new(SessionAuthorizer::new(
        managers,
        sessions,
        messenger.clone(),
    ));
    let state = Arc::new(AppState {
        authorizer,
        messenger,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    tokio::spawn(stop_on_signal(dispatcher.shutdown_token()));

    dispatcher.dispatch().await;
    info!("dispatcher stopped");

    Ok(())
}

async fn stop_on_signal(token: ShutdownToken) {
    let signal = wait_for_signal().await;
    info!(signal, "shutdown signal received, stopping dispatcher");
    match token.shutdown() {
        Ok(done) => done.await,
        Err(e) => warn!(error = %e, "dispatcher was not running at shutdown"),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
