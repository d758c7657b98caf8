use std::sync::Arc;

use astroauth_core::config::Config;
use astroauth_supabase::SupabaseStore;

#[tokio::main]
async fn main() -> Result<(), astroauth_core::Error> {
    astroauth_core::logging::init("astroauth")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!(error = %e, "cannot start");
            return Err(e);
        }
    };

    let store = Arc::new(SupabaseStore::new(&cfg)?);

    astroauth_telegram::router::run_polling(cfg, store.clone(), store)
        .await
        .map_err(|e| astroauth_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
