mod refresh;
mod sign_in;
mod sign_out;
mod status;
mod token;

use std::sync::Arc;

use anyhow::Context;
use keyfresh_auth::{ClientTokenStore, TokenManager};
use keyfresh_config::KeyfreshConfig;

use crate::cli::{Commands, GlobalFlags};

/// Handle `kf <command>`.
pub async fn dispatch(
    command: &Commands,
    flags: &GlobalFlags,
    config: &KeyfreshConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::SignIn(args) => sign_in::handle(args, flags, config),
        Commands::Status => status::handle(flags, config),
        Commands::Token => token::handle(flags, config).await,
        Commands::Refresh => refresh::handle(flags, config).await,
        Commands::SignOut => sign_out::handle(flags, config),
    }
}

/// Open the cookie jar selected by `--jar` or configuration.
pub(crate) fn open_store(
    flags: &GlobalFlags,
    config: &KeyfreshConfig,
) -> anyhow::Result<Arc<ClientTokenStore>> {
    let store = match &flags.jar {
        Some(path) => ClientTokenStore::open(path, config.cookies.clone()),
        None => ClientTokenStore::ambient(config).context("failed to open cookie jar")?,
    };
    Ok(Arc::new(store))
}

/// A manager over the selected jar, wired to the configured refresh endpoint.
pub(crate) fn token_manager(
    flags: &GlobalFlags,
    config: &KeyfreshConfig,
) -> anyhow::Result<TokenManager> {
    let store = open_store(flags, config)?;
    TokenManager::from_config(config, store)
        .context("refresh endpoint unavailable; set KEYFRESH_REFRESH__ENDPOINT")
}

/// A manager over the selected jar for commands that never refresh.
pub(crate) fn session_manager(store: Arc<ClientTokenStore>) -> TokenManager {
    TokenManager::without_refresh(store)
}
