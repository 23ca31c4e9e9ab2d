use keyfresh_auth::SessionIdentity;
use keyfresh_config::KeyfreshConfig;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Serialize)]
struct RefreshResponse {
    refreshed: bool,
    identity: Option<SessionIdentity>,
}

pub async fn handle(flags: &GlobalFlags, config: &KeyfreshConfig) -> anyhow::Result<()> {
    let manager = super::token_manager(flags, config)?;
    manager.force_refresh().await?;
    output(
        &RefreshResponse {
            refreshed: true,
            identity: manager.identity()?,
        },
        flags.format,
    )
}
