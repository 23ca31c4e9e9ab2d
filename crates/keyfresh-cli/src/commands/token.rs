use keyfresh_config::KeyfreshConfig;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
}

pub async fn handle(flags: &GlobalFlags, config: &KeyfreshConfig) -> anyhow::Result<()> {
    let manager = super::token_manager(flags, config)?;
    let access_token = manager.access_token().await?;
    output(&TokenResponse { access_token }, flags.format)
}
