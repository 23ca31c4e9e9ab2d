use keyfresh_auth::{SessionIdentity, TokenPair};
use keyfresh_config::KeyfreshConfig;
use serde::Serialize;

use crate::cli::{GlobalFlags, SignInArgs};
use crate::output::output;

#[derive(Serialize)]
struct SignInResponse {
    stored: bool,
    access_token_expired: bool,
    identity: Option<SessionIdentity>,
}

pub fn handle(
    args: &SignInArgs,
    flags: &GlobalFlags,
    config: &KeyfreshConfig,
) -> anyhow::Result<()> {
    let manager = super::session_manager(super::open_store(flags, config)?);
    manager.sign_in(&TokenPair::new(args.access_token.trim(), args.refresh_token.trim()))?;

    let status = manager.status()?;
    if status.access_token_expired {
        tracing::warn!("stored access token is already expired; next use will refresh it");
    }

    output(
        &SignInResponse {
            stored: true,
            access_token_expired: status.access_token_expired,
            identity: status.identity,
        },
        flags.format,
    )
}
