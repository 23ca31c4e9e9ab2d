use keyfresh_auth::SessionStatus;
use keyfresh_config::KeyfreshConfig;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    session: SessionStatus,
    jar: Option<String>,
    refresh_endpoint: Option<String>,
}

pub fn handle(flags: &GlobalFlags, config: &KeyfreshConfig) -> anyhow::Result<()> {
    let store = super::open_store(flags, config)?;
    let jar = store.path().map(|p| p.display().to_string());
    let session = super::session_manager(store).status()?;

    output(
        &StatusResponse {
            session,
            jar,
            refresh_endpoint: config
                .refresh
                .is_configured()
                .then(|| config.refresh.endpoint.clone()),
        },
        flags.format,
    )
}
