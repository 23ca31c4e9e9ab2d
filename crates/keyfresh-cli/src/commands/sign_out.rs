use keyfresh_config::KeyfreshConfig;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Serialize)]
struct SignOutResponse {
    cleared: bool,
}

pub fn handle(flags: &GlobalFlags, config: &KeyfreshConfig) -> anyhow::Result<()> {
    super::session_manager(super::open_store(flags, config)?).sign_out()?;
    output(&SignOutResponse { cleared: true }, flags.format)
}
