use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Store a freshly issued token pair.
    SignIn(SignInArgs),
    /// Show what is stored and whether the access token is expired.
    Status,
    /// Print a valid access token, refreshing it if needed.
    Token,
    /// Exchange the refresh token for a new pair now.
    Refresh,
    /// Erase the stored token pair.
    SignOut,
}

#[derive(Clone, Debug, Args)]
pub struct SignInArgs {
    /// Access token issued by the authentication server.
    #[arg(long)]
    pub access_token: String,
    /// Refresh token issued alongside the access token.
    #[arg(long)]
    pub refresh_token: String,
}
