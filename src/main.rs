/// Event Journal - moderation backend
///
/// Community members submit events, admins approve or reject them, and the
/// creator is notified by email, push and in-app notification. Users also
/// keep travel journals that others can find on a map, like, bookmark and
/// comment on.

mod account;
mod admin;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod events;
mod journals;
mod mailer;
mod notifications;
mod push;
mod server;

#[cfg(test)]
mod test_support;

use config::ServerConfig;
use context::AppContext;
use error::AppResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration (also reads .env, which may set RUST_LOG)
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let default_filter = format!(
        "event_journal={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ______                 __        __                              __
   / ____/   _____  ____  / /_      / /___  __  ___________  ____ _/ /
  / __/ | | / / _ \/ __ \/ __/ __  / / __ \/ / / / ___/ __ \/ __ `/ /
 / /___ | |/ /  __/ / / / /_  / /_/ / /_/ / /_/ / /  / / / / /_/ / /
/_____/ |___/\___/_/ /_/\__/  \____/\____/\__,_/_/  /_/ /_/\__,_/_/

        Event Journal moderation backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
