use std::sync::Arc;

use mudae_assist::config::AppSettings;
use mudae_assist::dashboard::Dashboard;
use mudae_assist::session::SessionCoordinator;
use mudae_assist::transport::DiscordHttp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = AppSettings::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: DISCORD_TOKEN, DISCORD_CHANNEL_ID, DISCORD_GUILD_ID");
        std::process::exit(1);
    });

    eprintln!("Mudae Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  Channel: {}", settings.discord.channel_id);
    eprintln!("  Mudae:   {}", settings.discord.mudae_user_id);

    let transport = Arc::new(DiscordHttp::new(&settings.discord, &settings.tuning)?);
    let default_boost = settings.tuning.roll_batch_size / 2;
    let coordinator = Arc::new(SessionCoordinator::new(transport, settings));

    Dashboard::new(coordinator, default_boost).run().await
}
