use std::io::Write;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use clap::{ArgAction, Parser};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, LevelFilter};

use leechguard::api::QbitClient;
use leechguard::config::{self, BasicAuth, Config};
use leechguard::fingerprint::DEFAULT_UPLOAD_THRESHOLD;
use leechguard::registry::BanRegistry;
use leechguard::session::SessionController;
use leechguard::utils::duration::parse_duration_to_seconds;

/// Swarm monitor that bans ratio-cheating leech clients via the
/// qBittorrent WebUI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the qBittorrent WebUI
    #[arg(long, env = "API_PREFIX", default_value = "http://127.0.0.1:8080")]
    api_prefix: String,

    /// WebUI username
    #[arg(long, env = "API_USERNAME", default_value = "")]
    username: String,

    /// WebUI password
    #[arg(long, env = "API_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Send HTTP basic auth with every request (for a reverse proxy in
    /// front of the WebUI)
    #[arg(long, env = "BASICAUTH_ENABLED", default_value = "false",
          value_parser = config::parse_bool, action = ArgAction::Set)]
    basicauth_enabled: bool,

    /// Basic-auth username
    #[arg(long, env = "BASICAUTH_USERNAME", default_value = "")]
    basicauth_username: String,

    /// Basic-auth password
    #[arg(long, env = "BASICAUTH_PASSWORD", default_value = "", hide_env_values = true)]
    basicauth_password: String,

    /// Sleep between polling cycles, in seconds or a suffixed duration
    /// ("30s", "5m", "1h")
    #[arg(long, env = "INTERVAL_SECONDS", default_value = "5",
          value_parser = parse_duration_to_seconds)]
    interval: u64,

    /// How long a detected peer stays banned, in seconds or a suffixed
    /// duration
    #[arg(long, env = "DEFAULT_BAN_SECONDS", default_value = "3600",
          value_parser = parse_duration_to_seconds)]
    ban_duration: u64,

    /// Ban aggressive leech clients
    #[arg(long, env = "BAN_LEECH", default_value = "true",
          value_parser = config::parse_bool, action = ArgAction::Set)]
    ban_leech: bool,

    /// Ban known P2P player clients
    #[arg(long, env = "BAN_PLAYER", default_value = "true",
          value_parser = config::parse_bool, action = ArgAction::Set)]
    ban_player: bool,

    /// Ban miscellaneous offender clients
    #[arg(long, env = "BAN_OTHERS", default_value = "false",
          value_parser = config::parse_bool, action = ArgAction::Set)]
    ban_others: bool,

    /// Ban target-category peers immediately, without ratio
    /// verification
    #[arg(long, env = "BAN_WITHOUT_RATIO_CHECK", default_value = "true",
          value_parser = config::parse_bool, action = ArgAction::Set)]
    ban_without_ratio_check: bool,

    /// Minimum uploaded bytes before a zero-progress peer counts as a
    /// ratio cheat
    #[arg(long, env = "UPLOAD_THRESHOLD_BYTES", default_value_t = DEFAULT_UPLOAD_THRESHOLD)]
    upload_threshold: u64,

    /// UTC offset for log timestamps (e.g. +08:00)
    #[arg(long, env = "LOG_TIMEZONE", default_value = "+00:00",
          value_parser = config::parse_offset)]
    timezone: FixedOffset,

    /// Minimum log severity (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info",
          value_parser = config::parse_level)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments and their env-var fallbacks; bad
    // values (URL, offset, log level, durations) fail here, before the
    // loop ever starts
    let args = Args::parse();

    init_logging(args.log_level, args.timezone);

    let config = Config {
        api_base_url: args.api_prefix,
        username: args.username,
        password: args.password,
        basic_auth: args.basicauth_enabled.then(|| BasicAuth {
            username: args.basicauth_username,
            password: args.basicauth_password,
        }),
        poll_interval: Duration::from_secs(args.interval),
        ban_duration: Duration::from_secs(args.ban_duration),
        ban_leech: args.ban_leech,
        ban_player: args.ban_player,
        ban_others: args.ban_others,
        skip_ratio_check: args.ban_without_ratio_check,
        upload_threshold: args.upload_threshold,
        timezone: args.timezone,
        log_level: args.log_level,
    };
    config.validate().wrap_err("configuration rejected")?;

    info!("Starting LeechGuard");
    info!("WebUI endpoint: {}", config.api_base_url);
    info!(
        "Poll interval: {}s, ban duration: {}s",
        config.poll_interval.as_secs(),
        config.ban_duration.as_secs()
    );
    info!(
        "Categories enabled: leech={}, player={}, others={}; ratio check {}",
        config.ban_leech,
        config.ban_player,
        config.ban_others,
        if config.skip_ratio_check { "skipped" } else { "enforced" }
    );

    let client = QbitClient::new(
        &config.api_base_url,
        &config.username,
        &config.password,
        config
            .basic_auth
            .as_ref()
            .map(|auth| (auth.username.as_str(), auth.password.as_str())),
    );
    let registry = BanRegistry::new(config.ban_duration);
    let mut controller =
        SessionController::new(client, config.policy(), registry, config.poll_interval);

    controller.run().wrap_err("control loop terminated")?;
    Ok(())
}

/// Initialize logging with the configured minimum severity, rendering
/// timestamps in the configured UTC offset.
fn init_logging(level: LevelFilter, offset: FixedOffset) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level.to_string()))
        .format(move |buf, record| {
            let timestamp = Utc::now().with_timezone(&offset);
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                timestamp.format("%Y-%m-%d %H:%M:%S%:z"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
