use clap::ArgMatches;
use tracing::{error, warn};

use camerpulse_core::config::PulseConfig;
use camerpulse_core::events;

mod completions;
mod listen;
mod refresh;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let command = matches.subcommand_name().unwrap_or("none");
    events::log_app_startup(command);

    let result = match matches.subcommand() {
        Some(("listen", sub_matches)) => listen::handle_listen_command(sub_matches),
        Some(("refresh", sub_matches)) => refresh::handle_refresh_command(sub_matches),
        Some(("completions", sub_matches)) => {
            completions::handle_completions_command(sub_matches)
        }
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    };

    if let Err(e) = &result {
        events::log_app_error(e.as_ref());
    }
    events::log_app_shutdown(command);

    result
}

/// Load the config hierarchy, falling back to defaults with a warning.
pub(crate) fn load_config_with_warning() -> PulseConfig {
    match PulseConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.camerpulse/config.toml and ./.camerpulse/config.toml for syntax errors.",
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            PulseConfig::default()
        }
    }
}
