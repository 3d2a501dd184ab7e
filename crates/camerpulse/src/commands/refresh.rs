use clap::ArgMatches;
use tracing::{error, info};

use camerpulse_core::refresh::{
    RefreshConfig, RefreshRecord, clear_config, load_config, read_audit_log, save_config,
};
use camerpulse_core::{ConfigError, PulseConfig, RefreshSettings};

use super::load_config_with_warning;
use crate::table::{IntervalRow, TableFormatter, format_interval};

pub(crate) fn handle_refresh_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_warning();

    match matches.subcommand() {
        Some(("show", sub_matches)) => handle_show(&config, sub_matches.get_flag("json")),
        Some(("set", sub_matches)) => {
            let task = sub_matches
                .get_one::<String>("task")
                .ok_or("Task argument is required")?;
            let interval_ms = *sub_matches
                .get_one::<u64>("interval-ms")
                .ok_or("Interval argument is required")?;
            handle_set(&config, task, interval_ms)
        }
        Some(("reset", _)) => handle_reset(&config),
        Some(("history", sub_matches)) => {
            let limit = sub_matches.get_one::<usize>("limit").copied().unwrap_or(20);
            handle_history(&config, limit, sub_matches.get_flag("json"))
        }
        _ => {
            error!(event = "cli.refresh.subcommand_unknown");
            Err("Unknown refresh subcommand".into())
        }
    }
}

fn handle_show(config: &PulseConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.refresh_settings();
    let effective = load_config(settings.state_file.as_deref(), &settings.defaults);
    let rows = interval_rows(&settings, &effective);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    TableFormatter::new(&rows).print_table(&rows);
    if let Some(path) = &settings.state_file {
        println!("Stored overrides: {}", path.display());
    }
    Ok(())
}

fn handle_set(
    config: &PulseConfig,
    task: &str,
    interval_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.refresh_settings();
    let path = settings.state_file.clone().ok_or(ConfigError::HomeDirNotFound)?;

    let mut effective = load_config(Some(&path), &settings.defaults);
    let overrides = [(task.to_string(), interval_ms)].into_iter().collect();
    let (changed, mut rejected) = effective.merge_known(&overrides);
    if let Some(rejection) = rejected.pop() {
        eprintln!("❌ Failed to set interval: {}", rejection);
        error!(event = "cli.refresh.set_rejected", task = task, error = %rejection);
        return Err(rejection.into());
    }

    if changed.is_empty() {
        println!(
            "{} already refreshes every {}",
            task,
            format_interval(interval_ms)
        );
        return Ok(());
    }

    save_config(&path, &effective)?;
    info!(event = "cli.refresh.set_completed", task = task, interval_ms = interval_ms);
    println!("{} now refreshes every {}", task, format_interval(interval_ms));
    Ok(())
}

fn handle_reset(config: &PulseConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = config.refresh.state_file() else {
        return Err(ConfigError::HomeDirNotFound.into());
    };

    if clear_config(&path)? {
        info!(event = "cli.refresh.reset_completed", path = %path.display());
        println!("Refresh intervals reset to defaults.");
    } else {
        println!("No stored refresh intervals. Already using defaults.");
    }
    Ok(())
}

fn handle_history(
    config: &PulseConfig,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = config.refresh.audit_log() else {
        return Err(ConfigError::HomeDirNotFound.into());
    };
    let records = read_audit_log(&path, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!(
            "No refresh executions recorded in {}. The log is filled by apps running the refresh orchestrator with an audit log.",
            path.display()
        );
        return Ok(());
    }

    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

fn interval_rows(settings: &RefreshSettings, effective: &RefreshConfig) -> Vec<IntervalRow> {
    effective
        .intervals()
        .iter()
        .map(|(task, &interval_ms)| IntervalRow {
            task: task.clone(),
            interval_ms,
            source: if settings.defaults.get(task) == Some(&interval_ms) {
                "default"
            } else {
                "stored"
            },
            tab_sensitive: settings.is_tab_sensitive(task),
        })
        .collect()
}

fn format_record(record: &RefreshRecord) -> String {
    let status = match &record.error_message {
        None if record.success => "ok".to_string(),
        None => "failed".to_string(),
        Some(message) => format!("failed: {}", message),
    };
    format!(
        "{}  {:<18} {}",
        record.refresh_time.format("%Y-%m-%d %H:%M:%S"),
        record.component_name,
        status
    )
}
