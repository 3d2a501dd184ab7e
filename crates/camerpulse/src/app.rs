use clap::{Arg, ArgAction, Command, value_parser};
use clap_complete::Shell;

pub fn build_cli() -> Command {
    Command::new("camerpulse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live notifications and dashboard refresh settings for CamerPulse")
        .long_about("CamerPulse keeps a realtime notification socket open with automatic reconnects and schedules the periodic refresh of its civic dashboards. This CLI streams notifications to the terminal and manages the stored refresh intervals.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("listen")
                .about("Connect to the notification channel and print events until Ctrl-C")
                .arg(
                    Arg::new("url")
                        .long("url")
                        .help("Notification endpoint (overrides config)")
                )
                .arg(
                    Arg::new("user-id")
                        .long("user-id")
                        .short('u')
                        .help("User id sent in the authenticate frame (overrides config)")
                )
                .arg(
                    Arg::new("channel")
                        .long("channel")
                        .short('c')
                        .help("Extra channel to subscribe to (repeatable)")
                        .action(ArgAction::Append)
                )
                .arg(
                    Arg::new("tender")
                        .long("tender")
                        .short('t')
                        .help("Tender id to follow (repeatable)")
                        .action(ArgAction::Append)
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON object per notification")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("notify")
                        .long("notify")
                        .help("Also show desktop notifications (overrides config)")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("refresh")
                .about("Inspect and change dashboard refresh intervals")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Show effective intervals (defaults merged with stored overrides)")
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .help("Output in JSON format")
                                .action(ArgAction::SetTrue)
                        )
                )
                .subcommand(
                    Command::new("set")
                        .about("Store an interval override for one task")
                        .arg(
                            Arg::new("task")
                                .help("Task name, e.g. trend_radar")
                                .required(true)
                                .index(1)
                        )
                        .arg(
                            Arg::new("interval-ms")
                                .help("Interval in milliseconds")
                                .required(true)
                                .index(2)
                                .value_parser(value_parser!(u64))
                        )
                )
                .subcommand(
                    Command::new("reset")
                        .about("Delete stored overrides and return to the defaults")
                )
                .subcommand(
                    Command::new("history")
                        .about("Show recent refresh executions from the audit log")
                        .long_about(
                            "Show recent refresh executions from the audit log.\n\n\
                             The log is written by applications that run the refresh \
                             orchestrator with an audit log sink. This CLI only reads it, \
                             so the history stays empty until such an app has run."
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .short('n')
                                .help("Number of records to show")
                                .value_parser(value_parser!(usize))
                                .default_value("20")
                        )
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .help("Output in JSON format")
                                .action(ArgAction::SetTrue)
                        )
                )
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .help("Target shell")
                        .required(true)
                        .index(1)
                        .value_parser(value_parser!(Shell))
                )
        )
}
