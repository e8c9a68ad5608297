use linkmend::commands::command_argument_builder;
use linkmend::handlers::{handle_monitor, handle_scan, scan_reserves_stdout};
use linkmend_core::print_banner;
use tracing::level_filters::LevelFilter;

/// Exit code for failures that prevented the run from completing.
const EXIT_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    init_tracing(chosen_command.get_count("verbose"));

    // Show banner unless --quiet is set or stdout carries a json/markdown report
    let stdout_reserved = matches!(
        chosen_command.subcommand(),
        Some(("scan", scan)) if scan_reserves_stdout(scan)
    );
    if !quiet && !stdout_reserved {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("scan", sub_matches)) => handle_scan(sub_matches, quiet).await,
        Some(("monitor", sub_matches)) => handle_monitor(sub_matches, quiet).await,
        // No subcommand provided, just show the banner
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
