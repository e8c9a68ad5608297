use chrono::Utc;
use linkmend::commands::command_argument_builder;
use linkmend::handlers::*;
use linkmend_core::diagnose::diagnose;
use linkmend_core::monitor::{EndpointStatus, MonitorRound};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::{NamedTempFile, tempdir};
use url::Url;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com/docs");
    assert_eq!(result, Some("http://example.com/docs".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    let result = parse_url_line("not a valid url!!!");
    assert_eq!(result, None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com")?;
    writeln!(temp_file, "example.org/status")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "  https://api.example.com/health  ")?;
    writeln!(temp_file, "not a url at all")?;

    let path = PathBuf::from(temp_file.path());
    let urls = load_urls_from_file(&path)?;

    assert_eq!(
        urls,
        vec![
            "https://example.com",
            "http://example.org/status",
            "https://api.example.com/health",
        ]
    );

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_urls_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("No valid URLs"));
}

#[test]
fn test_load_urls_from_missing_file() {
    let result = load_urls_from_file(&PathBuf::from("/nonexistent/linkmend/urls.txt"));
    assert!(result.unwrap_err().to_string().contains("Failed to read URL file"));
}

#[test]
fn test_load_urls_from_source_urls() {
    let a = Url::parse("https://example.com").unwrap();
    let b = Url::parse("https://example.com/status").unwrap();
    let result = load_urls_from_source(&[&a, &b], None).unwrap();

    assert_eq!(result, vec!["https://example.com/", "https://example.com/status"]);
}

#[test]
fn test_load_urls_from_source_prefers_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://from-file.example.com/")?;
    let path = PathBuf::from(temp_file.path());

    let url = Url::parse("https://example.com").unwrap();
    let result = load_urls_from_source(&[&url], Some(&path))?;
    assert_eq!(result, vec!["https://from-file.example.com/"]);
    Ok(())
}

#[test]
fn test_load_urls_from_source_no_input() {
    let result = load_urls_from_source(&[], None);
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Either --url or --hosts-file must be provided")
    );
}

#[test]
fn test_write_output_creates_parent_dirs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let target = dir.path().join("reports").join("scan.md");

    let written = write_output("# Link report\n", Some(&target))?;

    assert_eq!(written, Some(target.clone()));
    assert_eq!(std::fs::read_to_string(&target)?, "# Link report\n");
    Ok(())
}

#[test]
fn test_format_round() {
    let error = "error sending request: Connection refused".to_string();
    let round = MonitorRound {
        round: 3,
        checked_at: Utc::now(),
        endpoints: vec![
            EndpointStatus {
                url: "https://example.com/".to_string(),
                status_code: Some(200),
                healthy: true,
                elapsed_ms: 42,
                final_url: None,
                error: None,
                diagnosis: None,
            },
            EndpointStatus {
                url: "https://down.example.com/".to_string(),
                status_code: None,
                healthy: false,
                elapsed_ms: 7,
                final_url: None,
                diagnosis: Some(diagnose(&error)),
                error: Some(error),
            },
        ],
    };

    let text = format_round(&round);

    assert!(text.contains("Round 3"));
    assert!(text.contains("https://example.com/"));
    assert!(text.contains("(42ms)"));
    assert!(text.contains("---"));
    assert!(text.contains("Connection refused"));
    assert!(text.contains("Nothing is listening"));
}

fn scan_args(extra: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["linkmend", "scan", "-u", "https://example.com/"];
    argv.extend_from_slice(extra);
    let matches = command_argument_builder().try_get_matches_from(argv).unwrap();
    matches.subcommand_matches("scan").unwrap().clone()
}

#[test]
fn test_text_scan_leaves_stdout_free() {
    assert!(!scan_reserves_stdout(&scan_args(&[])));
    assert!(!scan_reserves_stdout(&scan_args(&["-f", "text"])));
}

#[test]
fn test_json_and_markdown_scans_reserve_stdout() {
    assert!(scan_reserves_stdout(&scan_args(&["-f", "json"])));
    assert!(scan_reserves_stdout(&scan_args(&["--format", "markdown"])));
    assert!(scan_reserves_stdout(&scan_args(&["-f", "md"])));
}

#[test]
fn test_report_file_frees_stdout() {
    assert!(!scan_reserves_stdout(&scan_args(&["-f", "json", "-o", "report.json"])));
}

#[test]
fn test_second_interrupt_aborts() {
    let flag = AtomicBool::new(false);

    assert_eq!(interrupt_action(&flag), Interrupt::Cancel);
    assert!(flag.load(Ordering::SeqCst));
    assert_eq!(interrupt_action(&flag), Interrupt::Abort);
    assert_eq!(interrupt_action(&flag), Interrupt::Abort);
}

#[tokio::test]
async fn test_scan_fails_when_root_unreachable() -> Result<(), Box<dyn std::error::Error>> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let root = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
    drop(listener);

    let dir = tempdir()?;
    let target = dir.path().join("scan.json");
    let matches = command_argument_builder().try_get_matches_from([
        "linkmend",
        "scan",
        "-u",
        root.as_str(),
        "--timeout",
        "2",
        "-f",
        "json",
        "-o",
        target.to_str().unwrap(),
    ])?;
    let scan = matches.subcommand_matches("scan").unwrap();

    let err = handle_scan(scan, true).await.unwrap_err();
    assert!(err.to_string().contains("Could not render root page"));

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&target)?)?;
    assert_eq!(saved["unreachable_pages"][0], root.as_str());
    Ok(())
}
