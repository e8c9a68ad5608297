use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkmend")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkmend")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" ... "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a site, verify every internal link and suggest replacements for the \
                broken ones.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The root URL to crawl")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Maximum number of pages to render")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM>)
                        .required(false)
                        .help("Maximum number of link checks in flight")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-e --"exclude" <REGEX>)
                        .required(false)
                        .help("Skip pages whose URL matches this pattern (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"no-follow-redirects")
                        .required(false)
                        .help("Report 3xx responses as-is instead of following them")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-k --"known-good-file" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of extra URLs to offer as replacements")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"min-confidence" <SCORE>)
                        .required(false)
                        .help("Drop suggestions scoring below this value (0.0 - 1.0)")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("0.5"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-r --"redirects" <PLATFORM>)
                        .required(false)
                        .help("Also emit redirect rules: netlify, vercel, nginx, apache")
                        .value_parser(["netlify", "vercel", "nginx", "apache", "htaccess"]),
                )
                .arg(
                    arg!(--"redirects-output" <PATH>)
                        .required(false)
                        .help("Where to write redirect rules (default: the platform's usual file name)")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .requires("redirects"),
                ),
        )
        .subcommand(
            command!("monitor")
                .about("Poll a fixed set of URLs on an interval and report unhealthy ones.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A URL to monitor (repeatable)")
                        .value_parser(clap::value_parser!(Url))
                        .action(clap::ArgAction::Append)
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to monitor")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-i --"interval" <SECONDS>)
                        .required(false)
                        .help("Seconds between polling rounds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("60"),
                )
                .arg(
                    arg!(-n --"rounds" <NUM>)
                        .required(false)
                        .help("Stop after this many rounds (default: run until interrupted)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM>)
                        .required(false)
                        .help("Maximum number of checks in flight")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["linkmend", "scan", "-u", "https://example.com/"])
            .unwrap();
        let (name, scan) = matches.subcommand().unwrap();
        assert_eq!(name, "scan");
        assert_eq!(scan.get_one::<usize>("max-pages"), Some(&100));
        assert_eq!(scan.get_one::<usize>("concurrency"), Some(&5));
        assert_eq!(scan.get_one::<u64>("timeout"), Some(&10));
        assert_eq!(scan.get_one::<f64>("min-confidence"), Some(&0.5));
        assert!(!scan.get_flag("no-follow-redirects"));
    }

    #[test]
    fn test_scan_repeated_excludes() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "linkmend",
                "scan",
                "-u",
                "https://example.com/",
                "-e",
                "/admin",
                "--exclude",
                "\\.pdf$",
            ])
            .unwrap();
        let scan = matches.subcommand_matches("scan").unwrap();
        let patterns: Vec<&String> = scan.get_many::<String>("exclude").unwrap().collect();
        assert_eq!(patterns, vec!["/admin", "\\.pdf$"]);
    }

    #[test]
    fn test_redirects_output_requires_platform() {
        let result = command_argument_builder().try_get_matches_from([
            "linkmend",
            "scan",
            "-u",
            "https://example.com/",
            "--redirects-output",
            "out.conf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_monitor_url_and_file_conflict() {
        let result = command_argument_builder().try_get_matches_from([
            "linkmend",
            "monitor",
            "-u",
            "https://example.com/",
            "-H",
            "hosts.txt",
        ]);
        assert!(result.is_err());
    }
}
