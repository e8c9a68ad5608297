pub mod crawl;
pub mod diagnose;
pub mod error;
pub mod fix;
pub mod monitor;
pub mod redirects;
pub mod report;
pub mod similarity;

pub use error::CoreError;
pub use fix::{FixMethod, FixSuggestion, RedirectRule, compute_fixes, fixes_to_redirects};
pub use similarity::{levenshtein, similarity};

use colored::Colorize;

const BANNER: &str = r#"
 _ _       _                              _
| (_)_ __ | | ___ __ ___   ___ _ __   __| |
| | | '_ \| |/ / '_ ` _ \ / _ \ '_ \ / _` |
| | | | | |   <| | | | | |  __/ | | | (_| |
|_|_|_| |_|_|\_\_| |_| |_|\___|_| |_|\__,_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "find broken links, propose fixes".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
