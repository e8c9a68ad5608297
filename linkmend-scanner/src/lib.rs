pub mod crawler;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod render;
pub mod result;
pub mod verifier;

pub use crawler::{CrawlReport, Crawler, Discovery, LinkGraph, ProgressCallback, ResultCallback};
pub use error::ScanError;
pub use executor::run_bounded;
pub use normalize::{is_same_origin, normalize, path_of};
pub use render::{HtmlRenderer, PageRenderer};
pub use result::{BrokenLink, LinkCheckResult, LinkClassification, LinkEdge};
pub use verifier::{MAX_REDIRECTS, TOO_MANY_REDIRECTS, Verifier};
