// Redirect configuration emission for common hosting platforms

use crate::error::{CoreError, Result};
use crate::fix::RedirectRule;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectFormat {
    Netlify,
    Vercel,
    Nginx,
    Apache,
}

impl RedirectFormat {
    /// Conventional file name for the generated configuration.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            RedirectFormat::Netlify => "_redirects",
            RedirectFormat::Vercel => "vercel.json",
            RedirectFormat::Nginx => "redirects.conf",
            RedirectFormat::Apache => ".htaccess",
        }
    }
}

impl FromStr for RedirectFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "netlify" => Ok(RedirectFormat::Netlify),
            "vercel" => Ok(RedirectFormat::Vercel),
            "nginx" => Ok(RedirectFormat::Nginx),
            "apache" | "htaccess" => Ok(RedirectFormat::Apache),
            other => Err(CoreError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Serialize)]
struct VercelConfig<'a> {
    redirects: Vec<VercelRedirect<'a>>,
}

#[derive(Serialize)]
struct VercelRedirect<'a> {
    source: &'a str,
    destination: &'a str,
    permanent: bool,
}

/// Render `rules` as configuration text. Paths are written as given.
pub fn render_redirects(rules: &[RedirectRule], format: RedirectFormat) -> Result<String> {
    let text: String = match format {
        RedirectFormat::Netlify => rules
            .iter()
            .map(|r| format!("{}  {}  {}\n", r.from_path, r.to_path, r.status_code))
            .collect(),
        RedirectFormat::Vercel => {
            let config = VercelConfig {
                redirects: rules
                    .iter()
                    .map(|r| VercelRedirect {
                        source: &r.from_path,
                        destination: &r.to_path,
                        permanent: r.status_code == 301,
                    })
                    .collect(),
            };
            let mut json = serde_json::to_string_pretty(&config)?;
            json.push('\n');
            json
        }
        RedirectFormat::Nginx => rules
            .iter()
            .map(|r| {
                format!(
                    "location = {} {{\n    return {} {};\n}}\n",
                    r.from_path, r.status_code, r.to_path
                )
            })
            .collect(),
        RedirectFormat::Apache => rules
            .iter()
            .map(|r| format!("Redirect {} {} {}\n", r.status_code, r.from_path, r.to_path))
            .collect(),
    };

    Ok(text)
}
