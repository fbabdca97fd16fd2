//! Arbitrage relevance filter
//!
//! A cheap disjunction of regexes and substrings decides whether a message looks like
//! an alert at all; an alert is only actionable when it also carries a site link.
//! False negatives are dropped quietly, false positives die later in the parser.

use super::site_url_regex;
use crate::config::BookmakerConfig;
use crate::error::Result;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Irrelevant,
    /// Looks like an alert but has no qualifying site link
    MissingLink,
    Actionable,
}

pub struct MessageClassifier {
    patterns: Vec<Regex>,
    keywords: Vec<String>,
    site_url: Regex,
}

impl MessageClassifier {
    pub fn new(site_hosts: &[String]) -> Result<Self> {
        let hosts = site_hosts
            .iter()
            .map(|h| regex::escape(h))
            .collect::<Vec<_>>()
            .join("|");

        let patterns = vec![
            Regex::new(r"(?i)(FOOTBALL|BASKETBALL|TENNIS|⚽|🏀|🎾).*SPREAD")?,
            Regex::new(r"\d+[.,]\d+\s*>>>\s*\d+[.,]\d+")?,
            Regex::new(r"\[\d+[.,]\d+%\]")?,
            Regex::new(&format!(r"(?i)(?:{})/\S+", hosts))?,
        ];

        let mut keywords = vec![
            "(surebet)".to_string(),
            "surebet".to_string(),
            "arbitrage".to_string(),
        ];
        for host in site_hosts {
            // "winamax.es" -> "winamax"
            let name = host.split('.').next().unwrap_or(host).to_lowercase();
            if !name.is_empty() && !keywords.contains(&name) {
                keywords.push(name);
            }
        }

        Ok(Self {
            patterns,
            keywords,
            site_url: site_url_regex(site_hosts)?,
        })
    }

    pub fn from_config(config: &BookmakerConfig) -> Result<Self> {
        Self::new(&config.site_hosts)
    }

    pub fn is_relevant(&self, text: &str) -> bool {
        if self.patterns.iter().any(|p| p.is_match(text)) {
            return true;
        }
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub fn has_site_link(&self, text: &str) -> bool {
        self.site_url.is_match(text)
    }

    pub fn classify(&self, text: &str) -> Classification {
        if !self.is_relevant(text) {
            Classification::Irrelevant
        } else if !self.has_site_link(text) {
            Classification::MissingLink
        } else {
            Classification::Actionable
        }
    }
}
