//! Bet parser
//!
//! Turns the free text of an arbitrage alert into a [`ParsedBet`]. The market type is
//! read from header keywords or emoji and picks the line scanner; odds and link are
//! extracted independently. Anything missing rejects the whole message.

use super::site_url_regex;
use crate::agent::odds::parse_odds_token;
use crate::error::Result;
use crate::types::{IncomingMessage, MarketType, ParsedBet, Selection, Sport, TotalSide};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty message")]
    Empty,

    #[error("incomplete bet, missing {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
}

/// Header markers per market type, checked in this order
const MARKET_MARKERS: &[(MarketType, &[&str])] = &[
    (MarketType::Totals, &["(TOTALS)", "TOTALS", "OVER/UNDER", "🔼", "🔽"]),
    (MarketType::Spreads, &["(SPREAD)", "SPREADS", "SPREAD", "HANDICAP", "±"]),
    (MarketType::Moneyline, &["(MONEYLINE)", "MONEYLINE", "1X2", "🏆"]),
];

/// Scanner order when the header names no market type
const FALLBACK_ORDER: [MarketType; 3] = [MarketType::Spreads, MarketType::Totals, MarketType::Moneyline];

/// Words that make an all-caps line a header rather than a team name
const NON_TEAM_WORDS: &[&str] = &[
    "FOOTBALL", "BASKETBALL", "TENNIS", "BASEBALL", "HOCKEY", "SOCCER", "TOTALS", "TOTAL",
    "SPREAD", "SPREADS", "MONEYLINE", "HANDICAP", "SUREBET", "ARBITRAGE", "ODDS", "OVER",
    "UNDER", "ENLACES", "LIVE", "PREMATCH",
];

const SPORT_MARKERS: &[(Sport, &[&str])] = &[
    (Sport::AmericanFootball, &["🏈", "AMERICAN FOOTBALL", "NFL"]),
    (Sport::Football, &["⚽", "FOOTBALL", "SOCCER", "FÚTBOL", "FUTBOL"]),
    (Sport::Basketball, &["🏀", "BASKETBALL", "BALONCESTO", "NBA"]),
    (Sport::Tennis, &["🎾", "TENNIS", "TENIS"]),
    (Sport::Baseball, &["⚾", "BASEBALL", "BÉISBOL", "MLB"]),
    (Sport::IceHockey, &["🏒", "HOCKEY", "NHL"]),
];

const LINK_SECTION_HEADER: &str = "enlaces de la apuesta";

pub struct BetParser {
    site_url: Regex,
    totals_line: Regex,
    spread_line: Regex,
    moneyline_line: Regex,
    decimal: Regex,
    odds_to_beat: Regex,
    odds_ratio: Regex,
}

impl BetParser {
    pub fn new(site_hosts: &[String]) -> Result<Self> {
        Ok(Self {
            site_url: site_url_regex(site_hosts)?,
            totals_line: Regex::new(r"(?i)^(OVER|UNDER)\s+(\d+(?:[.,]\d+)?)$")?,
            spread_line: Regex::new(r"^([A-Z][A-Z .'&-]*?)\s*([+-]\d+(?:[.,]\d+)?)$")?,
            moneyline_line: Regex::new(r"^[A-Z][A-Z .'&-]*$")?,
            decimal: Regex::new(r"\d+[.,]\d+")?,
            odds_to_beat: Regex::new(r"(?i)odds\s+to\s+beat\s*:?\s*(\d+(?:[.,]\d+)?(?:/\d+)?)")?,
            odds_ratio: Regex::new(r"(\d+[.,]\d+)\s*>>>\s*(\d+[.,]\d+)")?,
        })
    }

    /// Parse an alert into a bet staked at `stake`
    pub fn parse(&self, msg: &IncomingMessage, stake: Decimal) -> std::result::Result<ParsedBet, ParseError> {
        let text = msg.text.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let declared = detect_market_type(text);
        let selection = match declared {
            Some(market_type) => self.scan(market_type, text),
            None => {
                let found = FALLBACK_ORDER.iter().find_map(|t| self.scan(*t, text));
                if let Some(sel) = &found {
                    tracing::warn!(
                        "Message {}: no market header, guessed {} from '{}'",
                        msg.message_id,
                        sel.market_type(),
                        sel.pick()
                    );
                }
                found
            }
        };

        let target_odds = self.extract_odds(text);
        let link = self.extract_link(text);

        let mut missing = Vec::new();
        if selection.is_none() {
            missing.push("selection");
        }
        if target_odds.is_none() {
            missing.push("odds");
        }
        if link.is_none() {
            missing.push("link");
        }

        match (selection, target_odds, link) {
            (Some(selection), Some(target_odds), Some(link)) => Ok(ParsedBet {
                market_type: selection.market_type(),
                selection,
                target_odds,
                link,
                stake,
                sport: detect_sport(text),
                source_message_id: msg.message_id,
            }),
            _ => Err(ParseError::Incomplete { missing }),
        }
    }

    /// Run the line scanner for one market type over every line
    pub fn scan(&self, market_type: MarketType, text: &str) -> Option<Selection> {
        text.lines().map(str::trim).find_map(|line| match market_type {
            MarketType::Totals => self.scan_total(line),
            MarketType::Spreads => self.scan_spread(line),
            MarketType::Moneyline => self.scan_moneyline(line),
        })
    }

    fn scan_total(&self, line: &str) -> Option<Selection> {
        let caps = self.totals_line.captures(line)?;
        let side = if caps[1].eq_ignore_ascii_case("OVER") {
            TotalSide::Over
        } else {
            TotalSide::Under
        };
        Some(Selection::Total {
            side,
            line: caps[2].replace(',', "."),
        })
    }

    fn scan_spread(&self, line: &str) -> Option<Selection> {
        let caps = self.spread_line.captures(line)?;
        let team = caps[1].trim();
        if team.is_empty() || team.split_whitespace().any(is_header_word) {
            return None;
        }
        Some(Selection::Spread {
            team: team.to_string(),
            handicap: caps[2].replace(',', "."),
        })
    }

    fn scan_moneyline(&self, line: &str) -> Option<Selection> {
        if line.chars().count() <= 3
            || !self.moneyline_line.is_match(line)
            || self.decimal.is_match(line)
            || line.contains(">>>")
            || line.split_whitespace().any(is_header_word)
        {
            return None;
        }
        Some(Selection::Moneyline {
            team: line.to_string(),
        })
    }

    /// Explicit "Odds to beat" wins over the first `A >>> B` ratio
    pub fn extract_odds(&self, text: &str) -> Option<Decimal> {
        if let Some(caps) = self.odds_to_beat.captures(text) {
            if let Some(odds) = parse_odds_token(&caps[1]) {
                return Some(odds);
            }
        }
        self.odds_ratio
            .captures(text)
            .and_then(|caps| parse_odds_token(&caps[1]))
    }

    /// First site URL of the links section, else the first one anywhere
    pub fn extract_link(&self, text: &str) -> Option<String> {
        let mut lines = text.lines();
        let header = lines
            .by_ref()
            .find(|l| l.to_lowercase().contains(LINK_SECTION_HEADER));

        // The URL may share the header line
        let in_section = header.and_then(|header| {
            std::iter::once(header)
                .chain(lines.take_while(|l| !l.trim().is_empty()))
                .find_map(|l| self.first_site_url(l))
        });

        in_section.or_else(|| self.first_site_url(text))
    }

    fn first_site_url(&self, text: &str) -> Option<String> {
        self.site_url
            .find(text)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string())
    }
}

pub fn detect_market_type(text: &str) -> Option<MarketType> {
    MARKET_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| text.contains(m)))
        .map(|(market_type, _)| *market_type)
}

pub fn detect_sport(text: &str) -> Sport {
    let upper = text.to_uppercase();
    SPORT_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| upper.contains(m)))
        .map(|(sport, _)| *sport)
        .unwrap_or_default()
}

fn is_header_word(word: &str) -> bool {
    NON_TEAM_WORDS.contains(&word)
}
