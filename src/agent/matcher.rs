//! Bet control matching
//!
//! Finds the on-page controls that correspond to a selection. Strategies run in a fixed
//! order and the first one that finds any control is the only one consulted, so a fuzzy
//! match never stands in for an exact hit priced below target.

use super::dom::Element;
use super::odds::element_odds;
use crate::types::{Selection, TotalSide};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

static SIGNED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]\d+(?:\.\d+)?").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ExactText,
    TeamHandicap,
    Similarity,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ExactText => "exact_text",
            Strategy::TeamHandicap => "team_handicap",
            Strategy::Similarity => "similarity",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub element: Element,
    pub odds: Decimal,
    pub strategy: Strategy,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accept(Candidate),
    /// Matches exist but none reaches the target; carries the best one
    Insufficient(Candidate),
    NotFound,
}

/// Lowercase, `,` -> `.`, unicode minus -> `-`, single spaces
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace(',', ".")
        .replace('−', "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn side_words(side: TotalSide) -> &'static [&'static str] {
    match side {
        TotalSide::Over => &["over", "más de", "plus de"],
        TotalSide::Under => &["under", "menos de", "moins de"],
    }
}

/// Whole-word (or whole-phrase) containment on normalized text
fn has_phrase(text: &str, phrase: &str) -> bool {
    format!(" {} ", text).contains(&format!(" {} ", phrase))
}

fn decimal(token: &str) -> Option<Decimal> {
    Decimal::from_str(&token.replace(',', ".")).ok()
}

/// Ways the site may print the selection
pub fn pick_variants(selection: &Selection) -> Vec<String> {
    match selection {
        Selection::Total { side, line } => side_words(*side)
            .iter()
            .map(|w| format!("{} {}", w, normalize(line)))
            .collect(),
        Selection::Spread { team, handicap } => vec![normalize(&format!("{} {}", team, handicap))],
        Selection::Moneyline { team } => vec![normalize(team)],
    }
}

/// Longest word of a team name, ignoring short fillers
pub fn significant_word(team: &str) -> Option<String> {
    // First longest word wins ties
    team.split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .fold(None::<&str>, |best, w| match best {
            Some(b) if b.chars().count() >= w.chars().count() => Some(b),
            _ => Some(w),
        })
        .map(|w| w.to_lowercase())
}

/// True when a control's own text names the other side, another line or another handicap
pub fn contradicts(selection: &Selection, text: &str) -> bool {
    match selection {
        Selection::Total { side, line } => {
            let other = match side {
                TotalSide::Over => TotalSide::Under,
                TotalSide::Under => TotalSide::Over,
            };
            if side_words(other).iter().any(|w| has_phrase(text, w)) {
                return true;
            }
            let line = normalize(line);
            let names_side = side_words(*side).iter().any(|w| has_phrase(text, w));
            names_side && !has_phrase(text, &line)
        }
        Selection::Spread { handicap, .. } => {
            let Some(wanted) = decimal(&normalize(handicap)) else {
                return false;
            };
            let mut signed = SIGNED_NUMBER.find_iter(text).filter_map(|m| decimal(m.as_str())).peekable();
            signed.peek().is_some() && signed.all(|h| h != wanted)
        }
        Selection::Moneyline { .. } => false,
    }
}

/// Share of significant pick words found in `text`
pub fn similarity(pick: &str, text: &str) -> f64 {
    let pick_words: Vec<&str> = pick.split_whitespace().collect();
    let text_words: Vec<&str> = text.split_whitespace().collect();
    let total = pick_words.len().max(text_words.len());
    if total == 0 {
        return 0.0;
    }

    let matches = pick_words
        .iter()
        .filter(|p| p.chars().count() > 2)
        .filter(|p| text_words.iter().any(|t| t.contains(**p) || p.contains(*t)))
        .count();

    matches as f64 / total as f64
}

pub struct BetMatcher {
    similarity_threshold: f64,
}

impl BetMatcher {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Candidates of the first strategy that finds any; controls without readable
    /// odds are skipped
    pub fn candidates(&self, selection: &Selection, controls: &[Element]) -> Vec<Candidate> {
        let line = match selection {
            Selection::Total { line, .. } => decimal(line),
            _ => None,
        };
        let usable: Vec<(&Element, Decimal, String, String)> = controls
            .iter()
            .filter(|c| c.usable)
            .filter_map(|c| {
                let odds = element_odds(c, line)?;
                Some((c, odds, normalize(&c.text), normalize(&c.context)))
            })
            .collect();

        let candidate = |el: &Element, odds: Decimal, strategy: Strategy, similarity: f64| Candidate {
            element: el.clone(),
            odds,
            strategy,
            similarity,
        };

        let variants = pick_variants(selection);
        let exact: Vec<Candidate> = usable
            .iter()
            .filter(|(_, _, text, _)| variants.iter().any(|v| has_phrase(text, v)))
            .map(|(el, odds, _, _)| candidate(*el, *odds, Strategy::ExactText, 1.0))
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        if let Selection::Spread { team, handicap } = selection {
            if let Some(word) = significant_word(team) {
                let handicap = normalize(handicap);
                let by_team: Vec<Candidate> = usable
                    .iter()
                    .filter(|(_, _, text, context)| {
                        let has_team = text.contains(&word) || context.contains(&word);
                        has_team && has_phrase(text, &handicap)
                    })
                    .map(|(el, odds, _, _)| candidate(*el, *odds, Strategy::TeamHandicap, 1.0))
                    .collect();
                if !by_team.is_empty() {
                    return by_team;
                }
            }
        }

        let pick = normalize(&selection.pick());
        let mut fuzzy: Vec<Candidate> = usable
            .iter()
            .filter(|(_, _, text, _)| !contradicts(selection, text))
            .map(|(el, odds, text, context)| {
                let own = similarity(&pick, text);
                let wide = similarity(&pick, &format!("{} {}", text, context));
                candidate(*el, *odds, Strategy::Similarity, own.max(wide))
            })
            .filter(|c| c.similarity > self.similarity_threshold)
            .collect();
        fuzzy.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        fuzzy
    }

    /// First candidate at or above target wins; otherwise report the best below it
    pub fn decide(candidates: Vec<Candidate>, target: Decimal) -> Decision {
        let mut best_under: Option<Candidate> = None;
        for candidate in candidates {
            if candidate.odds >= target {
                return Decision::Accept(candidate);
            }
            if best_under.as_ref().map_or(true, |b| candidate.odds > b.odds) {
                best_under = Some(candidate);
            }
        }
        match best_under {
            Some(c) => Decision::Insufficient(c),
            None => Decision::NotFound,
        }
    }
}
