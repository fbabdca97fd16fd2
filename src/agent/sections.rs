//! Market section scoring
//!
//! Picks which market tab of the event page should hold the bet, first by scoring the
//! configured [`SectionRule`] table against the pick, then by scoring the visible
//! submenu controls against the winning rule.

use super::dom::Element;
use crate::config::{ScoringWeights, SectionRule};
use crate::error::Result;
use crate::types::{MarketType, ParsedBet};
use regex::Regex;

const TOTALS_WORDS: &[&str] = &["over", "under", "más", "menos"];
const FIRST_HALF_WORDS: &[&str] = &["first", "half", "mitad", "ht"];

/// Winning rule for a bet
#[derive(Debug, Clone, PartialEq)]
pub struct SectionProfile {
    pub section: String,
    pub aliases: Vec<String>,
    pub keywords: Vec<String>,
    pub market_type: MarketType,
    pub score: i32,
}

impl SectionProfile {
    fn search_terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.section.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .chain(self.keywords.iter().map(String::as_str))
    }
}

/// Words of `text` joined by single spaces, padded with one space on each side
fn spaced_words(text: &str) -> String {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}

/// Whole-word match, so "under" does not hit "SUNDERLAND"
fn has_phrase(spaced: &str, phrase: &str) -> bool {
    spaced.contains(&spaced_words(phrase))
}

struct CompiledRule {
    rule: SectionRule,
    patterns: Vec<Regex>,
}

pub struct SectionTable {
    rules: Vec<CompiledRule>,
    weights: ScoringWeights,
    half_line: Regex,
    signed: Regex,
    signed_half: Regex,
    any_number: Regex,
}

impl SectionTable {
    pub fn new(rules: &[SectionRule], weights: ScoringWeights) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|p| Regex::new(p))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            weights,
            half_line: Regex::new(r"\d+\.5")?,
            signed: Regex::new(r"[+-]\d+(?:\.\d+)?")?,
            signed_half: Regex::new(r"[+-]\d+\.5")?,
            any_number: Regex::new(r"\d")?,
        })
    }

    fn score_rule(&self, compiled: &CompiledRule, bet: &ParsedBet) -> i32 {
        let rule = &compiled.rule;
        let w = &self.weights;
        let pick = bet.pick();
        let lower = pick.to_lowercase();
        let words = spaced_words(&lower);
        let has_any = |list: &[&str]| list.iter().any(|word| has_phrase(&words, word));

        let mut score = 0;

        for keyword in &rule.keywords {
            if has_phrase(&words, &keyword.to_lowercase()) {
                score += w.keyword_hit;
            }
        }

        for pattern in &compiled.patterns {
            if pattern.is_match(&pick) {
                score += rule.priority;
            }
        }

        match rule.market_type {
            MarketType::Totals => {
                if has_any(TOTALS_WORDS) {
                    score += w.totals_keyword;
                    if self.half_line.is_match(&pick) {
                        score += w.totals_half_line;
                    }
                    if has_any(FIRST_HALF_WORDS) {
                        score += w.totals_first_half;
                    }
                }
            }
            MarketType::Spreads => {
                if self.signed.is_match(&pick) {
                    score += w.spread_signed;
                    if self.signed_half.is_match(&pick) {
                        score += w.spread_half_line;
                    }
                    if has_any(&FIRST_HALF_WORDS[..3]) {
                        score += w.spread_first_half;
                    }
                }
            }
            MarketType::Moneyline => {
                if !self.any_number.is_match(&pick) && !has_any(&["over", "under", "total"]) {
                    score += w.moneyline_plain;
                }
            }
        }

        if rule.market_type == bet.market_type {
            score += w.declared_type;
        }
        if rule.sports.contains(&bet.sport) {
            score += w.sport_match;
        }

        score
    }

    /// Best scoring rule; earlier rules win ties
    pub fn profile(&self, bet: &ParsedBet) -> Option<SectionProfile> {
        let mut best: Option<(&CompiledRule, i32)> = None;
        for compiled in &self.rules {
            let score = self.score_rule(compiled, bet);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((compiled, score));
            }
        }

        best.map(|(compiled, score)| {
            let rule = &compiled.rule;
            tracing::debug!(
                "Section for '{}': {} ({}, score {})",
                bet.pick(),
                rule.section,
                rule.market_type,
                score
            );
            SectionProfile {
                section: rule.section.clone(),
                aliases: rule.aliases.clone(),
                keywords: rule.keywords.clone(),
                market_type: rule.market_type,
                score,
            }
        })
    }

    /// How well a submenu label matches the profile
    pub fn score_tab(&self, profile: &SectionProfile, label: &str) -> i32 {
        let w = &self.weights;
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return 0;
        }
        let label_words: Vec<&str> = label.split_whitespace().collect();

        let mut score = 0;
        for term in profile.search_terms() {
            let term = term.to_lowercase();
            if label == term {
                score += w.tab_exact;
            } else if label.contains(&term) {
                score += w.tab_contains;
            } else {
                for term_word in term.split_whitespace().filter(|t| t.chars().count() > 3) {
                    for label_word in &label_words {
                        if label_word.contains(term_word) || term_word.contains(label_word) {
                            score += w.tab_word;
                        }
                    }
                }
            }
        }
        score
    }

    /// Highest scoring usable submenu at or above `min_score`
    pub fn best_tab<'a>(
        &self,
        profile: &SectionProfile,
        tabs: &'a [Element],
        min_score: i32,
    ) -> Option<(&'a Element, i32)> {
        let mut best: Option<(&Element, i32)> = None;
        for tab in tabs.iter().filter(|t| t.usable) {
            let score = self.score_tab(profile, &tab.text);
            if score > 0 {
                tracing::debug!("Submenu candidate '{}' scored {}", tab.text.trim(), score);
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((tab, score));
            }
        }
        best.filter(|(_, score)| *score >= min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sections;
    use crate::types::{Selection, Sport, TotalSide};
    use rust_decimal_macros::dec;

    fn table() -> SectionTable {
        SectionTable::new(&default_sections(), ScoringWeights::default()).unwrap()
    }

    fn bet(selection: Selection, sport: Sport) -> ParsedBet {
        ParsedBet {
            market_type: selection.market_type(),
            selection,
            target_odds: dec!(2.0),
            link: "https://www.winamax.es/apuestas-deportivas/match/1".to_string(),
            stake: dec!(30),
            sport,
            source_message_id: 1,
        }
    }

    fn tab(text: &str) -> Element {
        Element {
            id: text.to_string(),
            text: text.to_string(),
            usable: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_profile() {
        let b = bet(
            Selection::Total { side: TotalSide::Over, line: "2.5".into() },
            Sport::Football,
        );
        let profile = table().profile(&b).unwrap();
        assert_eq!(profile.section, "Número total de goles");
        assert_eq!(profile.market_type, MarketType::Totals);
    }

    #[test]
    fn test_basketball_points_profile() {
        let b = bet(
            Selection::Total { side: TotalSide::Under, line: "210.5".into() },
            Sport::Basketball,
        );
        assert_eq!(table().profile(&b).unwrap().section, "Número total de puntos");
    }

    #[test]
    fn test_spread_profile() {
        let b = bet(
            Selection::Spread { team: "RED SOX".into(), handicap: "-1.5".into() },
            Sport::Baseball,
        );
        let profile = table().profile(&b).unwrap();
        assert_eq!(profile.section, "Hándicap asiático");
        assert_eq!(profile.market_type, MarketType::Spreads);
    }

    #[test]
    fn test_moneyline_profile() {
        let b = bet(Selection::Moneyline { team: "LAKERS".into() }, Sport::Basketball);
        assert_eq!(table().profile(&b).unwrap().section, "Resultado");
    }

    #[test]
    fn test_team_names_do_not_trigger_totals_words() {
        let t = table();
        let totals = t
            .rules
            .iter()
            .find(|r| r.rule.section == "Número total de goles")
            .unwrap();

        let sunderland = bet(Selection::Moneyline { team: "SUNDERLAND".into() }, Sport::Football);
        let plain = bet(Selection::Moneyline { team: "LEEDS".into() }, Sport::Football);
        assert_eq!(t.score_rule(totals, &sunderland), t.score_rule(totals, &plain));

        let over = bet(
            Selection::Total { side: TotalSide::Over, line: "2.5".into() },
            Sport::Football,
        );
        assert!(t.score_rule(totals, &over) > t.score_rule(totals, &plain));
        assert!(has_phrase(&spaced_words("1ª mitad over 0.5"), "1ª mitad"));
        assert!(!has_phrase(&spaced_words("knights"), "ht"));
    }

    #[test]
    fn test_best_tab_prefers_exact_label() {
        let t = table();
        let b = bet(
            Selection::Total { side: TotalSide::Over, line: "2.5".into() },
            Sport::Football,
        );
        let profile = t.profile(&b).unwrap();
        let tabs = vec![tab("Resultado"), tab("Número total de goles"), tab("Córners")];
        let (best, score) = t.best_tab(&profile, &tabs, 5).unwrap();
        assert_eq!(best.text, "Número total de goles");
        assert!(score >= 20);
    }

    #[test]
    fn test_best_tab_below_threshold() {
        let t = table();
        let b = bet(Selection::Moneyline { team: "LAKERS".into() }, Sport::Basketball);
        let profile = t.profile(&b).unwrap();
        let tabs = vec![tab("Córners"), tab("Tarjetas")];
        assert!(t.best_tab(&profile, &tabs, 5).is_none());
    }

    #[test]
    fn test_unusable_tabs_ignored() {
        let t = table();
        let b = bet(Selection::Moneyline { team: "LAKERS".into() }, Sport::Basketball);
        let profile = t.profile(&b).unwrap();
        let mut hidden = tab("Resultado");
        hidden.usable = false;
        assert!(t.best_tab(&profile, &[hidden], 5).is_none());
    }
}
