use super::*;
use crate::ingester::parser::{detect_market_type, detect_sport};
use crate::types::{MarketType, Selection, Sport, TotalSide};
use mockall::predicate::eq;
use rust_decimal_macros::dec;

const TOTALS_ALERT: &str = "⚽ FOOTBALL (TOTALS) [3.2%]
Real Madrid - Barcelona
OVER 2.5
1.85 >>> 2.05

Enlaces de la Apuesta:
https://www.winamax.es/apuestas-deportivas/match/123";

const SPREAD_ALERT: &str = "🏀 BASKETBALL SPREADS [2.1%]
Lakers - Celtics
LA LAKERS -4.5
1.90 >>> 2.02
https://www.winamax.es/apuestas-deportivas/match/77";

const MONEYLINE_ALERT: &str = "🎾 TENNIS MONEYLINE
CARLOS ALCARAZ
Odds to beat: 1.75
https://www.winamax.es/apuestas-deportivas/match/9";

fn hosts() -> Vec<String> {
    vec!["winamax.es".to_string(), "winamax.fr".to_string()]
}

fn parser() -> BetParser {
    BetParser::new(&hosts()).unwrap()
}

fn message(id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        update_id: id,
        message_id: id,
        chat_id: -100,
        text: text.to_string(),
    }
}

fn update(id: i64, text: Option<&str>) -> RawUpdate {
    RawUpdate {
        update_id: id,
        message: text.map(|t| message(id, t)),
    }
}

#[test]
fn test_parse_totals_alert() {
    let bet = parser().parse(&message(1, TOTALS_ALERT), dec!(30)).unwrap();

    assert_eq!(bet.market_type, MarketType::Totals);
    assert_eq!(
        bet.selection,
        Selection::Total {
            side: TotalSide::Over,
            line: "2.5".into()
        }
    );
    assert_eq!(bet.target_odds, dec!(1.85));
    assert_eq!(bet.link, "https://www.winamax.es/apuestas-deportivas/match/123");
    assert_eq!(bet.stake, dec!(30));
    assert_eq!(bet.sport, Sport::Football);
    assert_eq!(bet.source_message_id, 1);
}

#[test]
fn test_parse_spread_alert() {
    let bet = parser().parse(&message(2, SPREAD_ALERT), dec!(10)).unwrap();

    assert_eq!(bet.market_type, MarketType::Spreads);
    assert_eq!(
        bet.selection,
        Selection::Spread {
            team: "LA LAKERS".into(),
            handicap: "-4.5".into()
        }
    );
    assert_eq!(bet.target_odds, dec!(1.90));
    assert_eq!(bet.sport, Sport::Basketball);
}

#[test]
fn test_parse_moneyline_alert() {
    let bet = parser().parse(&message(3, MONEYLINE_ALERT), dec!(10)).unwrap();

    assert_eq!(bet.market_type, MarketType::Moneyline);
    assert_eq!(
        bet.selection,
        Selection::Moneyline {
            team: "CARLOS ALCARAZ".into()
        }
    );
    assert_eq!(bet.target_odds, dec!(1.75));
    assert_eq!(bet.sport, Sport::Tennis);
}

#[test]
fn test_odds_to_beat_wins_over_ratio() {
    let p = parser();
    assert_eq!(
        p.extract_odds("1.85 >>> 2.05\nOdds to beat: 2.10"),
        Some(dec!(2.10))
    );
    assert_eq!(p.extract_odds("odds to beat 5/2"), Some(dec!(3.5)));
    assert_eq!(p.extract_odds("1,85 >>> 2,05"), Some(dec!(1.85)));
    assert_eq!(p.extract_odds("no odds here"), None);
}

#[test]
fn test_link_prefers_links_section() {
    let text = "Event: https://www.winamax.es/apuestas-deportivas/match/1

Enlaces de la Apuesta:
https://www.winamax.es/apuestas-deportivas/match/2";
    assert_eq!(
        parser().extract_link(text).as_deref(),
        Some("https://www.winamax.es/apuestas-deportivas/match/2")
    );
}

#[test]
fn test_link_ignores_other_sites() {
    let p = parser();
    assert_eq!(p.extract_link("https://www.bet365.com/match/1"), None);
    assert_eq!(
        p.extract_link("see https://www.winamax.fr/paris-sportifs/match/4.").as_deref(),
        Some("https://www.winamax.fr/paris-sportifs/match/4")
    );
}

#[test]
fn test_missing_fields_reported_together() {
    let err = parser()
        .parse(&message(4, "⚽ FOOTBALL (TOTALS)\nOVER 2.5"), dec!(10))
        .unwrap_err();
    assert_eq!(
        err,
        ParseError::Incomplete {
            missing: vec!["odds", "link"]
        }
    );
    assert_eq!(err.to_string(), "incomplete bet, missing odds, link");

    assert_eq!(parser().parse(&message(5, "   "), dec!(10)), Err(ParseError::Empty));
}

#[test]
fn test_declared_market_does_not_fall_back() {
    // A totals header with only a team line must not be read as a moneyline
    let text = "⚽ FOOTBALL (TOTALS)\nREAL MADRID\n1.85 >>> 2.05\nhttps://www.winamax.es/match/1";
    let err = parser().parse(&message(6, text), dec!(10)).unwrap_err();
    assert_eq!(
        err,
        ParseError::Incomplete {
            missing: vec!["selection"]
        }
    );
}

#[test]
fn test_undeclared_market_uses_fallback_order() {
    let text = "Real Madrid - Barcelona\nUNDER 3.5\n1.70 >>> 1.95\nhttps://www.winamax.es/match/1";
    let bet = parser().parse(&message(7, text), dec!(10)).unwrap();
    assert_eq!(bet.market_type, MarketType::Totals);

    let text = "REAL MADRID +1.5\n1.70 >>> 1.95\nhttps://www.winamax.es/match/1";
    let bet = parser().parse(&message(8, text), dec!(10)).unwrap();
    assert_eq!(bet.market_type, MarketType::Spreads);
}

#[test]
fn test_header_lines_are_not_teams() {
    let p = parser();
    assert_eq!(p.scan(MarketType::Spreads, "FOOTBALL SPREAD -1.5"), None);
    assert_eq!(p.scan(MarketType::Moneyline, "SUREBET LIVE"), None);
    assert_eq!(p.scan(MarketType::Moneyline, "PSG"), None);
}

#[test]
fn test_detect_market_type_and_sport() {
    assert_eq!(detect_market_type("🔼 2.5"), Some(MarketType::Totals));
    assert_eq!(detect_market_type("HANDICAP"), Some(MarketType::Spreads));
    assert_eq!(detect_market_type("🏆 winner"), Some(MarketType::Moneyline));
    assert_eq!(detect_market_type("nothing"), None);

    assert_eq!(detect_sport("🏈 NFL"), Sport::AmericanFootball);
    assert_eq!(detect_sport("fútbol"), Sport::Football);
    assert_eq!(detect_sport("🏒"), Sport::IceHockey);
    assert_eq!(detect_sport("chess"), Sport::default());
}

#[test]
fn test_classifier() {
    let classifier = MessageClassifier::new(&hosts()).unwrap();

    assert_eq!(classifier.classify("Good morning everyone"), Classification::Irrelevant);
    assert_eq!(
        classifier.classify("⚽ FOOTBALL SPREAD\n1.90 >>> 2.05"),
        Classification::MissingLink
    );
    assert_eq!(
        classifier.classify("Surebet found: https://www.bet365.com/x"),
        Classification::MissingLink
    );
    assert_eq!(classifier.classify(TOTALS_ALERT), Classification::Actionable);
    assert!(classifier.is_relevant("[2.5%] value"));
    assert!(classifier.is_relevant("new line on Winamax"));
}

#[test]
fn test_site_url_regex_requires_hosts() {
    assert!(site_url_regex(&[]).is_err());
    let re = site_url_regex(&hosts()).unwrap();
    assert!(re.is_match("http://sports.winamax.es/x"));
    assert!(!re.is_match("https://notwinamax.com/x"));
}

#[tokio::test]
async fn test_poll_advances_past_unparseable_updates() {
    let mut source = MockMessageSource::new();
    source
        .expect_fetch()
        .with(eq(1))
        .times(1)
        .returning(|_| Ok(vec![update(1, Some("hello")), update(2, None), update(3, Some("alert"))]));
    let repo = StateRepository::in_memory();
    let poller = UpdatePoller::new(Arc::new(source), repo.clone()).await.unwrap();

    let messages = poller.poll_once().await.unwrap();

    let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", "alert"]);
    assert_eq!(poller.cursor(), 3);
    assert_eq!(repo.cursor().await.unwrap(), 3);
}

#[tokio::test]
async fn test_poll_drops_updates_at_or_below_cursor() {
    let repo = StateRepository::in_memory();
    repo.set_cursor(5).await.unwrap();
    let mut source = MockMessageSource::new();
    source
        .expect_fetch()
        .with(eq(6))
        .returning(|_| Ok(vec![update(5, Some("old")), update(6, Some("new"))]));
    let poller = UpdatePoller::new(Arc::new(source), repo).await.unwrap();

    let messages = poller.poll_once().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "new");
    assert_eq!(poller.cursor(), 6);
}

#[tokio::test]
async fn test_empty_poll_keeps_cursor() {
    let mut source = MockMessageSource::new();
    source.expect_fetch().returning(|_| Ok(Vec::new()));
    let poller = UpdatePoller::new(Arc::new(source), StateRepository::in_memory())
        .await
        .unwrap();

    assert!(poller.poll_once().await.unwrap().is_empty());
    assert_eq!(poller.cursor(), 0);
}

#[tokio::test]
async fn test_skip_backlog_never_moves_back() {
    let repo = StateRepository::in_memory();
    repo.set_cursor(50).await.unwrap();
    let mut source = MockMessageSource::new();
    source.expect_latest_update_id().times(1).returning(|| Ok(Some(40)));
    source.expect_latest_update_id().times(1).returning(|| Ok(Some(80)));
    let poller = UpdatePoller::new(Arc::new(source), repo.clone()).await.unwrap();

    poller.skip_backlog().await.unwrap();
    assert_eq!(poller.cursor(), 50);
    poller.skip_backlog().await.unwrap();
    assert_eq!(poller.cursor(), 80);
    assert_eq!(repo.cursor().await.unwrap(), 80);
}

#[tokio::test]
async fn test_tick_swallows_errors() {
    let mut source = MockMessageSource::new();
    source
        .expect_fetch()
        .times(1)
        .returning(|_| Err(BotError::Conflict));
    source
        .expect_fetch()
        .times(1)
        .returning(|_| Err(BotError::Telegram("Bad Gateway".into())));
    let poller = UpdatePoller::new(Arc::new(source), StateRepository::in_memory())
        .await
        .unwrap();

    assert!(poller.tick().await.is_empty());
    assert!(poller.tick().await.is_empty());
    assert_eq!(poller.cursor(), 0);
}
