//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use crate::types::{MarketType, Sport};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.betting.default_stake, dec!(30));
        assert_eq!(config.polling.interval_ms, 5_000);
        assert!(config.polling.skip_backlog_on_start);
        assert_eq!(config.queue.job_timeout_secs, 60);
        assert_eq!(config.queue.dedup_capacity, 500);
        assert_eq!(config.driver.cdp_url, "http://127.0.0.1:9222");
        assert_eq!(config.log.buffer_len, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_file() {
        let toml_str = r#"
[telegram]
bot_token = "123:abc"
chat_id = "-1001"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let settings = config.initial_settings();
        assert!(settings.has_telegram());
        assert_eq!(settings.default_stake, dec!(30));
        assert!(!settings.active);
    }

    #[test]
    fn test_bookmaker_url_classification() {
        let bookmaker = BookmakerConfig::default();
        let event = "https://www.winamax.es/apuestas-deportivas/match/555";

        assert!(bookmaker.is_site_url(event));
        assert!(bookmaker.is_site_url("https://WWW.WINAMAX.FR/"));
        assert!(!bookmaker.is_site_url("https://example.com/"));
        assert!(bookmaker.is_event_url(event));
        assert!(!bookmaker.is_event_url("https://www.winamax.es/apuestas-deportivas"));
        assert!(bookmaker.is_login_url(&bookmaker.login_url));
    }

    #[test]
    fn test_retry_policy_backoff_is_capped() {
        let policy: RetryPolicy = toml::from_str(
            r#"
interval_ms = 500
backoff_factor = 2.0
max_interval_ms = 1500
"#,
        )
        .unwrap();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(8), Duration::from_millis(1500));
    }

    #[test]
    fn test_backoff_factor_below_one_is_flat() {
        let policy = RetryPolicy {
            interval_ms: 200,
            backoff_factor: 0.5,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(3), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_weights_keep_defaults() {
        let toml_str = r#"
[weights]
declared_type = 50
"#;
        let agent: AgentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(agent.weights.declared_type, 50);
        assert_eq!(agent.weights.tab_exact, ScoringWeights::default().tab_exact);
        assert_eq!(agent.sections, default_sections());
    }

    #[test]
    fn test_custom_section_table() {
        let toml_str = r#"
[[sections]]
section = "Total points"
keywords = ["over", "under"]
priority = 20
market_type = "TOTALS"
sports = ["basketball"]
"#;
        let agent: AgentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(agent.sections.len(), 1);
        let rule = &agent.sections[0];
        assert_eq!(rule.market_type, MarketType::Totals);
        assert_eq!(rule.sports, vec![Sport::Basketball]);
        assert!(rule.patterns.is_empty());
        assert!(rule.aliases.is_empty());
    }

    #[test]
    fn test_default_sections_compile() {
        for rule in default_sections() {
            for pattern in &rule.patterns {
                assert!(regex::Regex::new(pattern).is_ok(), "{}", pattern);
            }
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.bookmaker.site_hosts.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.queue.job_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.polling.irrelevant_log_sample = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.sections.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_without_waits_keeps_timeouts() {
        let agent = AgentConfig::default().without_waits();
        assert_eq!(agent.settle_ms, 0);
        assert_eq!(agent.click_wait_ms, 0);
        assert_eq!(agent.element_timeout_ms, 5_000);
    }
}
