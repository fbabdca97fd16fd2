//! Configuration loading
//!
//! Layers `config.toml` (or the path given on the command line) under
//! `SUREBET__SECTION__KEY` environment variables. Every section has defaults, so a
//! minimal file only needs the `[telegram]` credentials. Values edited by the operator
//! at runtime live in the state store and override the file (see `session`).

use crate::error::{BotError, Result};
use crate::types::{BotSettings, Credentials, MarketType, Sport};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub bookmaker: BookmakerConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load from a TOML file layered with environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = shellexpand::tilde(path).into_owned();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("SUREBET")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bookmaker.site_hosts.is_empty() {
            return Err(BotError::InvalidConfig(
                "bookmaker.site_hosts must list at least one host".into(),
            ));
        }
        if self.queue.job_timeout_secs == 0 {
            return Err(BotError::InvalidConfig("queue.job_timeout_secs must be > 0".into()));
        }
        if self.queue.dedup_capacity == 0 {
            return Err(BotError::InvalidConfig("queue.dedup_capacity must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.polling.irrelevant_log_sample) {
            return Err(BotError::InvalidConfig(
                "polling.irrelevant_log_sample must be within [0, 1]".into(),
            ));
        }
        if self.driver.ready.max_attempts == 0 {
            return Err(BotError::InvalidConfig("driver.ready.max_attempts must be > 0".into()));
        }
        if self.agent.sections.is_empty() {
            return Err(BotError::InvalidConfig("agent.sections must not be empty".into()));
        }
        Ok(())
    }

    /// Settings used when the state store has none saved yet
    pub fn initial_settings(&self) -> BotSettings {
        BotSettings {
            bot_token: self.telegram.bot_token.clone(),
            chat_id: self.telegram.chat_id.clone(),
            credentials: Credentials {
                email: self.bookmaker.email.clone(),
                password: self.bookmaker.password.clone(),
            },
            default_stake: self.betting.default_stake,
            active: false,
            logged_in: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_api_base(),
            long_poll_timeout_secs: default_long_poll_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_long_poll_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Hosts whose links make an alert actionable and whose tabs the driver reuses
    #[serde(default = "default_site_hosts")]
    pub site_hosts: Vec<String>,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// URL fragments identifying a single-event page
    #[serde(default = "default_event_path_markers")]
    pub event_path_markers: Vec<String>,
    #[serde(default = "default_login_path_markers")]
    pub login_path_markers: Vec<String>,
    /// Body text fragments meaning the event is gone or closed
    #[serde(default = "default_unavailable_markers")]
    pub unavailable_markers: Vec<String>,
}

impl Default for BookmakerConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            site_hosts: default_site_hosts(),
            login_url: default_login_url(),
            event_path_markers: default_event_path_markers(),
            login_path_markers: default_login_path_markers(),
            unavailable_markers: default_unavailable_markers(),
        }
    }
}

impl BookmakerConfig {
    pub fn is_site_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.site_hosts.iter().any(|h| lower.contains(&h.to_lowercase()))
    }

    pub fn is_event_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.event_path_markers.iter().any(|m| lower.contains(&m.to_lowercase()))
    }

    pub fn is_login_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.login_path_markers.iter().any(|m| lower.contains(&m.to_lowercase()))
    }
}

fn default_site_hosts() -> Vec<String> {
    vec!["winamax.es".to_string(), "winamax.fr".to_string()]
}

fn default_login_url() -> String {
    "https://www.winamax.es/account/login.php".to_string()
}

fn default_event_path_markers() -> Vec<String> {
    vec![
        "/apuestas-deportivas/match/".to_string(),
        "/paris-sportifs/match/".to_string(),
    ]
}

fn default_login_path_markers() -> Vec<String> {
    vec!["/login".to_string()]
}

fn default_unavailable_markers() -> Vec<String> {
    vec![
        "evento no disponible".to_string(),
        "événement indisponible".to_string(),
        "event is no longer available".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingConfig {
    #[serde(default = "default_stake")]
    pub default_stake: Decimal,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            default_stake: default_stake(),
        }
    }
}

fn default_stake() -> Decimal {
    dec!(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    /// Jump the cursor to the newest update on start
    #[serde(default = "default_true")]
    pub skip_backlog_on_start: bool,
    /// Fraction of irrelevant messages that get a debug log line
    #[serde(default = "default_irrelevant_sample")]
    pub irrelevant_log_sample: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            skip_backlog_on_start: true,
            irrelevant_log_sample: default_irrelevant_sample(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_irrelevant_sample() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Hard ceiling for one bet execution
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
    #[serde(default = "default_inter_job_delay")]
    pub inter_job_delay_ms: u64,
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
    /// Fallback tick for the drain task when no poll wakes it
    #[serde(default = "default_drain_interval")]
    pub drain_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            job_timeout_secs: default_job_timeout(),
            inter_job_delay_ms: default_inter_job_delay(),
            dedup_capacity: default_dedup_capacity(),
            drain_interval_ms: default_drain_interval(),
        }
    }
}

impl QueueConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_millis(self.inter_job_delay_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

fn default_job_timeout() -> u64 {
    60
}

fn default_inter_job_delay() -> u64 {
    3_000
}

fn default_dedup_capacity() -> usize {
    500
}

fn default_drain_interval() -> u64 {
    2_000
}

/// Bounded retry with optional backoff and page reloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_ready_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_ready_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
    /// Reloads of the tab after a full round of failed attempts
    #[serde(default = "default_reloads")]
    pub reloads: u32,
    #[serde(default = "default_reload_wait")]
    pub reload_wait_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_ready_attempts(),
            interval_ms: default_ready_interval(),
            backoff_factor: default_backoff_factor(),
            max_interval_ms: default_max_interval(),
            reloads: default_reloads(),
            reload_wait_ms: default_reload_wait(),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given zero-based failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt as i32);
        let ms = (self.interval_ms as f64 * factor).min(self.max_interval_ms as f64);
        Duration::from_millis(ms as u64)
    }

    pub fn reload_wait(&self) -> Duration {
        Duration::from_millis(self.reload_wait_ms)
    }
}

fn default_ready_attempts() -> u32 {
    10
}

fn default_ready_interval() -> u64 {
    1_000
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_interval() -> u64 {
    5_000
}

fn default_reloads() -> u32 {
    1
}

fn default_reload_wait() -> u64 {
    3_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// DevTools HTTP endpoint of the controlled browser
    #[serde(default = "default_cdp_url")]
    pub cdp_url: String,
    #[serde(default = "default_page_load_wait")]
    pub page_load_wait_ms: u64,
    #[serde(default)]
    pub ready: RetryPolicy,
    /// How long to wait for the correlated betResult
    #[serde(default = "default_result_timeout")]
    pub result_timeout_secs: u64,
    /// Bound on a single request/response exchange with an agent
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cdp_url: default_cdp_url(),
            page_load_wait_ms: default_page_load_wait(),
            ready: RetryPolicy::default(),
            result_timeout_secs: default_result_timeout(),
            call_timeout_ms: default_call_timeout(),
        }
    }
}

impl DriverConfig {
    pub fn page_load_wait(&self) -> Duration {
        Duration::from_millis(self.page_load_wait_ms)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_secs(self.result_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn default_cdp_url() -> String {
    "http://127.0.0.1:9222".to_string()
}

fn default_page_load_wait() -> u64 {
    5_000
}

fn default_result_timeout() -> u64 {
    55
}

fn default_call_timeout() -> u64 {
    5_000
}

/// Locators for the bookmaker page. `tag:contains("Text")` matches by visible text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_submenu_selector")]
    pub submenu: String,
    #[serde(default = "default_expand_selector")]
    pub expand: String,
    #[serde(default = "default_layout_selector")]
    pub layout_toggle: String,
    #[serde(default = "default_bet_selector")]
    pub bet_controls: String,
    /// Ancestor whose text gives a bet control its context
    #[serde(default = "default_bet_context_selector")]
    pub bet_context: String,
    #[serde(default = "default_stake_selectors")]
    pub stake_input: Vec<String>,
    #[serde(default = "default_submit_selectors")]
    pub submit: Vec<String>,
    #[serde(default = "default_login_email_selectors")]
    pub login_email: Vec<String>,
    #[serde(default = "default_login_password_selectors")]
    pub login_password: Vec<String>,
    #[serde(default = "default_login_submit_selectors")]
    pub login_submit: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            submenu: default_submenu_selector(),
            expand: default_expand_selector(),
            layout_toggle: default_layout_selector(),
            bet_controls: default_bet_selector(),
            bet_context: default_bet_context_selector(),
            stake_input: default_stake_selectors(),
            submit: default_submit_selectors(),
            login_email: default_login_email_selectors(),
            login_password: default_login_password_selectors(),
            login_submit: default_login_submit_selectors(),
        }
    }
}

fn default_submenu_selector() -> String {
    ".filter-button, [class*=\"filter\"], [class*=\"tab\"], [class*=\"section\"]".to_string()
}

fn default_expand_selector() -> String {
    ".expand-button, [class*=\"expand\"]".to_string()
}

fn default_layout_selector() -> String {
    "[class*=\"tabs\"] button, [class*=\"view\"] button".to_string()
}

fn default_bet_selector() -> String {
    "button[class*=\"odd\"], button[class*=\"bet\"], [class*=\"market\"] button, [class*=\"selection\"] button"
        .to_string()
}

fn default_bet_context_selector() -> String {
    "[class*=\"market\"], [class*=\"bet-group\"], [class*=\"selection\"]".to_string()
}

fn default_stake_selectors() -> Vec<String> {
    vec![
        "input[inputmode=\"none\"]".to_string(),
        "[data-testid*=\"basket\"] input[type=\"text\"]".to_string(),
        "[class*=\"basket\"] input[type=\"text\"]".to_string(),
        "input[type=\"number\"]".to_string(),
    ]
}

fn default_submit_selectors() -> Vec<String> {
    vec![
        "button[data-testid=\"basket-submit-button\"]".to_string(),
        "button:contains(\"Apostar\")".to_string(),
        "button:contains(\"Parier\")".to_string(),
        "button[type=\"submit\"]".to_string(),
    ]
}

fn default_login_email_selectors() -> Vec<String> {
    vec![
        "input[type=\"email\"]".to_string(),
        "input[name=\"login\"]".to_string(),
        "input[name*=\"email\"]".to_string(),
    ]
}

fn default_login_password_selectors() -> Vec<String> {
    vec!["input[type=\"password\"]".to_string()]
}

fn default_login_submit_selectors() -> Vec<String> {
    vec![
        "button[type=\"submit\"]".to_string(),
        "button:contains(\"Conectar\")".to_string(),
        "button:contains(\"Connexion\")".to_string(),
    ]
}

/// Tunable weights for section and control scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Per keyword of a rule found in the pick
    pub keyword_hit: i32,
    /// Pick mentions over/under on a totals rule
    pub totals_keyword: i32,
    /// Totals pick with a `.5` line
    pub totals_half_line: i32,
    pub totals_first_half: i32,
    /// Pick carries a signed handicap on a spreads rule
    pub spread_signed: i32,
    pub spread_half_line: i32,
    pub spread_first_half: i32,
    /// Pick without numbers on a moneyline rule
    pub moneyline_plain: i32,
    /// Rule type equals the parsed market type
    pub declared_type: i32,
    /// Rule lists the bet's sport
    pub sport_match: i32,
    /// Submenu text equals a search term
    pub tab_exact: i32,
    /// Submenu text contains a search term
    pub tab_contains: i32,
    /// Significant word overlap between submenu text and a term
    pub tab_word: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword_hit: 3,
            totals_keyword: 15,
            totals_half_line: 10,
            totals_first_half: 8,
            spread_signed: 12,
            spread_half_line: 8,
            spread_first_half: 6,
            moneyline_plain: 10,
            declared_type: 30,
            sport_match: 10,
            tab_exact: 20,
            tab_contains: 15,
            tab_word: 5,
        }
    }
}

/// One market section of the bookmaker page and how to recognise it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRule {
    pub section: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Regexes tested against the pick; each hit adds `priority`
    #[serde(default)]
    pub patterns: Vec<String>,
    pub priority: i32,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub market_type: MarketType,
    /// Empty means any sport
    #[serde(default)]
    pub sports: Vec<Sport>,
}

fn rule(
    section: &str,
    keywords: &[&str],
    patterns: &[&str],
    priority: i32,
    aliases: &[&str],
    market_type: MarketType,
    sports: &[Sport],
) -> SectionRule {
    SectionRule {
        section: section.to_string(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        patterns: patterns.iter().map(|s| s.to_string()).collect(),
        priority,
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        market_type,
        sports: sports.to_vec(),
    }
}

pub fn default_sections() -> Vec<SectionRule> {
    vec![
        rule(
            "1ª mitad - Número total de goles",
            &["1ª mitad", "primera mitad", "half time", "ht", "over", "under", "total"],
            &[
                r"(?i)over.*\d+\.5.*first",
                r"(?i)under.*\d+\.5.*first",
                r"(?i)over.*\d+\.5.*1.*mitad",
                r"(?i)over.*\d+\.5.*half",
            ],
            25,
            &["1ª mitad - Total de goles", "Primera mitad - Total"],
            MarketType::Totals,
            &[],
        ),
        rule(
            "Número total de goles",
            &["over", "under", "total", "más", "menos", "número"],
            &[
                r"(?i)over\s+\d+\.5",
                r"(?i)under\s+\d+\.5",
                r"(?i)más de\s+\d+",
                r"(?i)menos de\s+\d+",
                r"(?i)total.*\d+",
            ],
            23,
            &["Total de goles", "Total de puntos"],
            MarketType::Totals,
            &[],
        ),
        rule(
            "Número total de puntos",
            &["over", "under", "total", "puntos", "points"],
            &[r"(?i)over\s+\d{2,3}(\.5)?", r"(?i)under\s+\d{2,3}(\.5)?"],
            23,
            &["Total de puntos", "Puntos totales"],
            MarketType::Totals,
            &[Sport::Basketball],
        ),
        rule(
            "1ª mitad - Hándicap asiático",
            &["1ª mitad", "primera mitad", "half", "ht", "hándicap", "handicap", "spread"],
            &[r"(?i)[+-]\d+\.5.*first", r"(?i)[+-]\d+\.5.*half", r"(?i)[+-]\d+\.5.*1.*mitad"],
            22,
            &["1ª mitad - Hándicap asiático (handicap)", "1ª mitad - Handicap asiático"],
            MarketType::Spreads,
            &[],
        ),
        rule(
            "Hándicap asiático",
            &["hándicap", "handicap", "asiático", "spread"],
            &[r"(?i)[+-]\d+\.5", r"(?i)[+-]\d+$", r"(?i)spread"],
            20,
            &["Hándicap asiático (handicap)", "Handicap asiático"],
            MarketType::Spreads,
            &[],
        ),
        rule(
            "Diferencia de goles",
            &["diferencia", "goles", "margen", "spread"],
            &[r"(?i)diferencia", r"(?i)margen", r"(?i)spread"],
            18,
            &["Margen de victoria", "Diferencia de goles"],
            MarketType::Spreads,
            &[],
        ),
        rule(
            "Resultado",
            &["resultado", "ganador", "winner", "moneyline", "1x2"],
            &[r"(?i)ganador", r"(?i)winner", r"(?i)resultado", r"(?i)moneyline", r"(?i)^(1|x|2)$"],
            15,
            &["Resultado final", "1X2", "Ganador del partido"],
            MarketType::Moneyline,
            &[],
        ),
        rule(
            "Hándicap texto",
            &["hándicap", "texto", "al menos"],
            &[r"(?i)al menos", r"(?i)gana por"],
            12,
            &["Hándicap texto"],
            MarketType::Spreads,
            &[],
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Pause after the event page is reached, before probing it
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause after clicking a submenu
    #[serde(default = "default_section_wait")]
    pub section_wait_ms: u64,
    /// Pause after expanding or switching layout
    #[serde(default = "default_expand_wait")]
    pub expand_wait_ms: u64,
    /// Pause after clicking a bet control or typing the stake
    #[serde(default = "default_click_wait")]
    pub click_wait_ms: u64,
    /// How long to poll for stake input and submit control
    #[serde(default = "default_element_timeout")]
    pub element_timeout_ms: u64,
    #[serde(default = "default_min_section_score")]
    pub min_section_score: i32,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_expand_markers")]
    pub expand_markers: Vec<String>,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_sections")]
    pub sections: Vec<SectionRule>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            section_wait_ms: default_section_wait(),
            expand_wait_ms: default_expand_wait(),
            click_wait_ms: default_click_wait(),
            element_timeout_ms: default_element_timeout(),
            min_section_score: default_min_section_score(),
            similarity_threshold: default_similarity_threshold(),
            expand_markers: default_expand_markers(),
            selectors: SelectorConfig::default(),
            weights: ScoringWeights::default(),
            sections: default_sections(),
        }
    }
}

impl AgentConfig {
    /// Same tuning with every wait set to zero
    pub fn without_waits(mut self) -> Self {
        self.settle_ms = 0;
        self.section_wait_ms = 0;
        self.expand_wait_ms = 0;
        self.click_wait_ms = 0;
        self
    }
}

fn default_settle_ms() -> u64 {
    3_000
}

fn default_section_wait() -> u64 {
    3_000
}

fn default_expand_wait() -> u64 {
    2_000
}

fn default_click_wait() -> u64 {
    2_000
}

fn default_element_timeout() -> u64 {
    5_000
}

fn default_min_section_score() -> i32 {
    5
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_expand_markers() -> Vec<String> {
    vec![
        "más".to_string(),
        "more".to_string(),
        "selecciones".to_string(),
        "options".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "data/surebet.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_bind")]
    pub bind: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_dashboard_bind(),
        }
    }
}

fn default_dashboard_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Entries kept in the rolling operator log
    #[serde(default = "default_buffer_len")]
    pub buffer_len: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            buffer_len: default_buffer_len(),
        }
    }
}

fn default_buffer_len() -> usize {
    200
}
