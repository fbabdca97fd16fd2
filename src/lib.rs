//! Surebet Alert Bot
//!
//! Follows a Telegram channel of sports-arbitrage alerts and places the matching bet on
//! the bookmaker site through a browser driven over the DevTools protocol.
//!
//! ## Architecture
//!
//! ```text
//! Poller (Telegram) → Classifier → Parser → Queue (single slot) → Driver (CDP tab) → Agent (DOM)
//!                                              ↑                                        │
//!                                              └──────── BetResult ◄── Notifier ◄───────┘
//! ```

pub mod agent;
pub mod config;
pub mod driver;
pub mod error;
pub mod ingester;
pub mod monitor;
pub mod notify;
pub mod queue;
pub mod session;
pub mod storage;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod config_tests;
