use anyhow::Result;
use std::env;

use crate::constants::{
    DEFAULT_EXPLORER_API_URL, DEFAULT_MAX_EVENTS_PER_QUERY, DEFAULT_MAX_IN_FLIGHT_REQUESTS,
    DEFAULT_NOTIFIED_SET_CAP, DEFAULT_POLL_INTERVAL_SECONDS, DEFAULT_RATE_LIMIT_COUNT,
    DEFAULT_RATE_LIMIT_WINDOW_SECONDS, DEFAULT_REQUEST_TIMEOUT_SECONDS,
};
use crate::models::transfers::DirectionFilter;

#[derive(Debug, Clone)]
pub struct Config {
    pub explorer_api_url: String,
    pub explorer_api_key: String,
    pub telegram_bot_token: String,
    pub poll_interval_seconds: u64,
    pub max_events_per_query: u32,
    pub notified_set_cap: usize,
    pub rate_limit_count: u32,
    pub rate_limit_window_seconds: u64,
    pub direction_filter: DirectionFilter,
    pub max_in_flight_requests: usize,
    pub request_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            explorer_api_url: env::var("BSCSCAN_API_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string()),
            explorer_api_key: env::var("BSCSCAN_API_KEY")
                .map_err(|_| anyhow::anyhow!("BSCSCAN_API_KEY must be set"))?,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .map_err(|_| anyhow::anyhow!("TELEGRAM_BOT_TOKEN must be set"))?,
            poll_interval_seconds: env::var("POLL_INTERVAL_SECONDS")
                .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECONDS.to_string())
                .parse()
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
            max_events_per_query: env::var("MAX_EVENTS_PER_QUERY")
                .unwrap_or_else(|_| DEFAULT_MAX_EVENTS_PER_QUERY.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_EVENTS_PER_QUERY),
            notified_set_cap: env::var("NOTIFIED_SET_CAP")
                .unwrap_or_else(|_| DEFAULT_NOTIFIED_SET_CAP.to_string())
                .parse()
                .unwrap_or(DEFAULT_NOTIFIED_SET_CAP),
            rate_limit_count: env::var("RATE_LIMIT_COUNT")
                .unwrap_or_else(|_| DEFAULT_RATE_LIMIT_COUNT.to_string())
                .parse()
                .unwrap_or(DEFAULT_RATE_LIMIT_COUNT),
            rate_limit_window_seconds: env::var("RATE_LIMIT_WINDOW_SECONDS")
                .unwrap_or_else(|_| DEFAULT_RATE_LIMIT_WINDOW_SECONDS.to_string())
                .parse()
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
            direction_filter: env::var("DIRECTION_FILTER")
                .unwrap_or_else(|_| "both".to_string())
                .parse()?,
            max_in_flight_requests: env::var("MAX_IN_FLIGHT_REQUESTS")
                .unwrap_or_else(|_| DEFAULT_MAX_IN_FLIGHT_REQUESTS.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_IN_FLIGHT_REQUESTS)
                .max(1),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECONDS.to_string())
                .parse()
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        })
    }
}
