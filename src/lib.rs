pub mod assistant_context;
pub mod captain;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fake_league;
pub mod fixture_planner;
pub mod fpl_fetch;
pub mod gameweek;
pub mod http_cache;
pub mod http_client;
pub mod league_analysis;
pub mod league_fetch;
pub mod model;
pub mod predict;
pub mod price_change;
pub mod ranking;
pub mod rival_chips;
