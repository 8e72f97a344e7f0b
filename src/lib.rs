pub mod calibration;
pub mod combined;
pub mod config;
pub mod fixture_stats;
pub mod guard;
pub mod integrity;
pub mod league_params;
pub mod metric;
pub mod odds;
pub mod probability;
pub mod profile;
pub mod rules;
pub mod selection;
pub mod synthetic;
