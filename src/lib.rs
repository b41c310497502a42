//! Mudae Assist — roll orchestration engine for the Mudae Discord bot.

pub mod config;
pub mod dashboard;
pub mod detector;
pub mod error;
pub mod kakera;
pub mod model;
pub mod plan;
pub mod session;
pub mod slash;
pub mod summary;
pub mod transport;
