//! The balance engine.
//!
//! Both functions here are pure: they read the records they are given and
//! nothing else, so callers should recompute the balance from the latest
//! records of a period whenever those records change.

mod calculator;
mod recommender;

pub use calculator::{BalanceResult, calculate_balance};
pub use recommender::{Direction, RoundingPolicy, SettlementRecommendation, recommend_settlement};
