//! The append-only ledger of settlements.
//!
//! A settlement records money moving from one party to the other to pay off
//! the balance of a period. Once a period has a settlement it is closed and
//! its expenses can no longer be changed, until the settlement is removed.

mod core;
mod recorder;

pub use core::{
    NewSettlement, RecordMode, Settlement, SettlementId, create_settlement_table,
    get_settlements, is_period_settled, record_settlement, remove_latest_settlement,
    remove_settlement,
};
pub use recorder::{SQLiteSettlementRecorder, SettlementRecorder};
