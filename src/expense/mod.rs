//! Expense management for the shared ledger.
//!
//! This module contains everything related to expenses:
//! - The `Expense` model and `ExpenseBuilder` for creating expenses
//! - The `SplitPolicy` that decides how an expense is shared
//! - Database functions for storing, querying and deleting expenses, which
//!   refuse to change periods that have already been settled

mod core;

pub use core::{
    Expense, ExpenseBuilder, ExpenseId, ParseSplitPolicyError, SplitPolicy, create_expense,
    create_expense_table, delete_expense, get_expense, get_expenses_for_period,
};
