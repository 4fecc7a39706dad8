//! Core library for the mexsync command line application.
//!
//! mexsync keeps a merchant's menu on a food-delivery marketplace in sync
//! with operator-edited CSV files: it exports the current menu, applies
//! bulk create/update/reprice/delete operations row by row, and writes
//! failed rows back out for retry. The modules keep responsibilities
//! narrow and composable: the remote surface lives in [`catalog`], the
//! pure row translation in [`mapper`], the batch orchestration in
//! [`engine`], tabular I/O under [`io`], and the persisted identity in
//! [`session`].

pub mod catalog;
pub mod engine;
pub mod error;
pub mod io;
pub mod ledger;
pub mod mapper;
pub mod model;
pub mod session;

pub use error::{Result, SyncError};
