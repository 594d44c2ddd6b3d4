//! Territorial and economic ledger for Houses and the Planets they hold.
//!
//! The [`registry::Registry`] is the entry point: it owns every House and
//! Planet and exposes the reputation, income, space ledger and treasury
//! operations over them.

pub mod domain;
pub mod error;
pub mod house;
pub mod income;
pub mod ledger;
pub mod logging;
pub mod planet;
pub mod registry;
pub mod reputation;
pub mod state;
pub mod storage;
pub mod treasury;
pub mod verify;

pub use error::{LedgerError, LedgerResult};
pub use registry::Registry;
