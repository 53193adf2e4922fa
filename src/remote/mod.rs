//! Remote store client and wire row types.
//!
//! The remote store is external: this module only defines the narrow
//! per-table interface the sync engine consumes ([`RemoteStore`]), the
//! exact wire shapes ([`rows`]), and the HTTP implementation.

pub mod client;
pub mod rows;

#[cfg(test)]
pub mod mock;

pub use client::{HttpRemote, RemoteStore};
pub use rows::{
    ChecklistRow, ChecklistTagRow, MilestoneItemRow, MilestoneRow, MilestoneTagRow, TagRow,
};
