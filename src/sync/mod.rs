//! Synchronization between the local store and the remote document store.

mod adapter;
mod schema;
mod subscription;

pub use adapter::{FamilyUpdate, NewMember, SyncAdapter, UserUpdate};
pub use subscription::Subscription;

pub(crate) use schema::{parse, to_fields};

#[cfg(test)]
pub(crate) use adapter::test_utils;
