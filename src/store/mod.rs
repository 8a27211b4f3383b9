//! The reducer-driven local store.

mod action;
mod reducer;
mod snapshot;
#[allow(clippy::module_inception)]
mod store;

pub use action::Action;
pub use reducer::reduce;
pub use snapshot::AppSnapshot;
pub use store::Store;
