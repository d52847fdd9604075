//! Command implementations.
//!
//! Each command works on the partition files of one namespace and returns
//! its result as pretty-printed JSON.

pub mod get;
pub mod list;
pub mod purge;
pub mod set;

pub use get::{GetParams, get_impl};
pub use list::{ListParams, list_impl};
pub use purge::{PurgeParams, purge_impl};
pub use set::{SetParams, set_impl};
