//! Feature modules, one vertical slice per concern.

pub mod context;
pub mod creator;
pub mod packer;
pub mod query;
pub mod scanner;
pub mod schema;
pub mod search;
