//! The backend query model: what the data store is asked to fetch.

pub mod condition;
pub mod filter;
pub mod order;
pub mod select;
