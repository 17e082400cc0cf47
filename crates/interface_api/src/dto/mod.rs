//! Request and response bodies

pub mod items;
pub mod documents;
pub mod inventory;
