//! Request handlers

pub mod health;
pub mod items;
pub mod documents;
pub mod inventory;
