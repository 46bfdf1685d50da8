//! External collaborator traits and their in-memory test doubles.

pub mod auth;
pub mod catalog;
pub mod payment;
