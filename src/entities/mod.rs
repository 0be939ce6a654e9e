//! sea-orm entities, grouped by area.

pub mod accounts;
pub mod catalog;
pub mod commerce;
