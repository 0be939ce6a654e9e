// Storefront
pub mod accounts;
pub mod catalog;
pub mod commerce;
pub mod orders;

// Staff
pub mod dashboard;

// External Services
pub mod payments;
