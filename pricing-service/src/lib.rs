//! Pricing Service - order and invoice totals for the event-services marketplace.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use error::PricingError;
