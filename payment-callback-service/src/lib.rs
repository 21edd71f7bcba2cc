//! Payment Callback Service - gateway return and notification handling with
//! transactional order fulfilment.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
