//! Services module for payment-callback-service.

pub mod callback;
pub mod database;
pub mod fulfillment;
pub mod gateway;
pub mod in_memory;
pub mod metrics;
pub mod payload;
pub mod spec_stock;
pub mod store;

pub use callback::{CallbackOutcome, CallbackProcessor};
pub use database::Database;
pub use gateway::{GatewayVerifier, HmacGatewayVerifier};
pub use in_memory::{InMemoryStore, StoreSnapshot};
pub use metrics::{get_metrics, init_metrics, record_callback, record_error, record_fulfillment};
pub use payload::{CallbackPayload, PayloadError};
pub use store::FulfillmentStore;
