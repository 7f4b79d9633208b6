//! Storage backends for the checkout engine.
//!
//! Three traits cover the shared mutable state the saga touches:
//! [`StockLedger`] (per-product available quantity), [`VoucherStore`]
//! (usage counters), and [`OrderRepository`] (order headers and lines).
//! Every mutation of shared state is a single atomic conditional update
//! inside the backend; callers never read a snapshot and write back a
//! computed value.
//!
//! Two backends implement all three traits: [`InMemoryStore`] for tests
//! and local wiring, and [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{OrderRepository, ProductRecord, StockLedger, Store, VoucherStore};
