//! PostgreSQL backend.
//!
//! Behind the `postgres` feature flag. Queries are plain SQL through `sqlx`
//! checked at runtime, so building does not need a live database. The schema
//! lives in `migrations/` and is applied by [`PostgresPersistenceClient::migrate`].

mod client;
mod rows;

pub use client::PostgresPersistenceClient;
