//! Markers Module
//!
//! Named, typed map markers shared by every viewer of the map.
//!
//! - `GET /markers` lists every marker
//! - `POST /markers` creates one; the store assigns the id
//! - `PATCH /markers/:id` moves a marker (only `lat` and `lng` change)
//! - `DELETE /markers/:id` removes it permanently
//!
//! Payloads are shape-checked in [`validate`] before the store is touched.

mod handler;
mod routes;
mod store;
pub mod validate;

pub use routes::routes;
pub use store::MarkerStore;
