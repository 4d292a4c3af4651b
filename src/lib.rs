//! Events listing service: create, browse, filter, join, edit and delete
//! events over a JSON API.

pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;
