pub mod error;
pub mod filter;
pub mod geo;
pub mod response;
