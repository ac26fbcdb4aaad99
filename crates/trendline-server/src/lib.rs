pub mod app;
pub mod error;
pub mod provider;
pub mod routes;
pub mod state;
