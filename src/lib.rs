//! Market basket recommendations over HTTP
//!
//! The recommendation engine lives in [`services::recommender`]; everything
//! else loads transaction data and exposes the engine through axum.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
