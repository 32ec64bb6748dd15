//! Booking Assist — cafe booking assistant orchestration.

pub mod assistant;
pub mod booking;
pub mod config;
pub mod error;
pub mod routes;
pub mod secrets;
pub mod service;
pub mod session;
pub mod tools;
