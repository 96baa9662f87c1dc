//! Meal ordering for a small office cafeteria: administrators publish a
//! menu for each day and announce it, employees pick one dish per day
//! before the cutoff, the kitchen reads the day's orders off one report.

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod endpoints;
pub mod errors;
pub mod http;
pub mod menus;
pub mod models;
pub mod notify;
pub mod orders;
pub mod routes;
pub mod session;
pub mod state;
pub mod threadpool;
