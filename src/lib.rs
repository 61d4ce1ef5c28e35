//! Astrophysics resource calculator
//!
//! Works out what is missing for a research upgrade, how surplus resources
//! can be traded into the missing ones, and what covering the rest costs in
//! time, packs and dark matter.

pub mod balance;
pub mod calculator;
pub mod capacity;
pub mod config;
pub mod conversion;
pub mod db;
pub mod fleet;
pub mod models;
pub mod planner;
pub mod research;
pub mod units;
