//! Permit Gap - income group comparison of Los Angeles building permits
//!
//! Joins permit records to census tract income categories and compares the
//! permit type mix of low and high income neighborhoods.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod stats;
