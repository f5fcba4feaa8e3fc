//! Test suite for siteforce-offline
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
pub mod property;
