//! Testing utilities for code that drives a migration store

pub mod postgres;
