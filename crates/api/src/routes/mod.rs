//! Route Handlers

pub mod alerts;
pub mod diagnostics;
pub mod policies;
pub mod postures;
pub mod readings;
pub mod trends;
