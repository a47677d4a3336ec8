/// HTTP middleware utilities for donation-service
///
/// Authentication happens at the gateway; this service only reads the
/// identity the gateway forwards and checks roles per route.
pub mod identity;

pub use identity::*;
