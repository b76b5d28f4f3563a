//! HTTP clients for Polymarket public APIs

pub mod gamma;
pub mod polymarket;

pub use gamma::GammaClient;
pub use polymarket::PolymarketDataClient;
