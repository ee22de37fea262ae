// Service exports
pub mod catalog;
pub mod circuit_breaker;
pub mod postgres;
pub mod ranking_client;

pub use catalog::{
    CachedSpecProvider, CatalogError, ClothingCatalog, InMemoryCatalog, InMemorySpecs,
    SubcategorySpecProvider,
};
pub use circuit_breaker::{BreakerConfig, BreakerError, CircuitBreaker, CircuitState};
pub use postgres::PostgresCatalog;
pub use ranking_client::{
    HttpRankingTransport, RankingClient, RankingClientConfig, RankingError, RankingTransport,
    TransportError,
};
