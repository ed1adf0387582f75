//! Infrastructure layer: storage backends, the ledger service, and the
//! external book-metadata client.

pub mod error;
pub mod ledger_service;
pub mod memory;
pub mod postgres;
pub mod seeding;


pub use ledger_service::LedgerService;
pub use memory::InMemoryLibrary;
pub use postgres::PostgresLibrary;
pub use seeding::{
    GoogleBooksClient, MetadataProvider, PurgeReport, SeedReport, SeedService, SeedStore,
    StaticProvider, VolumeMetadata,
};
