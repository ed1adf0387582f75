//! Bulk-import seeding against an external book-metadata provider.
//!
//! A data-seeding convenience, not part of the lifecycle engine: volumes are
//! fetched per genre, mapped to authors and books, and inserted with random
//! starting stock. The provider sits behind [`MetadataProvider`] so tests
//! run against a canned stub instead of the network.

pub mod google_books;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use tracing::instrument;

use libris_catalog::NewBook;
use libris_core::{AuthorId, DomainResult};

pub use google_books::GoogleBooksClient;

/// One volume as reported by the metadata provider, before any validation.
/// Every field is optional or may be empty; mapping decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub isbn_13: Option<String>,
    pub isbn_10: Option<String>,
    /// Raw date string from the provider; usually `YYYY` or `YYYY-MM-DD`.
    pub published_date: Option<String>,
    pub categories: Vec<String>,
}

/// External source of book metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Up to `count` volumes matching a subject/genre query.
    async fn volumes_by_subject(
        &self,
        genre: &str,
        count: u32,
    ) -> DomainResult<Vec<VolumeMetadata>>;
}

/// Canned provider for tests and offline development.
#[derive(Debug, Default)]
pub struct StaticProvider {
    volumes: Vec<VolumeMetadata>,
}

impl StaticProvider {
    pub fn new(volumes: Vec<VolumeMetadata>) -> Self {
        Self { volumes }
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    async fn volumes_by_subject(
        &self,
        _genre: &str,
        count: u32,
    ) -> DomainResult<Vec<VolumeMetadata>> {
        Ok(self.volumes.iter().take(count as usize).cloned().collect())
    }
}

/// Storage operations the seeding import needs beyond the catalog contracts.
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Get or create the author with exactly this name.
    async fn upsert_author(&self, name: &str) -> DomainResult<AuthorId>;

    /// Insert the book unless one with the same isbn already exists.
    /// Returns whether a row was inserted.
    async fn insert_book_if_new(&self, book: NewBook) -> DomainResult<bool>;

    /// Delete books no loan has ever referenced, then authors left without
    /// books. Loan history is never touched.
    async fn purge_unreferenced(&self) -> DomainResult<PurgeReport>;
}

/// Outcome of one seeding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub requested: u32,
    pub imported: u32,
    pub skipped_duplicates: u32,
    pub skipped_invalid: u32,
}

/// Outcome of a purge of unreferenced catalog rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub books_deleted: u64,
    pub authors_deleted: u64,
}

/// A provider volume reduced to the fields the catalog needs, author still
/// by name. Produced by [`map_volume`]; `None` means the volume is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedVolume {
    pub author_name: String,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
}

/// Map one provider volume, or reject it.
///
/// Required: a title, at least one author, an ISBN-13 (falling back to
/// ISBN-10), and a parseable publication year. The first category wins as
/// the genre, falling back to the genre that was searched for.
pub fn map_volume(search_genre: &str, volume: &VolumeMetadata) -> Option<MappedVolume> {
    let title = volume.title.as_deref()?.trim();
    if title.is_empty() {
        return None;
    }
    let author_name = volume.authors.first().map(|a| a.trim())?;
    if author_name.is_empty() {
        return None;
    }
    let isbn = volume
        .isbn_13
        .as_deref()
        .or(volume.isbn_10.as_deref())?
        .trim();
    if isbn.is_empty() {
        return None;
    }
    let publication_year = parse_year(volume.published_date.as_deref()?)?;
    let genre = volume
        .categories
        .first()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .unwrap_or(search_genre);

    Some(MappedVolume {
        author_name: author_name.to_string(),
        title: title.to_string(),
        isbn: isbn.to_string(),
        publication_year,
        genre: genre.to_string(),
    })
}

fn parse_year(date: &str) -> Option<i32> {
    let head = date.trim();
    let head = head.split('-').next()?;
    if head.len() != 4 {
        return None;
    }
    head.parse().ok()
}

/// Orchestrates one seeding run: fetch, map, upsert authors, insert books.
pub struct SeedService {
    provider: std::sync::Arc<dyn MetadataProvider>,
    store: std::sync::Arc<dyn SeedStore>,
}

impl SeedService {
    pub fn new(
        provider: std::sync::Arc<dyn MetadataProvider>,
        store: std::sync::Arc<dyn SeedStore>,
    ) -> Self {
        Self { provider, store }
    }

    /// Import up to `count` books for a genre.
    ///
    /// Unusable volumes (missing fields, out-of-range years, overlong text)
    /// and isbn duplicates are skipped and counted, never fatal.
    #[instrument(skip(self), fields(genre, count))]
    pub async fn seed_genre(&self, genre: &str, count: u32) -> DomainResult<SeedReport> {
        let volumes = self.provider.volumes_by_subject(genre, count).await?;

        let mut report = SeedReport {
            requested: count,
            imported: 0,
            skipped_duplicates: 0,
            skipped_invalid: 0,
        };

        for volume in &volumes {
            let Some(mapped) = map_volume(genre, volume) else {
                report.skipped_invalid += 1;
                continue;
            };

            let author_id = self.store.upsert_author(&mapped.author_name).await?;
            let book = NewBook {
                title: mapped.title,
                isbn: mapped.isbn,
                publication_year: mapped.publication_year,
                genre: mapped.genre,
                stock: rand::rng().random_range(1..=20),
                author_id,
            };
            if book.validate().is_err() {
                report.skipped_invalid += 1;
                continue;
            }

            if self.store.insert_book_if_new(book).await? {
                report.imported += 1;
            } else {
                report.skipped_duplicates += 1;
            }
        }

        tracing::info!(
            genre,
            imported = report.imported,
            skipped_duplicates = report.skipped_duplicates,
            skipped_invalid = report.skipped_invalid,
            "seeding run finished"
        );
        Ok(report)
    }

    /// Remove seeded catalog rows nothing borrowed, keeping loan history.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> DomainResult<PurgeReport> {
        self.store.purge_unreferenced().await
    }
}
