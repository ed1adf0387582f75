//! Google Books volumes client.
//!
//! Pages through `GET {base}/volumes?q=subject:{genre}` in steps of 40 (the
//! API's page-size ceiling) and flattens the responses into
//! [`VolumeMetadata`]. Wire-shape quirks (everything optional, identifiers
//! as tagged pairs) stay inside this module.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use libris_core::{DomainError, DomainResult};

use super::{MetadataProvider, VolumeMetadata};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1/volumes";
const PAGE_SIZE: u32 = 40;

pub struct GoogleBooksClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different endpoint (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for GoogleBooksClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksClient {
    #[instrument(skip(self), fields(genre, count))]
    async fn volumes_by_subject(
        &self,
        genre: &str,
        count: u32,
    ) -> DomainResult<Vec<VolumeMetadata>> {
        let mut volumes = Vec::new();

        let mut start_index = 0;
        while start_index < count {
            let page = self
                .http
                .get(&self.base_url)
                .query(&[
                    ("q", format!("subject:{genre}").as_str()),
                    ("startIndex", start_index.to_string().as_str()),
                    ("maxResults", PAGE_SIZE.to_string().as_str()),
                    ("printType", "books"),
                    ("orderBy", "relevance"),
                ])
                .send()
                .await
                .map_err(|e| DomainError::store(format!("metadata provider request: {e}")))?
                .error_for_status()
                .map_err(|e| DomainError::store(format!("metadata provider status: {e}")))?
                .json::<VolumesPage>()
                .await
                .map_err(|e| DomainError::store(format!("metadata provider payload: {e}")))?;

            let items = page.items.unwrap_or_default();
            if items.is_empty() {
                break;
            }
            volumes.extend(items.into_iter().map(VolumeMetadata::from));
            start_index += PAGE_SIZE;
        }

        volumes.truncate(count as usize);
        Ok(volumes)
    }
}

#[derive(Debug, Deserialize)]
struct VolumesPage {
    items: Option<Vec<ApiVolume>>,
}

#[derive(Debug, Deserialize)]
struct ApiVolume {
    #[serde(rename = "volumeInfo")]
    volume_info: Option<ApiVolumeInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    industry_identifiers: Vec<ApiIdentifier>,
    published_date: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl From<ApiVolume> for VolumeMetadata {
    fn from(volume: ApiVolume) -> Self {
        let info = volume.volume_info.unwrap_or_default();
        let pick = |kind: &str| {
            info.industry_identifiers
                .iter()
                .find(|id| id.kind == kind)
                .map(|id| id.identifier.clone())
        };
        VolumeMetadata {
            isbn_13: pick("ISBN_13"),
            isbn_10: pick("ISBN_10"),
            title: info.title,
            authors: info.authors,
            published_date: info.published_date,
            categories: info.categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_payload_flattens_into_volume_metadata() {
        let raw = serde_json::json!({
            "kind": "books#volumes",
            "totalItems": 1,
            "items": [{
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "publishedDate": "1965-08-01",
                    "industryIdentifiers": [
                        { "type": "ISBN_10", "identifier": "0441172717" },
                        { "type": "ISBN_13", "identifier": "9780441172719" }
                    ],
                    "categories": ["Science Fiction"]
                }
            }]
        });

        let page: VolumesPage = serde_json::from_value(raw).unwrap();
        let volume: VolumeMetadata = page.items.unwrap().remove(0).into();

        assert_eq!(volume.title.as_deref(), Some("Dune"));
        assert_eq!(volume.isbn_13.as_deref(), Some("9780441172719"));
        assert_eq!(volume.isbn_10.as_deref(), Some("0441172717"));
        assert_eq!(volume.published_date.as_deref(), Some("1965-08-01"));
    }

    #[test]
    fn missing_fields_deserialize_to_empty() {
        let raw = serde_json::json!({ "items": [{ "volumeInfo": { "title": "Untitled" } }] });
        let page: VolumesPage = serde_json::from_value(raw).unwrap();
        let volume: VolumeMetadata = page.items.unwrap().remove(0).into();

        assert!(volume.authors.is_empty());
        assert!(volume.isbn_13.is_none());
        assert!(volume.categories.is_empty());
    }

    #[test]
    fn empty_page_is_not_an_error() {
        let raw = serde_json::json!({ "kind": "books#volumes", "totalItems": 0 });
        let page: VolumesPage = serde_json::from_value(raw).unwrap();
        assert!(page.items.is_none());
    }
}
