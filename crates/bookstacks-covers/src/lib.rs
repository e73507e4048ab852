//! Bookstacks covers: catalog clients for Open Library and Google Books,
//! the cover resolution chain and the cover cache fill.

pub mod cache;
pub mod error;
pub mod http;
pub mod resolver;
pub mod sources;
pub mod text;
pub mod types;

pub use cache::{CoverStore, get_or_fetch_cover, rebuild_all_covers};
pub use error::{FetchError, Result};
pub use resolver::CoverResolver;
pub use sources::google_books::GoogleBooksSource;
pub use sources::openlibrary::{OpenLibrarySource, openlibrary_link};
pub use sources::{IsbnCoverSource, TitleSearchSource};
pub use text::{normalize, similarity};
pub use types::CatalogResult;
