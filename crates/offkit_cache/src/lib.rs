//! # OffKit Cache
//!
//! A request/response cache with HTTP Cache-API semantics over a pluggable
//! persistence store.
//!
//! This crate provides:
//! - [`OfflineCache`] - put/match/matchAll/delete/keys/clear for one cache
//! - [`CacheManager`] - named caches sharing one [`CacheContext`]
//! - Vary-aware cache keys (`url$METHOD$field=value;...`)
//! - Content shredding: JSON bodies split into rows of auxiliary stores
//!   and reassembled on match
//!
//! ## Example
//!
//! ```rust
//! use offkit_cache::{CacheContext, CacheManager, MatchOptions, ShreddingRegistry};
//! use offkit_http::{HttpRequest, HttpResponse};
//! use offkit_store::StoreManager;
//! use std::sync::Arc;
//!
//! # async fn demo() -> offkit_cache::CacheResult<()> {
//! let context = CacheContext::new(
//!     Arc::new(StoreManager::in_memory()),
//!     Arc::new(ShreddingRegistry::new()),
//! );
//! let caches = CacheManager::new(Arc::new(context));
//! let cache = caches.open("api-v1").await?;
//!
//! let request = HttpRequest::get("https://api.example.com/items");
//! cache.put(&request, &HttpResponse::ok()).await?;
//! assert!(cache.has_match(&request, MatchOptions::new()).await?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bookkeeping;
mod cache;
mod config;
mod error;
mod key;
mod manager;
mod shredding;
mod vary;

pub use bookkeeping::ShreddedStoreBook;
pub use cache::{CacheContext, CachePutResult, MatchOptions, OfflineCache};
pub use config::{CacheConfig, DEFAULT_BOOKKEEPING_STORE};
pub use error::{CacheError, CacheResult, ShredError, ShredResult};
pub use key::{cache_key, matched_cache_keys, parse_cache_key, ParsedKey};
pub use manager::CacheManager;
pub use shredding::{
    attach_body_abstract, body_abstract_of, construct_request_response_cache_data,
    delete_shredded_data, fill_response_body_with_shredded_data, remove_shredded_rows,
    shred_response, BodyAbstractEntry, EndpointGuard, EndpointOptions, JsonProcessor,
    ResourceType, ShredOutcome, ShreddedData, Shredder, ShreddingRegistry, SimpleJsonShredder,
    SimpleJsonUnshredder, Unshredder,
};
pub use vary::{vary_fields, vary_matches};
