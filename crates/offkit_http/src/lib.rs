//! # OffKit HTTP
//!
//! HTTP message model for OffKit.
//!
//! This crate provides:
//! - [`HttpRequest`] and [`HttpResponse`] values
//! - [`Headers`], a case-insensitive header multimap
//! - [`Body`], one of text, binary, form fields or empty
//! - The JSON layout used to persist messages inside store records
//!
//! Messages are plain values: cloning one yields an independent copy whose
//! body can be consumed without affecting the original.
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod body;
mod error;
mod headers;
mod message;
mod url;

pub use body::Body;
pub use error::{HttpError, HttpResult};
pub use headers::Headers;
pub use message::{is_read_only_method, HttpRequest, HttpResponse};
pub use url::{base_url, query_string};
