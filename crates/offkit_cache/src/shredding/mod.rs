//! Content shredding.
//!
//! When an endpoint registers a [`JsonProcessor`], cached responses do not
//! keep their body. The shredder splits the JSON payload into rows written
//! to auxiliary stores, and the cache entry records a *body abstract*
//! listing which rows in which stores make up the body. On match, the
//! unshredder reassembles the body from the current rows, so local edits
//! to those rows are visible through the cache.

mod coordinator;
mod processor;
mod registry;
mod simple_json;

pub use coordinator::{
    attach_body_abstract, body_abstract_of, construct_request_response_cache_data,
    delete_shredded_data, fill_response_body_with_shredded_data, remove_shredded_rows,
    shred_response, ShredOutcome,
};
pub(crate) use coordinator::now_millis;
pub use processor::{
    BodyAbstractEntry, EndpointOptions, JsonProcessor, ResourceType, ShreddedData, Shredder,
    Unshredder,
};
pub use registry::{EndpointGuard, ShreddingRegistry};
pub use simple_json::{SimpleJsonShredder, SimpleJsonUnshredder};
