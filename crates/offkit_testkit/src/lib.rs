//! # OffKit Testkit
//!
//! Test utilities for OffKit.
//!
//! This crate provides:
//! - Fixtures wiring stores, caches and the replay engine together
//! - Property-based test generators using proptest
//! - A reference selector evaluator to check the compiled one against
//! - Cross-crate scenario helpers (offline writes with undo/redo data)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use offkit_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_stack() {
//!     let stack = TestStack::new();
//!     let cache = stack.cache("api").await;
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod reference;
pub mod scenarios;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::reference::*;
    pub use crate::scenarios::*;
}

pub use fixtures::*;
pub use generators::*;
pub use reference::*;
pub use scenarios::*;
