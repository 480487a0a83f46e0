//! Common test infrastructure
//!
//! End-to-end tests drive a real [`Pipeline`] against an in-memory asset host
//! and a temporary output directory. Tests should only import from this
//! module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeHost, TestEnv, MAYOIUTA_ID};
//!
//! #[tokio::test]
//! async fn test_fetch() {
//!     let host = FakeHost::with_catalog(common::MAYOIUTA_CATALOG);
//!     let env = TestEnv::new();
//!     let summary = env.pipeline(&host).run(&[MAYOIUTA_ID]).await.unwrap();
//! }
//! ```

mod constants;
mod fake_host;
mod fixtures;

pub use constants::*;
pub use fake_host::FakeHost;
pub use fixtures::{chart_body, chart_url, first_candidate, html_body, TestEnv};
