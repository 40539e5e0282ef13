//! Keeps a club's fixtures and standings in step with a competition website.
//!
//! Pages are rendered through a [`RenderBackend`], fixture links and the
//! classification table are read by the [`extract`] module, and fresh fixtures
//! are merged into the stored schedule by [`reconcile`] so that re-running a
//! synchronization never duplicates a fixture or clobbers a known value.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod maintenance;
pub mod model;
pub mod page;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod trigger;

pub use client::{HttpRenderer, HttpSession, PageOptions};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use extract::ExtractorOptions;
pub use model::*;
pub use page::{PageContent, PageContentProvider, PeriodTab, RenderBackend, StaticPages};
pub use reconcile::{reconcile, MatchDiff, ReconcilePlan};
pub use store::{MemoryStore, SqliteStore, Store};
pub use sync::{SyncOptions, Synchronizer};
pub use trigger::{Caller, TeamTriggerSummary, Trigger};
