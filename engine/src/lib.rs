//! Casino lobby resolution engine.
//!
//! This crate turns a data-described lobby layout into concrete, ordered and
//! partitioned game/promotion lists ready for display.
//!
//! ## Pipeline
//! 1. [`LayoutAssembler`] loads a layout by slug, or the default layout for a
//!    platform (falling back to any layout for that platform).
//! 2. [`SectionResolver`] resolves every section concurrently, dispatching on
//!    the section variant. Personalized suggestions go through the
//!    [`fallback`] policy.
//! 3. Game grids are partitioned by [`display::partition`].
//! 4. Sections are reassembled in authored order into a
//!    [`ResolvedLayout`](casino_lobby_types::ResolvedLayout).
//!
//! ## Failure isolation
//! Every call to an external source is bounded by a per-call timeout. A failed
//! or timed-out call only blanks the section that made it; the rest of the
//! layout still resolves. Only a missing (or unloadable) layout fails the
//! whole pass.
//!
//! ## Determinism
//! Resolution reads no clock and uses no randomness. Catalog results are
//! re-sorted with an `id` tie-break, so an unchanged data snapshot always
//! resolves to an identical layout.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use casino_lobby_engine::{LayoutAssembler, LayoutRequest, MemoryStore, RenderContext, SectionResolver, Snapshot};
//! use casino_lobby_types::Platform;
//!
//! # async fn example(snapshot: Snapshot) -> casino_lobby_engine::Result<()> {
//! let store = Arc::new(MemoryStore::new(snapshot));
//! let assembler = LayoutAssembler::new(SectionResolver::new(store.sources()));
//! let context = RenderContext::for_user("user-1");
//! let layout = assembler
//!     .resolve_layout(&LayoutRequest::Platform(Platform::Web), &context)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod display;
mod error;
pub mod fallback;
pub mod layout;
pub mod memory;
pub mod resolver;
pub mod source;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use error::{Error, Result};
pub use layout::{LayoutAssembler, LayoutRequest};
pub use memory::{MemoryStore, Snapshot, SnapshotError};
pub use resolver::{with_timeout, RenderContext, SectionOutcome, SectionResolver, DEFAULT_CALL_TIMEOUT};
pub use source::{
    CatalogSource, LayoutSource, PromotionSource, RecommendationSource, ReviewSource, Sources,
};
