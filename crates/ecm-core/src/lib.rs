//! ECM Core - Bulk (Multiple) Case Synchronization Engine
//!
//! Keeps a multiple case consistent with the single cases it references:
//! - Retrieves and classifies candidate cases ([`BulkSearchService`])
//! - Forms a multiple and assigns its cases ([`BulkCreationService`])
//! - Reconciles membership and fans out bulk edits ([`BulkUpdateService`])
//!
//! The case platform, the message bus and the identity service are consumed
//! through the [`CaseStore`], [`UpdatePropagator`] and [`IdentityResolver`]
//! traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use ecm_core::prelude::*;
//!
//! # async fn example(store: Arc<dyn CaseStore>, bus: Arc<dyn UpdatePropagator>,
//! #                  idam: Arc<dyn IdentityResolver>) -> Result<(), EngineError> {
//! let engine = BulkEngine::new(EngineConfig::new(), store, bus, idam)?;
//!
//! let mut multiple = MultipleCase::new("1620000000000001", "246000", "Leeds_Multiple")
//!     .with_case_ids(["2400001/2024", "2400002/2024"]);
//! let auth = AuthToken::new("Bearer ...");
//!
//! let result = engine.create_multiple(&mut multiple, &auth, RetrievalStrategy::ByIds).await?;
//! if !result.is_finalizable() {
//!     println!("{:?}", result.errors);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod creation;
pub mod engine;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod memory;
pub mod pool;
pub mod propagator;
pub mod search;
pub mod store;
pub mod update;

// Re-exports for convenience
pub use config::EngineConfig;
pub use creation::BulkCreationService;
pub use engine::BulkEngine;
pub use error::{
    ConfigError, EngineError, IdentityError, PropagationError, SnapshotError, StoreError,
};
pub use identity::{CachedIdentityResolver, IdentityResolver};
pub use matcher::{CaseMatcher, Classification, Eligibility};
pub use memory::{InMemoryCaseStore, StoreSnapshot, StoredCase};
pub use pool::{MutationPool, PoolStats};
pub use propagator::{
    ChannelPropagator, ConsumerStats, PropagationMessage, QueueReceipt, UpdatePropagator,
};
pub use search::BulkSearchService;
pub use store::{CaseStore, EventToken, SearchCriteria};
pub use update::{BulkUpdateService, INVALID_MOVE_TARGET};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with ECM Core
    pub use crate::{
        BulkEngine, CaseStore, EngineConfig, EngineError, IdentityResolver, UpdatePropagator,
    };
    pub use ecm_model::{
        AuthToken, BulkResult, CreationStep, MultipleCase, RetrievalStrategy, SingleCase,
        UpdateWorkflow,
    };
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
