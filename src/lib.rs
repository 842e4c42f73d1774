//! # Ludics - A Dialogue-Game Interaction Engine
//!
//! Ludics represents structured argumentative exchanges as polarized move
//! sequences ("designs") over an addressable tree of discussion points
//! ("loci"). It checks well-formedness with four independent legality
//! predicates, interacts designs to a fixed point, extracts player-relative
//! views, validates strategies for innocence, and evaluates orthogonality
//! against counter-design sets.
//!
//! ## Core Concepts
//!
//! - **Locus**: an addressable position in the discussion tree
//! - **Act**: one polarized move at a locus; the daimon yields
//! - **Design**: one participant's alternating act sequence
//! - **Dispute**: the paired interaction of a positive and a negative design
//! - **Strategy**: the plays a design generates, checked for propagation
//! - **Behaviour**: designs orthogonal to a counter set (finite approximation)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ludics::{Design, LocusPath, LudicsEngine, EngineConfig, Player, Polarity};
//!
//! let engine = LudicsEngine::in_memory(EngineConfig::default());
//!
//! let claim = Design::builder(Player::P)
//!     .participant("alice")
//!     .act(Polarity::Pos, LocusPath::root(), [1].into(), None, "tariffs raise prices")
//!     .build()?;
//! let challenge = Design::builder(Player::O)
//!     .participant("bob")
//!     .act(Polarity::Neg, LocusPath::root().child(1), [].into(), None, "why?")
//!     .build()?;
//!
//! let pos = engine.register_design(claim)?;
//! let neg = engine.register_design(challenge)?;
//! let outcome = engine.step_dispute(pos, neg)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core model
pub mod act;
pub mod design;
pub mod error;
pub mod locus;
pub mod position;

// Checking and interaction
pub mod arena;
pub mod behaviour;
pub mod dispute;
pub mod legality;
pub mod strategy;
pub mod transform;
pub mod view;

// Compilation, storage, and the facade
pub mod compiler;
pub mod engine;
pub mod store;

// Re-export primary types at crate root for convenience
pub use act::{Act, Player, Polarity};
pub use arena::{Arena, ArenaIssue, ArenaReport, EnumerationConfig, PositionSet};
pub use behaviour::{BehaviourMembership, OrthogonalityFailure, OrthogonalityReport};
pub use compiler::{CanonicalMove, CompiledDesigns, MoveKind};
pub use design::{Design, DesignBuilder, DesignId};
pub use dispute::{
    ActionPair, Dispute, DisputeStatus, DivergenceReason, PendingChoice, Trace, TraceId, TraceStep,
};
pub use engine::{AdditiveResolution, DisputeOutcome, EngineConfig, LudicsEngine};
pub use error::{EngineError, LudicsResult, ValidationError};
pub use legality::{LegalityReport, LegalityViolation};
pub use locus::{LocusPath, Ramification};
pub use position::{Move, Position};
pub use store::{
    DerivedCache, DesignStore, InMemoryDesignStore, InMemoryStrategyStore, InMemoryTraceStore,
    StorageError, StrategyStore, TraceStore, VersionedDesign,
};
pub use strategy::{PropagationReport, PropagationViolation, Strategy, StrategyId};
pub use transform::{RoundTripReport, TransformOp, TransformOutcome};
pub use view::View;
