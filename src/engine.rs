//! The engine facade: every exposed operation behind one struct.
//!
//! The facade owns the stores and the derived-artifact cache; all the
//! algorithms underneath are pure. Design references are re-resolved at the
//! start of every operation, and a trace write that loses a race is retried
//! exactly once against freshly resolved designs before surfacing
//! [`EngineError::RaceConflict`]. Logging happens here and nowhere deeper.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::act::Player;
use crate::arena::{Arena, EnumerationConfig, PositionSet};
use crate::behaviour::{self, BehaviourMembership, OrthogonalityReport};
use crate::design::{Design, DesignId};
use crate::dispute::{
    step_interaction, DisputeStatus, DivergenceReason, PendingChoice, Trace, TraceId, TraceStep,
};
use crate::error::{EngineError, LudicsResult, ValidationError};
use crate::legality::{check_position, check_position_in_arena, LegalityReport};
use crate::locus::LocusPath;
use crate::position::{Move, Position};
use crate::store::{
    DerivedCache, DesignStore, InMemoryDesignStore, InMemoryStrategyStore, InMemoryTraceStore,
    StorageError, StrategyStore, TraceStore, VersionedDesign,
};
use crate::strategy::{self, PropagationReport, Strategy, StrategyId};
use crate::transform::{self, TransformOp, TransformOutcome};
use crate::view::{extract_view, View};

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Step cap for every interaction.
    pub max_pairs: usize,
    /// Caps for position enumeration.
    pub enumeration: EnumerationConfig,
    /// TTL for derived artifacts, in seconds.
    pub cache_ttl_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pairs: 256,
            enumeration: EnumerationConfig::default(),
            cache_ttl_secs: 300,
        }
    }
}

/// Result of stepping a dispute through the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeOutcome {
    /// The persisted trace row.
    pub trace_id: TraceId,
    /// Terminal or non-terminal status.
    pub status: DisputeStatus,
    /// The consumption steps.
    pub steps: Vec<TraceStep>,
    /// Recorded additive picks.
    pub used_additive: BTreeMap<LocusPath, u32>,
    /// On convergence, the side that did not yield.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Player>,
    /// On STUCK, the pending branch point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingChoice>,
    /// On DIVERGENT, what broke the interaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<DivergenceReason>,
    /// True if the step cap ended the interaction.
    pub hit_cap: bool,
}

/// Result of resolving an additive pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditiveResolution {
    /// The trace row carrying the pick.
    pub trace_id: TraceId,
    /// All recorded picks after the resolution.
    pub used_additive: BTreeMap<LocusPath, u32>,
}

/// The ludics interaction engine.
pub struct LudicsEngine {
    designs: Arc<dyn DesignStore>,
    traces: Arc<dyn TraceStore>,
    strategies: Arc<dyn StrategyStore>,
    cache: DerivedCache,
    config: EngineConfig,
}

impl LudicsEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(
        designs: Arc<dyn DesignStore>,
        traces: Arc<dyn TraceStore>,
        strategies: Arc<dyn StrategyStore>,
        config: EngineConfig,
    ) -> Self {
        let cache = DerivedCache::new(config.cache_ttl_secs);
        Self {
            designs,
            traces,
            strategies,
            cache,
            config,
        }
    }

    /// Creates an engine over fresh in-memory stores.
    #[must_use]
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(
            Arc::new(InMemoryDesignStore::default()),
            Arc::new(InMemoryTraceStore::default()),
            Arc::new(InMemoryStrategyStore::default()),
            config,
        )
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers a design.
    ///
    /// # Errors
    ///
    /// Fails if the design ID is already taken.
    pub fn register_design(&self, design: Design) -> LudicsResult<DesignId> {
        let id = design.id;
        debug!(design = %id, acts = design.acts.len(), "registering design");
        self.designs.insert(design).map_err(map_storage)?;
        Ok(id)
    }

    /// Appends an act to a stored design, bumping its revision.
    ///
    /// # Errors
    ///
    /// Fails if the design is missing or the act breaks its invariants.
    pub fn append_act(&self, id: DesignId, act: crate::act::Act) -> LudicsResult<u64> {
        let mut versioned = self.resolve(id)?;
        versioned.design.push_act(act).map_err(EngineError::from)?;
        let revision = self.designs.update(versioned.design).map_err(map_storage)?;
        debug!(design = %id, revision, "appended act");
        Ok(revision)
    }

    /// Checks a move sequence against the four legality predicates, pinning
    /// loci to the arena if one is supplied.
    #[must_use]
    pub fn check_legality(&self, moves: &[Move], arena: Option<&Arena>) -> LegalityReport {
        let report = match arena {
            Some(arena) => check_position_in_arena(moves, arena),
            None => check_position(moves),
        };
        debug!(
            moves = moves.len(),
            legal = report.is_legal(),
            violations = report.violations.len(),
            "checked legality"
        );
        report
    }

    /// Steps the dispute for a design pair, reusing the stored trace when it
    /// is still current.
    ///
    /// # Errors
    ///
    /// Fails if either design is missing, the pair has the same polarity, or
    /// a write conflict persists after one retry.
    pub fn step_dispute(&self, pos: DesignId, neg: DesignId) -> LudicsResult<DisputeOutcome> {
        let trace = self.step_and_store(pos, neg, None)?;
        Ok(outcome_of(trace))
    }

    /// Resolves an additive branch point for a design pair.
    ///
    /// Replaying a recorded pick is a no-op returning the stored resolution;
    /// a conflicting pick for the same parent is a validation error.
    ///
    /// # Errors
    ///
    /// Fails on missing designs, a pick that is not an open branch, a
    /// conflicting pick, or an unrecovered write conflict.
    pub fn resolve_additive(
        &self,
        pos: DesignId,
        neg: DesignId,
        parent: &LocusPath,
        child: u32,
    ) -> LudicsResult<AdditiveResolution> {
        let current = self.step_and_store(pos, neg, None)?;
        if let Some(&recorded) = current.used_additive.get(parent) {
            if recorded == child {
                debug!(%parent, child, "additive pick replayed, no-op");
                return Ok(AdditiveResolution {
                    trace_id: current.id,
                    used_additive: current.used_additive,
                });
            }
            return Err(ValidationError::ConflictingAdditivePick {
                parent: parent.clone(),
                recorded,
                requested: child,
            }
            .into());
        }
        self.validate_pick(pos, neg, parent, child)?;
        let mut picks = current.used_additive.clone();
        picks.insert(parent.clone(), child);
        let trace = self.step_and_store(pos, neg, Some(picks))?;
        debug!(%parent, child, trace = %trace.id, "additive pick recorded");
        Ok(AdditiveResolution {
            trace_id: trace.id,
            used_additive: trace.used_additive,
        })
    }

    /// Extracts a player's view of a position, memoized in the derived
    /// cache.
    #[must_use]
    pub fn extract_view(&self, position: &Position, player: Player) -> View {
        let serialized = serde_json::to_string(&position.moves).unwrap_or_default();
        let key = DerivedCache::key(&["view", &player.to_string(), &serialized]);
        if let Some(view) = self.cache.get::<View>(&key) {
            debug!(player = %player, "view cache hit");
            return view;
        }
        let view = extract_view(position, player);
        self.cache.put(&key, &view);
        view
    }

    /// Builds and stores a strategy for a design against counter designs.
    ///
    /// # Errors
    ///
    /// Fails if the design or any counter is missing.
    pub fn build_strategy(
        &self,
        design: DesignId,
        counters: &[DesignId],
    ) -> LudicsResult<Strategy> {
        let design = self.resolve(design)?.design;
        let counter_designs = self.resolve_all(counters)?;
        let counter_refs: Vec<&Design> = counter_designs.iter().collect();
        let strategy = strategy::build_strategy(&design, &counter_refs, self.config.max_pairs);
        debug!(
            strategy = %strategy.id,
            plays = strategy.plays.len(),
            stable = strategy.is_stable(),
            "built strategy"
        );
        self.strategies.put(strategy.clone()).map_err(map_storage)?;
        Ok(strategy)
    }

    /// Re-runs the propagation checks for a stored strategy.
    ///
    /// # Errors
    ///
    /// Fails if the strategy is missing.
    pub fn check_propagation(&self, strategy: StrategyId) -> LudicsResult<PropagationReport> {
        let mut stored = self
            .strategies
            .get(strategy)
            .map_err(map_storage)?
            .ok_or(EngineError::NotFound {
                kind: "Strategy",
                id: strategy.to_string(),
            })?;
        let report = strategy::check_propagation(&stored);
        stored.propagation = Some(report.clone());
        self.strategies.put(stored).map_err(map_storage)?;
        Ok(report)
    }

    /// Tests a design's orthogonality against counter designs, memoizing the
    /// verdict by design revisions.
    ///
    /// # Errors
    ///
    /// Fails if the design or any counter is missing.
    pub fn check_orthogonal(
        &self,
        design: DesignId,
        counters: &[DesignId],
    ) -> LudicsResult<OrthogonalityReport> {
        let versioned = self.resolve(design)?;
        let counter_versions = self.resolve_all_versioned(counters)?;
        let mut parts: Vec<String> = vec![
            "orthogonal".to_string(),
            format!("{}@{}", versioned.design.id, versioned.revision),
            self.config.max_pairs.to_string(),
        ];
        parts.extend(
            counter_versions
                .iter()
                .map(|counter| format!("{}@{}", counter.design.id, counter.revision)),
        );
        let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        let key = DerivedCache::key(&part_refs);
        if let Some(report) = self.cache.get::<OrthogonalityReport>(&key) {
            debug!(design = %versioned.design.id, "orthogonality cache hit");
            return Ok(report);
        }
        let counter_refs: Vec<&Design> = counter_versions
            .iter()
            .map(|counter| &counter.design)
            .collect();
        let report = behaviour::check_orthogonal(
            &versioned.design,
            &counter_refs,
            self.config.max_pairs,
        );
        self.cache.put(&key, &report);
        Ok(report)
    }

    /// Tests membership of a design in the behaviour generated by a counter
    /// set. A finite approximation: relative to these counters only.
    ///
    /// # Errors
    ///
    /// Fails if the design or any counter is missing.
    pub fn behaviour_membership(
        &self,
        design: DesignId,
        counters: &[DesignId],
    ) -> LudicsResult<BehaviourMembership> {
        let report = self.check_orthogonal(design, counters)?;
        Ok(BehaviourMembership {
            is_member: report.orthogonal,
            failures: report.failures,
        })
    }

    /// Runs a correspondence operation, storing the produced strategy.
    ///
    /// # Errors
    ///
    /// Fails on missing designs or a round trip with nothing to read back.
    pub fn transform(
        &self,
        source: DesignId,
        counters: &[DesignId],
        op: TransformOp,
    ) -> LudicsResult<TransformOutcome> {
        let design = self.resolve(source)?.design;
        let counter_designs = self.resolve_all(counters)?;
        let counter_refs: Vec<&Design> = counter_designs.iter().collect();
        let outcome = transform::transform(&design, &counter_refs, op, self.config.max_pairs)
            .map_err(EngineError::from)?;
        self.strategies
            .put(outcome.strategy.clone())
            .map_err(map_storage)?;
        debug!(source = %source, ?op, "ran transform");
        Ok(outcome)
    }

    /// Enumerates legal positions of an arena under the configured caps.
    #[must_use]
    pub fn enumerate_positions(&self, arena: &Arena) -> PositionSet {
        let set = arena.enumerate_positions(&self.config.enumeration);
        debug!(
            positions = set.len(),
            truncated = set.truncated,
            "enumerated positions"
        );
        set
    }

    fn resolve(&self, id: DesignId) -> LudicsResult<VersionedDesign> {
        self.designs
            .get(id)
            .map_err(map_storage)?
            .ok_or_else(|| EngineError::design_not_found(id))
    }

    fn resolve_all(&self, ids: &[DesignId]) -> LudicsResult<Vec<Design>> {
        ids.iter()
            .map(|&id| self.resolve(id).map(|versioned| versioned.design))
            .collect()
    }

    fn resolve_all_versioned(&self, ids: &[DesignId]) -> LudicsResult<Vec<VersionedDesign>> {
        ids.iter().map(|&id| self.resolve(id)).collect()
    }

    /// Recomputes and persists the trace for a pair, reusing a current row
    /// when possible and retrying a lost write race exactly once.
    fn step_and_store(
        &self,
        pos: DesignId,
        neg: DesignId,
        override_picks: Option<BTreeMap<LocusPath, u32>>,
    ) -> LudicsResult<Trace> {
        match self.try_step_and_store(pos, neg, override_picks.clone()) {
            Ok(trace) => Ok(trace),
            Err(EngineError::RaceConflict { .. }) => {
                warn!(pos = %pos, neg = %neg, "trace write lost a race, retrying once");
                self.try_step_and_store(pos, neg, override_picks)
            }
            Err(err) => Err(err),
        }
    }

    fn try_step_and_store(
        &self,
        pos: DesignId,
        neg: DesignId,
        override_picks: Option<BTreeMap<LocusPath, u32>>,
    ) -> LudicsResult<Trace> {
        // Re-resolve at call time: the designs may have been extended or
        // recompiled since the caller last saw them.
        let pos_versioned = self.resolve(pos)?;
        let neg_versioned = self.resolve(neg)?;
        if pos_versioned.design.owner == neg_versioned.design.owner {
            return Err(ValidationError::SamePolarityPair { pos, neg }.into());
        }
        let existing = self.traces.get(pos, neg).map_err(map_storage)?;
        if override_picks.is_none() {
            if let Some(trace) = &existing {
                if trace.pos_revision == pos_versioned.revision
                    && trace.neg_revision == neg_versioned.revision
                {
                    debug!(trace = %trace.id, "trace is current, reusing");
                    return Ok(trace.clone());
                }
                debug!(trace = %trace.id, "trace is stale, rebuilding");
            }
        }
        let picks = override_picks
            .or_else(|| existing.as_ref().map(|trace| trace.used_additive.clone()))
            .unwrap_or_default();
        let dispute = step_interaction(
            &pos_versioned.design,
            &neg_versioned.design,
            &picks,
            self.config.max_pairs,
        );
        debug!(
            status = %dispute.status,
            steps = dispute.length(),
            hit_cap = dispute.hit_cap,
            "stepped dispute"
        );
        let trace = Trace::new(
            pos,
            neg,
            dispute,
            picks,
            pos_versioned.revision,
            neg_versioned.revision,
        );
        let expected = existing.map(|trace| trace.id);
        match self.traces.put_if(trace.clone(), expected) {
            Ok(()) => Ok(trace),
            Err(StorageError::TraceSuperseded) => Err(EngineError::RaceConflict {
                context: format!("trace for ({pos}, {neg})"),
            }),
            Err(err) => Err(map_storage(err)),
        }
    }

    /// Checks that a pick names an open branch of a branching act at
    /// `parent` in either design.
    fn validate_pick(
        &self,
        pos: DesignId,
        neg: DesignId,
        parent: &LocusPath,
        child: u32,
    ) -> LudicsResult<()> {
        let pos_design = self.resolve(pos)?.design;
        let neg_design = self.resolve(neg)?.design;
        let branching = pos_design
            .acts
            .iter()
            .chain(neg_design.acts.iter())
            .find(|act| act.is_branching() && act.locus == *parent);
        let Some(act) = branching else {
            return Err(ValidationError::NoPendingAdditiveChoice { pos, neg }.into());
        };
        if !act.ramification.contains(&child) {
            return Err(ValidationError::AdditivePickNotABranch {
                parent: parent.clone(),
                suffix: child,
            }
            .into());
        }
        Ok(())
    }
}

fn outcome_of(trace: Trace) -> DisputeOutcome {
    DisputeOutcome {
        trace_id: trace.id,
        status: trace.dispute.status,
        winner: trace.dispute.winner,
        pending: trace.dispute.pending,
        divergence: trace.dispute.divergence,
        hit_cap: trace.dispute.hit_cap,
        steps: trace.dispute.steps,
        used_additive: trace.used_additive,
    }
}

fn map_storage(err: StorageError) -> EngineError {
    match err {
        StorageError::DesignMissing(id) => EngineError::NotFound {
            kind: "Design",
            id: id.to_string(),
        },
        StorageError::StrategyMissing(id) => EngineError::NotFound {
            kind: "Strategy",
            id: id.to_string(),
        },
        StorageError::TraceSuperseded => EngineError::RaceConflict {
            context: "trace row".to_string(),
        },
        other => EngineError::internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::act::Polarity;
    use crate::locus::Ramification;

    fn ram(suffixes: &[u32]) -> Ramification {
        suffixes.iter().copied().collect()
    }

    fn engine() -> LudicsEngine {
        LudicsEngine::in_memory(EngineConfig::default())
    }

    fn register_pair(engine: &LudicsEngine) -> (DesignId, DesignId) {
        let pos = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .build()
            .unwrap();
        let neg = Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[1]),
                None,
                "why",
            )
            .build()
            .unwrap();
        let pos_id = engine.register_design(pos).unwrap();
        let neg_id = engine.register_design(neg).unwrap();
        (pos_id, neg_id)
    }

    #[test]
    fn test_step_dispute_persists_and_reuses_trace() {
        let engine = engine();
        let (pos, neg) = register_pair(&engine);
        let first = engine.step_dispute(pos, neg).unwrap();
        assert_eq!(first.status, DisputeStatus::Ongoing);
        assert_eq!(first.steps.len(), 2);
        let second = engine.step_dispute(pos, neg).unwrap();
        assert_eq!(second.trace_id, first.trace_id);
    }

    #[test]
    fn test_appending_daimon_rebuilds_stale_trace() {
        let engine = engine();
        let (pos, neg) = register_pair(&engine);
        let before = engine.step_dispute(pos, neg).unwrap();
        let mut design = engine.resolve(pos).unwrap().design;
        design.close_with_daimon();
        engine.designs.update(design).unwrap();
        let after = engine.step_dispute(pos, neg).unwrap();
        assert_ne!(after.trace_id, before.trace_id);
        assert_eq!(after.status, DisputeStatus::Convergent);
        assert_eq!(after.winner, Some(Player::O));
    }

    #[test]
    fn test_missing_design_is_not_found() {
        let engine = engine();
        let err = engine
            .step_dispute(DesignId::new(), DesignId::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_same_polarity_pair_rejected() {
        let engine = engine();
        let (pos, _) = register_pair(&engine);
        let other = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .build()
            .unwrap();
        let other_id = engine.register_design(other).unwrap();
        let err = engine.step_dispute(pos, other_id).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_resolve_additive_is_idempotent() {
        let engine = engine();
        let pos = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1, 2]), None, "claim")
            .build()
            .unwrap();
        let neg = Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap();
        let pos_id = engine.register_design(pos).unwrap();
        let neg_id = engine.register_design(neg).unwrap();

        let stuck = engine.step_dispute(pos_id, neg_id).unwrap();
        assert_eq!(stuck.status, DisputeStatus::Stuck);

        let root = LocusPath::root();
        let first = engine.resolve_additive(pos_id, neg_id, &root, 1).unwrap();
        assert_eq!(first.used_additive.get(&root), Some(&1));
        let replay = engine.resolve_additive(pos_id, neg_id, &root, 1).unwrap();
        assert_eq!(replay.trace_id, first.trace_id);
        assert_eq!(replay.used_additive, first.used_additive);

        let resumed = engine.step_dispute(pos_id, neg_id).unwrap();
        assert_eq!(resumed.status, DisputeStatus::Ongoing);
        assert_eq!(resumed.steps.len(), 2);
    }

    #[test]
    fn test_conflicting_additive_pick_rejected() {
        let engine = engine();
        let pos = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1, 2]), None, "claim")
            .build()
            .unwrap();
        let neg = Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap();
        let pos_id = engine.register_design(pos).unwrap();
        let neg_id = engine.register_design(neg).unwrap();
        let root = LocusPath::root();
        engine.resolve_additive(pos_id, neg_id, &root, 1).unwrap();
        let err = engine
            .resolve_additive(pos_id, neg_id, &root, 2)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_pick_must_name_an_open_branch() {
        let engine = engine();
        let pos = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1, 2]), None, "claim")
            .build()
            .unwrap();
        let neg = Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap();
        let pos_id = engine.register_design(pos).unwrap();
        let neg_id = engine.register_design(neg).unwrap();
        let err = engine
            .resolve_additive(pos_id, neg_id, &LocusPath::root(), 7)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_vanished_trace_row_is_recovered() {
        let engine = engine();
        let (pos, neg) = register_pair(&engine);
        engine.step_dispute(pos, neg).unwrap();
        // A concurrent recompile wiped the row; the next step must rebuild.
        engine.traces.remove(pos, neg).unwrap();
        let mut design = engine.resolve(pos).unwrap().design;
        design.close_with_daimon();
        engine.designs.update(design).unwrap();
        let outcome = engine.step_dispute(pos, neg).unwrap();
        assert_eq!(outcome.status, DisputeStatus::Convergent);
    }

    /// Trace store that loses the first `failures` conditional writes, as a
    /// concurrent writer would make it do.
    struct ContendedTraceStore {
        inner: InMemoryTraceStore,
        failures: std::sync::atomic::AtomicUsize,
    }

    impl ContendedTraceStore {
        fn losing(failures: usize) -> Self {
            Self {
                inner: InMemoryTraceStore::default(),
                failures: std::sync::atomic::AtomicUsize::new(failures),
            }
        }
    }

    impl TraceStore for ContendedTraceStore {
        fn get(&self, pos: DesignId, neg: DesignId) -> Result<Option<Trace>, StorageError> {
            self.inner.get(pos, neg)
        }

        fn put_if(&self, trace: Trace, expected: Option<TraceId>) -> Result<(), StorageError> {
            use std::sync::atomic::Ordering;
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::TraceSuperseded);
            }
            self.inner.put_if(trace, expected)
        }

        fn remove(&self, pos: DesignId, neg: DesignId) -> Result<(), StorageError> {
            self.inner.remove(pos, neg)
        }
    }

    fn engine_with_contention(failures: usize) -> LudicsEngine {
        LudicsEngine::new(
            Arc::new(InMemoryDesignStore::default()),
            Arc::new(ContendedTraceStore::losing(failures)),
            Arc::new(InMemoryStrategyStore::default()),
            EngineConfig::default(),
        )
    }

    #[test]
    fn test_single_lost_race_is_retried_once_and_succeeds() {
        let engine = engine_with_contention(1);
        let (pos, neg) = register_pair(&engine);
        let outcome = engine.step_dispute(pos, neg).unwrap();
        assert_eq!(outcome.status, DisputeStatus::Ongoing);
    }

    #[test]
    fn test_persistent_race_surfaces_after_one_retry() {
        let engine = engine_with_contention(2);
        let (pos, neg) = register_pair(&engine);
        let err = engine.step_dispute(pos, neg).unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, EngineError::RaceConflict { .. }));
    }

    #[test]
    fn test_facade_view_is_cached_and_stable() {
        let engine = engine();
        let moves = vec![
            Move {
                player: Player::P,
                polarity: Polarity::Pos,
                locus: LocusPath::root(),
                ramification: ram(&[1]),
                justifier: None,
                expression: String::new(),
            },
            Move {
                player: Player::O,
                polarity: Polarity::Neg,
                locus: LocusPath::root().child(1),
                ramification: ram(&[]),
                justifier: Some(0),
                expression: String::new(),
            },
        ];
        let position = Position::from_moves(Player::P, moves);
        let first = engine.extract_view(&position, Player::P);
        let second = engine.extract_view(&position, Player::P);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_strategy_lifecycle_through_facade() {
        let engine = engine();
        let pos = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[1]),
                Some(0),
                "why",
            )
            .act(
                Polarity::Pos,
                LocusPath::root().child(1).child(1),
                ram(&[]),
                Some(1),
                "grounds",
            )
            .build()
            .unwrap();
        let counter = Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[1]),
                None,
                "why",
            )
            .act(
                Polarity::Pos,
                LocusPath::root().child(1).child(1),
                ram(&[]),
                Some(0),
                "grounds",
            )
            .build()
            .unwrap();
        let pos_id = engine.register_design(pos).unwrap();
        let counter_id = engine.register_design(counter).unwrap();
        let strategy = engine.build_strategy(pos_id, &[counter_id]).unwrap();
        assert!(strategy.is_stable());
        let report = engine.check_propagation(strategy.id).unwrap();
        assert!(report.satisfies_propagation);
        assert!(report.is_totally_ordered);
    }

    #[test]
    fn test_check_orthogonal_through_facade() {
        let engine = engine();
        let pos = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .daimon()
            .build()
            .unwrap();
        let counter = Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap();
        let pos_id = engine.register_design(pos).unwrap();
        let counter_id = engine.register_design(counter).unwrap();
        let report = engine.check_orthogonal(pos_id, &[counter_id]).unwrap();
        assert!(report.orthogonal);
        // Cached verdict must match a fresh one.
        let cached = engine.check_orthogonal(pos_id, &[counter_id]).unwrap();
        assert_eq!(report, cached);
        let membership = engine.behaviour_membership(pos_id, &[counter_id]).unwrap();
        assert!(membership.is_member);
    }
}
