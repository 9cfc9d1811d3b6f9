//! Threshold checks of one node against the fleet baseline.
//!
//! Every check is independent and toggled by [`CheckConfig`]; each failing
//! check contributes one stable token to the verdict. Evaluation is pure: it
//! reads a snapshot and a baseline and touches no shared state.

use std::fmt;

use crate::config::CheckConfig;
use crate::health::fleet::FleetBaseline;
use crate::health::snapshot::NodeSnapshot;

/// A failed threshold check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// Trails the fleet's best slot by more than the allowed gap.
    Behind,
    /// Current slot far from the max-retransmit slot.
    MaxRetransmit,
    /// Stores fewer slots than required.
    SlotsStored,
    /// No confirmed blocks at all in the current epoch.
    Holes,
    /// Current-epoch block count diverges from the fleet's best.
    BlockDiff,
}

impl FailureReason {
    /// Token as it appears on the agent-check line.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Behind => "behind",
            FailureReason::MaxRetransmit => "max-retransmit",
            FailureReason::SlotsStored => "slotsstored",
            FailureReason::Holes => "holes",
            FailureReason::BlockDiff => "blockdiff",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comma-joined display of a verdict, e.g. `behind,blockdiff`.
pub struct FailureReasons<'a>(pub &'a [FailureReason]);

impl fmt::Display for FailureReasons<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reason) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(reason.as_str())?;
        }
        Ok(())
    }
}

/// Applies the configured threshold checks.
#[derive(Debug, Clone)]
pub struct HealthEvaluator {
    checks: CheckConfig,
}

impl HealthEvaluator {
    pub fn new(checks: CheckConfig) -> Self {
        Self { checks }
    }

    pub fn checks(&self) -> &CheckConfig {
        &self.checks
    }

    /// Failed checks for `target`, in check order. Empty means healthy.
    ///
    /// The slot comparison only runs when `configured_nodes > 1`; a lone node
    /// has nothing to trail.
    pub fn evaluate(
        &self,
        target: &NodeSnapshot,
        baseline: &FleetBaseline,
        configured_nodes: usize,
    ) -> Vec<FailureReason> {
        let mut failures = Vec::new();
        let node = target.node.as_str();

        if configured_nodes > 1 {
            let diff = signed_diff(target.current_slot, baseline.max_current_slot);
            tracing::debug!(
                node,
                local = target.current_slot,
                fleet = baseline.max_current_slot,
                diff,
                "Slot comparison"
            );
            if diff < -(self.checks.max_slot_diff as i64) {
                tracing::info!(node, diff, max_slot_diff = self.checks.max_slot_diff, "Node is behind the fleet");
                failures.push(FailureReason::Behind);
            }
        }

        if self.checks.enable_max_retransmit_check {
            let diff = signed_diff(target.current_slot, target.max_retransmit_slot);
            tracing::debug!(
                node,
                local = target.current_slot,
                max_retransmit = target.max_retransmit_slot,
                diff,
                "Max-retransmit comparison"
            );
        }

        if self.checks.ledger_check_enabled() {
            let stored = target.current_slot.saturating_sub(target.minimum_slot);
            tracing::debug!(node, stored, required = self.checks.minimum_ledger_size, "Slots stored");
            if stored < self.checks.minimum_ledger_size {
                tracing::info!(node, stored, required = self.checks.minimum_ledger_size, "Node stores too few slots");
                failures.push(FailureReason::SlotsStored);
            }
        }

        if self.checks.enable_block_check {
            let cur = target.cur_epoch_block_count();
            let cur_diff = cur as i64 - baseline.max_cur_epoch_blocks as i64;
            let prev_diff =
                target.prev_epoch_block_count() as i64 - baseline.max_prev_epoch_blocks as i64;
            tracing::debug!(
                node,
                local = cur,
                fleet = baseline.max_cur_epoch_blocks,
                diff = cur_diff,
                prev_diff,
                "Block comparison"
            );

            if cur == 0 {
                tracing::info!(node, "Node has no confirmed blocks in the current epoch");
                failures.push(FailureReason::Holes);
            } else if cur_diff.unsigned_abs() > self.checks.max_block_diff {
                tracing::info!(node, diff = cur_diff, max_block_diff = self.checks.max_block_diff, "Block count diverges");
                failures.push(FailureReason::BlockDiff);
            }
        }

        failures
    }
}

fn signed_diff(local: u64, reference: u64) -> i64 {
    local as i64 - reference as i64
}
