//! Epoch calendar: converts between epochs and slot ranges.
//!
//! The network grows epochs in two phases. During warmup every epoch is
//! twice as long as the previous one, starting from
//! [`MINIMUM_SLOTS_PER_EPOCH`]; past `first_normal_epoch` every epoch has the
//! fixed `slots_per_epoch` length.
//!
//! ```text
//! epoch <= first_normal_epoch:  slots = 32 * 2^epoch
//!                               first = (2^epoch - 1) * 32
//! epoch >  first_normal_epoch:  slots = slots_per_epoch
//!                               first = (epoch - first_normal_epoch) * slots_per_epoch
//!                                       + first_normal_slot
//! ```

use serde::{Deserialize, Serialize};

use crate::rpc::types::{Epoch, Slot};

/// Length of epoch 0 during warmup.
pub const MINIMUM_SLOTS_PER_EPOCH: u64 = 32;

/// Result of `getEpochSchedule`. Immutable once fetched; copied into callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSchedule {
    pub first_normal_epoch: Epoch,
    pub first_normal_slot: Slot,
    pub leader_schedule_slot_offset: u64,
    pub slots_per_epoch: u64,
    #[serde(default)]
    pub warmup: bool,
}

impl Default for EpochSchedule {
    /// Mainnet schedule (no warmup).
    fn default() -> Self {
        Self {
            first_normal_epoch: 0,
            first_normal_slot: 0,
            leader_schedule_slot_offset: 432_000,
            slots_per_epoch: 432_000,
            warmup: false,
        }
    }
}

impl EpochSchedule {
    /// Number of slots in `epoch`.
    pub fn slots_in_epoch(&self, epoch: Epoch) -> u64 {
        if epoch <= self.first_normal_epoch {
            MINIMUM_SLOTS_PER_EPOCH.saturating_mul(pow2(epoch))
        } else {
            self.slots_per_epoch
        }
    }

    /// First slot belonging to `epoch`.
    pub fn first_slot_in_epoch(&self, epoch: Epoch) -> Slot {
        if epoch <= self.first_normal_epoch {
            (pow2(epoch) - 1).saturating_mul(MINIMUM_SLOTS_PER_EPOCH)
        } else {
            (epoch - self.first_normal_epoch)
                .saturating_mul(self.slots_per_epoch)
                .saturating_add(self.first_normal_slot)
        }
    }

    /// Last slot belonging to `epoch`.
    pub fn last_slot_in_epoch(&self, epoch: Epoch) -> Slot {
        self.first_slot_in_epoch(epoch)
            .saturating_add(self.slots_in_epoch(epoch).saturating_sub(1))
    }

    /// Epoch containing `slot` and the slot's offset within it.
    ///
    /// Only defined once the fixed-rate phase has started. The inverse for
    /// warmup slots is not specified yet and yields `None`.
    pub fn epoch_and_offset_for_slot(&self, slot: Slot) -> Option<(Epoch, u64)> {
        if slot < self.first_normal_slot || self.slots_per_epoch == 0 {
            return None;
        }
        let normal_slots = slot - self.first_normal_slot;
        Some((
            self.first_normal_epoch + normal_slots / self.slots_per_epoch,
            normal_slots % self.slots_per_epoch,
        ))
    }
}

fn pow2(epoch: Epoch) -> u64 {
    u32::try_from(epoch)
        .ok()
        .and_then(|e| 1u64.checked_shl(e))
        .unwrap_or(u64::MAX)
}
