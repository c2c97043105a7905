//! Batch-wide progress from per-item state

use super::types::ItemState;

pub const OPENED_FRACTION: f64 = 0.10;
pub const VALIDATED_FRACTION: f64 = 0.15;
pub const COUNTED_FRACTION: f64 = 0.20;
pub const COMPRESSING_BAND: f64 = 0.60;
pub const ASSEMBLING_FRACTION: f64 = 0.80;

/// Progress within one item for the given state, in `[0, 1]`.
///
/// `None` for `Cancelled`: a cancelled item keeps whatever progress it had.
pub fn state_fraction(state: &ItemState) -> Option<f64> {
    let fraction = match state {
        ItemState::Pending => 0.0,
        ItemState::Opened => OPENED_FRACTION,
        ItemState::Validated => VALIDATED_FRACTION,
        ItemState::Counted { documents: 0 } => COUNTED_FRACTION + COMPRESSING_BAND,
        ItemState::Counted { .. } => COUNTED_FRACTION,
        ItemState::Compressing { total: 0, .. } => COUNTED_FRACTION + COMPRESSING_BAND,
        ItemState::Compressing { done, total } => {
            let done = (*done).min(*total) as f64;
            COUNTED_FRACTION + COMPRESSING_BAND * done / *total as f64
        }
        ItemState::Assembling => ASSEMBLING_FRACTION,
        ItemState::PassThrough | ItemState::Done | ItemState::Invalid | ItemState::Failed => 1.0,
        ItemState::Cancelled => return None,
    };
    Some(fraction)
}

/// Folds per-item fractions into one non-decreasing batch value.
///
/// Every item carries equal weight. The value reaches exactly `1.0` only
/// once every item is terminal and none of them was cancelled.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    items: Vec<(ItemState, f64)>,
    last_reported: Option<f64>,
}

impl ProgressAggregator {
    pub fn new(item_count: usize) -> Self {
        Self {
            items: vec![(ItemState::Pending, 0.0); item_count],
            last_reported: None,
        }
    }

    pub fn state(&self, index: usize) -> Option<ItemState> {
        self.items.get(index).map(|(state, _)| *state)
    }

    /// Every item reached a terminal state other than `Cancelled`.
    pub fn is_finished(&self) -> bool {
        self.items
            .iter()
            .all(|(state, _)| state.is_terminal() && *state != ItemState::Cancelled)
    }

    /// Current batch value.
    pub fn overall(&self) -> f64 {
        if self.is_finished() {
            return 1.0;
        }
        let sum: f64 = self.items.iter().map(|(_, fraction)| fraction).sum();
        (sum / self.items.len() as f64).clamp(0.0, 1.0)
    }

    /// Record a new state for one item. Returns the value to report, if any:
    /// reports never go backwards and never repeat.
    pub fn update(&mut self, index: usize, state: ItemState) -> Option<f64> {
        let slot = self.items.get_mut(index)?;
        if slot.0.is_terminal() {
            return None;
        }
        if let Some(fraction) = state_fraction(&state) {
            slot.1 = fraction;
        }
        slot.0 = state;
        self.next_report()
    }

    /// Value to report when nothing has been reported yet (the empty batch case).
    pub fn flush(&mut self) -> Option<f64> {
        match self.last_reported {
            Some(_) => None,
            None => self.next_report(),
        }
    }

    fn next_report(&mut self) -> Option<f64> {
        let value = self.overall();
        match self.last_reported {
            Some(last) if value <= last => None,
            _ => {
                self.last_reported = Some(value);
                Some(value)
            }
        }
    }
}
