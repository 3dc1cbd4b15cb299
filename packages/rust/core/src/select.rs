//! Dedup/selection: which candidates are new relative to a watermark.
//!
//! Selection is a pure function of `(candidates, watermark, kind, limit)`.
//! Calling it twice with the same inputs yields the same result, and the
//! returned watermark never moves backwards.

use std::cmp::Ordering;

use tracing::{debug, error};

use wikitrigger_shared::{CandidateEvent, Result, TriggerKind, Watermark, WikiTriggerError};

/// Events to deliver plus the watermark to hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// Events in the order the caller should process them (oldest first).
    pub events: Vec<CandidateEvent>,
    /// Position of the last delivered event, or the input watermark.
    pub next_watermark: Watermark,
}

/// Select the events strictly after `watermark`.
///
/// Stream kinds deliver the oldest `limit` qualifying events and leave the
/// rest for later calls. Events tied with the last one on `(occurred_at, id)`
/// ride along, so a batch can exceed `limit` by the size of that tie.
/// Singleton kinds deliver only the newest qualifying event: a missed day is
/// not backfilled.
pub fn select(
    candidates: &[CandidateEvent],
    watermark: &Watermark,
    kind: TriggerKind,
    limit: i64,
) -> Result<SelectionResult> {
    if limit <= 0 {
        return Err(WikiTriggerError::InvalidLimit { limit });
    }

    // Adapters need not pre-sort, so the order is re-established here.
    let mut ordered: Vec<&CandidateEvent> = candidates.iter().collect();
    ordered.sort_by(|a, b| a.order(b));

    if let Some(pair) = ordered
        .windows(2)
        .find(|pair| pair[0].order(pair[1]) == Ordering::Equal)
    {
        error!(%kind, id = pair[0].id(), "duplicate candidate identity; both are kept");
    }

    let fresh: Vec<&CandidateEvent> = ordered
        .into_iter()
        .filter(|event| watermark.admits(event))
        .collect();

    let events: Vec<CandidateEvent> = if kind.is_singleton() {
        fresh.last().map(|e| vec![(*e).clone()]).unwrap_or_default()
    } else {
        let mut cap = usize::try_from(limit).unwrap_or(usize::MAX).min(fresh.len());
        // An identity tied across the cut would be shut out by the next watermark.
        while cap > 0
            && cap < fresh.len()
            && fresh[cap - 1].order(fresh[cap]) == Ordering::Equal
        {
            cap += 1;
        }
        fresh[..cap].iter().map(|e| (*e).clone()).collect()
    };

    let next_watermark = events
        .last()
        .map(Watermark::from)
        .unwrap_or_else(|| watermark.clone());

    debug!(
        %kind,
        candidates = candidates.len(),
        qualifying = fresh.len(),
        delivered = events.len(),
        "selection computed"
    );

    Ok(SelectionResult {
        events,
        next_watermark,
    })
}
