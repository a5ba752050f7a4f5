//! Pairwise refinement of an overlap list into a disjoint partition.
//!
//! The records are first snap rounded onto one shared [`Grid`], so that every
//! piece cut from them afterwards shares exact boundaries with its
//! neighbours. Every unordered pair of records is then compared once against
//! the current, changing list. A pair either leaves the list alone, merges
//! two equal records, moves one record's ids onto a contained record, or
//! splits a partial overlap out into a new record appended at the end.

use geo::{BoundingRect, Intersects, MultiPolygon};
use polytools::{area, difference, equals, intersect, invalid_reason, repair, Grid, PolygonError, AREA_TOLERANCE};
use tracing::{debug, info, trace, warn};

use super::{OverlapError, OverlapRecord, OverlapSet};

/// What comparing two records decided, computed before anything is mutated.
enum Outcome {
    /// No shared area (or already reconciled).
    Disjoint,
    /// The two polygons are the same region.
    Duplicate,
    /// The outside polygon lies within the inside one; holds inside minus outside.
    OutsideWithin(MultiPolygon<f64>),
    /// The inside polygon lies within the outside one; holds outside minus inside.
    InsideWithin(MultiPolygon<f64>),
    Partial {
        overlap: MultiPolygon<f64>,
        outside_rest: MultiPolygon<f64>,
        inside_rest: MultiPolygon<f64>,
    },
    /// A boolean operation failed; the relationship is unknown.
    OpFailed(OverlapError),
    /// The overlap could not be repaired; only this pair is affected.
    BadOverlap(OverlapError),
}

/// How the inner loop proceeds after a pair.
enum Step {
    Next,
    /// The inside record was removed; its slot now holds the next candidate.
    InsideRemoved,
    /// The outside record was removed; start over against its replacement.
    OutsideRemoved,
}

fn op_failure(op: &'static str, a: &OverlapRecord, b: &OverlapRecord, source: PolygonError) -> OverlapError {
    OverlapError::PairwiseOpFailure { op, first: a.ids_label(), second: b.ids_label(), source }
}

fn bounds_overlap(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    match (a.bounding_rect(), b.bounding_rect()) {
        (Some(ra), Some(rb)) => ra.intersects(&rb),
        _ => false,
    }
}

/// Difference followed by repair, reported as one operation.
fn remainder(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, PolygonError> {
    repair(&difference(a, b)?)
}

fn classify(a: &OverlapRecord, b: &OverlapRecord) -> Outcome {
    if a.shares_id(b) { return Outcome::Disjoint }

    match equals(&a.polygon, &b.polygon) {
        Ok(true) => return Outcome::Duplicate,
        Ok(false) => {}
        Err(e) => return Outcome::OpFailed(op_failure("equals", a, b, e)),
    }

    if !bounds_overlap(&a.polygon, &b.polygon) { return Outcome::Disjoint }

    let raw = match intersect(&a.polygon, &b.polygon) {
        Ok(raw) => raw,
        Err(e) => return Outcome::OpFailed(op_failure("intersect", a, b, e)),
    };
    if raw.0.is_empty() { return Outcome::Disjoint }

    let overlap = match repair(&raw) {
        Ok(overlap) => overlap,
        Err(e) => return Outcome::BadOverlap(OverlapError::InvalidOverlap {
            first: a.ids_label(),
            second: b.ids_label(),
            message: e.to_string(),
        }),
    };
    if let Some(reason) = invalid_reason(&overlap) {
        return Outcome::BadOverlap(OverlapError::InvalidOverlap {
            first: a.ids_label(),
            second: b.ids_label(),
            message: format!("intersection produced invalid overlap area ({reason})"),
        });
    }
    if area(&overlap) < AREA_TOLERANCE { return Outcome::Disjoint }

    let outside_within = match equals(&a.polygon, &overlap) {
        Ok(v) => v,
        Err(e) => return Outcome::OpFailed(op_failure("equals", a, b, e)),
    };
    if outside_within {
        return match remainder(&b.polygon, &a.polygon) {
            Ok(rest) => Outcome::OutsideWithin(rest),
            Err(e) => Outcome::OpFailed(op_failure("difference", b, a, e)),
        };
    }

    let inside_within = match equals(&b.polygon, &overlap) {
        Ok(v) => v,
        Err(e) => return Outcome::OpFailed(op_failure("equals", a, b, e)),
    };
    if inside_within {
        return match remainder(&a.polygon, &b.polygon) {
            Ok(rest) => Outcome::InsideWithin(rest),
            Err(e) => Outcome::OpFailed(op_failure("difference", a, b, e)),
        };
    }

    // Both remainders are taken against the unmodified opposite polygon.
    let outside_rest = match remainder(&a.polygon, &b.polygon) {
        Ok(rest) => rest,
        Err(e) => return Outcome::OpFailed(op_failure("difference", a, b, e)),
    };
    let inside_rest = match remainder(&b.polygon, &a.polygon) {
        Ok(rest) => rest,
        Err(e) => return Outcome::OpFailed(op_failure("difference", b, a, e)),
    };
    Outcome::Partial { overlap, outside_rest, inside_rest }
}

impl OverlapSet {
    /// Snap round every record onto the set's grid and return the grid.
    ///
    /// The grid is chosen from the bounds of the finite records, keeping an
    /// earlier grid while the records stay within twice its reach. A record
    /// whose snapped form cannot be rebuilt keeps its polygon. `None` if no
    /// record has finite, non-degenerate bounds. [`decompose`](Self::decompose)
    /// snaps the records first unless they are already on a grid.
    pub fn snap_to_grid(&mut self) -> Option<Grid> {
        let fresh = Grid::for_group(self.records.iter().map(|r| &r.polygon))?;
        let grid = match self.grid {
            Some(kept) if fresh.cell() <= 2.0 * kept.cell() => kept,
            _ => fresh,
        };

        let polygons: Vec<MultiPolygon<f64>> = self.records.iter().map(|r| r.polygon.clone()).collect();
        for (i, snapped) in grid.snap_round(&polygons).into_iter().enumerate() {
            match snapped {
                Ok(polygon) => self.records[i].polygon = polygon,
                Err(e) => warn!(record = i, ids = %self.records[i].ids_label(), "keeping unsnapped footprint: {e}"),
            }
        }
        debug!(cell = grid.cell(), records = self.records.len(), "snapped records to grid");

        self.grid = Some(grid);
        Some(grid)
    }

    /// Refine the records into a disjoint partition.
    ///
    /// Without `continue_on_error`, the first pairwise failure is returned
    /// and the set is left as it was at that point, already snapped.
    pub fn decompose(&mut self) -> Result<(), OverlapError> {
        self.decompose_with_progress(|_, _| {})
    }

    /// [`decompose`](Self::decompose), calling `progress(done, total)` once per
    /// outer index. `total` is the current record count and may change between calls.
    pub fn decompose_with_progress<F>(&mut self, mut progress: F) -> Result<(), OverlapError>
    where
        F: FnMut(usize, usize),
    {
        info!(records = self.records.len(), "decomposing overlaps");
        if self.grid.is_none() { self.snap_to_grid(); }

        let mut outside = 0;
        while outside + 1 < self.records.len() {
            progress(outside, self.records.len());

            let mut inside = outside + 1;
            while inside < self.records.len() {
                match self.reconcile(outside, inside)? {
                    Step::Next => inside += 1,
                    Step::InsideRemoved => {}
                    Step::OutsideRemoved => inside = outside + 1,
                }
            }
            outside += 1;
        }
        progress(self.records.len(), self.records.len());

        info!(records = self.records.len(), errors = self.error_log.len(), "decomposition finished");
        Ok(())
    }

    /// Compare records `outside < inside` and apply the result.
    fn reconcile(&mut self, outside: usize, inside: usize) -> Result<Step, OverlapError> {
        let outcome = classify(&self.records[outside], &self.records[inside]);
        self.apply(outside, inside, outcome)
    }

    fn apply(&mut self, outside: usize, inside: usize, outcome: Outcome) -> Result<Step, OverlapError> {
        match outcome {
            Outcome::Disjoint => Ok(Step::Next),

            Outcome::Duplicate => {
                let absorbed = self.records.remove(inside);
                debug!(outside, inside, ids = %absorbed.ids_label(), "merged duplicate footprints");
                self.records[outside].ids.extend(absorbed.ids);
                Ok(Step::InsideRemoved)
            }

            Outcome::OutsideWithin(inside_rest) => {
                let ids = self.records[inside].ids.clone();
                self.records[outside].ids.extend(ids);
                self.records[inside].polygon = inside_rest;
                trace!(outside, inside, "outside record contained in inside record");
                Ok(self.drop_empty(outside, inside))
            }

            Outcome::InsideWithin(outside_rest) => {
                let ids = self.records[outside].ids.clone();
                self.records[inside].ids.extend(ids);
                self.records[outside].polygon = outside_rest;
                trace!(outside, inside, "inside record contained in outside record");
                Ok(self.drop_empty(outside, inside))
            }

            Outcome::Partial { overlap, outside_rest, inside_rest } => {
                let ids = self.records[outside].ids.union(&self.records[inside].ids).cloned().collect();
                self.records.push(OverlapRecord::with_ids(overlap, ids));
                self.records[outside].polygon = outside_rest;
                self.records[inside].polygon = inside_rest;
                trace!(outside, inside, new = self.records.len() - 1, "split partial overlap");
                Ok(self.drop_empty(outside, inside))
            }

            Outcome::OpFailed(error) => {
                self.log_error(&[outside, inside], error.to_string());
                if !self.options.continue_on_error { return Err(error) }
                self.records.remove(inside);
                self.records.remove(outside);
                Ok(Step::OutsideRemoved)
            }

            Outcome::BadOverlap(error) => {
                self.log_error(&[outside, inside], error.to_string());
                if !self.options.continue_on_error { return Err(error) }
                Ok(Step::Next)
            }
        }
    }

    /// Remove records whose remainder has no area left.
    fn drop_empty(&mut self, outside: usize, inside: usize) -> Step {
        let inside_empty = area(&self.records[inside].polygon) < AREA_TOLERANCE;
        let outside_empty = area(&self.records[outside].polygon) < AREA_TOLERANCE;

        if inside_empty {
            debug!(inside, "dropping empty remainder");
            self.records.remove(inside);
        }
        if outside_empty {
            debug!(outside, "dropping empty remainder");
            self.records.remove(outside);
            return Step::OutsideRemoved;
        }
        if inside_empty { Step::InsideRemoved } else { Step::Next }
    }
}
