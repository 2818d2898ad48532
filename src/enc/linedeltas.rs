//! Line shifts of methods whose body was not re-emitted.
//!
//! When an edit only moves a method (lines inserted above it, say), the compiler reports a
//! line delta instead of emitting a new sequence point blob. The session records those
//! deltas per method and applies them on top of the stored blob whenever points are
//! decoded, until a later generation redefines the method's body.

use crate::metadata::sequencepoints::{is_visible_line, SequencePoint};

/// Pending line shifts of one method.
///
/// `scalar` shifts every sequence point, `per_point[i]` additionally shifts point `i`.
/// Points past the end of `per_point` only get the scalar shift. Hidden points are never
/// moved.
///
/// Merging is element-wise addition with wrapping overflow, so it is associative and
/// commutative, and [`MethodLineDeltas::default`] is its identity.
///
/// # Examples
///
/// ```rust
/// use pdbscope::enc::MethodLineDeltas;
///
/// let moved = MethodLineDeltas::scalar(3);
/// let tweaked = MethodLineDeltas::new(0, vec![1, 0, -2]);
///
/// let merged = moved.merge(&tweaked);
/// assert_eq!(merged.delta_at(0), 4);
/// assert_eq!(merged.delta_at(2), 1);
/// assert_eq!(merged.delta_at(10), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MethodLineDeltas {
    /// Shift applied to every sequence point
    pub scalar: i32,
    /// Additional shift of individual sequence points, by point index
    pub per_point: Vec<i32>,
}

impl MethodLineDeltas {
    /// Creates deltas from a scalar and per-point shifts.
    #[must_use]
    pub fn new(scalar: i32, per_point: Vec<i32>) -> Self {
        MethodLineDeltas { scalar, per_point }
    }

    /// Shift every sequence point by `delta` lines.
    #[must_use]
    pub fn scalar(delta: i32) -> Self {
        MethodLineDeltas {
            scalar: delta,
            per_point: Vec::new(),
        }
    }

    /// Returns `true` if applying these deltas moves nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scalar == 0 && self.per_point.iter().all(|delta| *delta == 0)
    }

    /// Returns `true` if only the scalar shift is set.
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.per_point.iter().all(|delta| *delta == 0)
    }

    /// The total shift of point `index`.
    #[must_use]
    pub fn delta_at(&self, index: usize) -> i32 {
        self.scalar
            .wrapping_add(self.per_point.get(index).copied().unwrap_or(0))
    }

    /// Combine two sets of deltas.
    #[must_use]
    pub fn merge(&self, other: &MethodLineDeltas) -> MethodLineDeltas {
        let len = self.per_point.len().max(other.per_point.len());
        let per_point = (0..len)
            .map(|index| {
                let left = self.per_point.get(index).copied().unwrap_or(0);
                let right = other.per_point.get(index).copied().unwrap_or(0);
                left.wrapping_add(right)
            })
            .collect();

        MethodLineDeltas {
            scalar: self.scalar.wrapping_add(other.scalar),
            per_point,
        }
    }

    /// The first shifted line of a visible point in `points` that would leave the valid
    /// line range, if any.
    #[must_use]
    pub fn out_of_range_line(&self, points: &[SequencePoint]) -> Option<i64> {
        points
            .iter()
            .enumerate()
            .filter(|(_, point)| !point.is_hidden)
            .flat_map(|(index, point)| {
                let delta = i64::from(self.delta_at(index));
                [
                    i64::from(point.start_line) + delta,
                    i64::from(point.end_line) + delta,
                ]
            })
            .find(|line| !is_visible_line(*line))
    }

    /// Shift the visible points of `points` in place.
    ///
    /// Lines saturate at 0 and `u32::MAX` instead of wrapping. The session never stores
    /// deltas for which [`MethodLineDeltas::out_of_range_line`] finds a line.
    pub fn apply(&self, points: &mut [SequencePoint]) {
        for (index, point) in points.iter_mut().enumerate() {
            if point.is_hidden {
                continue;
            }

            let delta = self.delta_at(index);
            point.start_line = point.start_line.saturating_add_signed(delta);
            point.end_line = point.end_line.saturating_add_signed(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(il_offset: u32, line: u32) -> SequencePoint {
        SequencePoint {
            il_offset,
            document: 1,
            start_line: line,
            start_col: 1,
            end_line: line,
            end_col: 5,
            is_hidden: false,
        }
    }

    #[test]
    fn merge_sums_elementwise() {
        let a = MethodLineDeltas::new(1, vec![1, 2, 3]);
        let b = MethodLineDeltas::new(-1, vec![10]);

        let merged = a.merge(&b);
        assert_eq!(merged, MethodLineDeltas::new(0, vec![11, 2, 3]));
        assert_eq!(merged, b.merge(&a));
    }

    #[test]
    fn merge_wraps() {
        let a = MethodLineDeltas::new(i32::MAX, vec![i32::MIN]);
        let b = MethodLineDeltas::new(1, vec![-1]);

        let merged = a.merge(&b);
        assert_eq!(merged.scalar, i32::MIN);
        assert_eq!(merged.per_point, vec![i32::MAX]);
    }

    #[test]
    fn identity() {
        let a = MethodLineDeltas::new(4, vec![0, -3]);
        assert_eq!(a.merge(&MethodLineDeltas::default()), a);
        assert!(MethodLineDeltas::default().is_empty());
        assert!(MethodLineDeltas::new(0, vec![0, 0]).is_empty());
        assert!(!a.is_uniform());
        assert!(MethodLineDeltas::scalar(-2).is_uniform());
    }

    #[test]
    fn apply_skips_hidden() {
        let mut points = vec![point(0, 10), SequencePoint::hidden(2, 1), point(4, 12)];
        MethodLineDeltas::new(5, vec![1, 100]).apply(&mut points);

        assert_eq!(points[0].start_line, 16);
        assert_eq!(points[0].end_line, 16);
        assert!(points[1].is_hidden);
        assert_eq!(points[1].start_line, crate::metadata::sequencepoints::HIDDEN_LINE);
        assert_eq!(points[2].start_line, 17);
    }

    #[test]
    fn apply_saturates() {
        let mut points = vec![point(0, 3)];
        MethodLineDeltas::scalar(-10).apply(&mut points);
        assert_eq!(points[0].start_line, 0);
    }

    #[test]
    fn out_of_range_lines() {
        let points = vec![point(0, 3), SequencePoint::hidden(2, 1), point(4, 7)];

        assert_eq!(MethodLineDeltas::scalar(-2).out_of_range_line(&points), None);
        assert_eq!(MethodLineDeltas::scalar(-3).out_of_range_line(&points), Some(0));
        assert_eq!(MethodLineDeltas::scalar(-10).out_of_range_line(&points), Some(-7));
        assert_eq!(
            MethodLineDeltas::new(0, vec![0, 0, 0x2000_0000]).out_of_range_line(&points),
            Some(0x2000_0007)
        );
        assert_eq!(
            MethodLineDeltas::scalar(0x00FE_EFEE - 3).out_of_range_line(&points),
            Some(0x00FE_EFEE)
        );
    }
}
