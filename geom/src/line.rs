use crate::frac::{Frac, FracPoint};
use crate::math::{Point, Vector};

/// A linear segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct LineSegment {
    pub from: Point,
    pub to: Point,
}

impl LineSegment {
    #[inline]
    pub fn new(from: Point, to: Point) -> Self {
        LineSegment { from, to }
    }

    /// Returns an inverted version of this segment where the beginning and
    /// the end points are swapped.
    #[inline]
    pub fn flip(&self) -> Self {
        LineSegment {
            from: self.to,
            to: self.from,
        }
    }

    #[inline]
    pub fn to_vector(&self) -> Vector {
        self.to - self.from
    }
}

/// How two segments intersect.
///
/// Collinear overlap is reported as `Parallel`; the sweep resolves overlap
/// separately when two edges compare equal in its active tree, so the
/// classification here never has to produce an overlap interval.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegmentIntersection {
    /// The supporting lines cross outside at least one of the segments.
    None,
    /// The supporting lines are parallel (possibly collinear).
    Parallel,
    /// The segments meet at a point that is an endpoint of both.
    Shared,
    /// `a.from` lies in the interior of `b`.
    AFromOnB,
    /// `a.to` lies in the interior of `b`.
    AToOnB,
    /// `b.from` lies in the interior of `a`.
    BFromOnA,
    /// `b.to` lies in the interior of `a`.
    BToOnA,
    /// The segment interiors cross in a single point.
    Crossing(FracPoint),
}

#[inline]
fn cross_v(a: Vector, b: Vector) -> i64 {
    a.x as i64 * b.y as i64 - a.y as i64 * b.x as i64
}

/// Classify the intersection of two segments, exactly.
///
/// The crossing point, when there is one, is returned with exact fractional
/// coordinates: a degree-3 numerator over the degree-2 denominator
/// `da x db`, both well inside the 128 bit intermediate domain for valid
/// coordinates.
pub fn segment_intersection(a: &LineSegment, b: &LineSegment) -> SegmentIntersection {
    let da = a.to_vector();
    let db = b.to_vector();
    let den = cross_v(da, db);
    if den == 0 {
        return SegmentIntersection::Parallel;
    }

    // Parameters of the intersection along a and along b, as fractions
    // tn/d and sn/d with d > 0.
    let w = b.from - a.from;
    let mut tn = cross_v(w, db);
    let mut sn = cross_v(w, da);
    let mut d = den;
    if d < 0 {
        d = -d;
        tn = -tn;
        sn = -sn;
    }
    if tn < 0 || tn > d || sn < 0 || sn > d {
        return SegmentIntersection::None;
    }

    let at_a_end = tn == 0 || tn == d;
    let at_b_end = sn == 0 || sn == d;
    match (at_a_end, at_b_end) {
        (true, true) => SegmentIntersection::Shared,
        (true, false) => {
            if tn == 0 {
                SegmentIntersection::AFromOnB
            } else {
                SegmentIntersection::AToOnB
            }
        }
        (false, true) => {
            if sn == 0 {
                SegmentIntersection::BFromOnA
            } else {
                SegmentIntersection::BToOnA
            }
        }
        (false, false) => {
            let x = Frac::new(
                a.from.x as i128 * d as i128 + tn as i128 * da.x as i128,
                d as i128,
            );
            let y = Frac::new(
                a.from.y as i128 * d as i128 + tn as i128 * da.y as i128,
                d as i128,
            );
            SegmentIntersection::Crossing(FracPoint { x, y })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point;

    fn seg(ax: i32, ay: i32, bx: i32, by: i32) -> LineSegment {
        LineSegment::new(point(ax, ay), point(bx, by))
    }

    #[test]
    fn proper_crossing_integer() {
        let r = segment_intersection(&seg(0, 0, 10, 10), &seg(0, 10, 10, 0));
        match r {
            SegmentIntersection::Crossing(p) => {
                assert!(p.is_integer());
                assert_eq!(p.round(), point(5, 5));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn proper_crossing_fractional() {
        let r = segment_intersection(&seg(0, 0, 7, 11), &seg(0, 11, 7, 0));
        match r {
            SegmentIntersection::Crossing(p) => {
                assert_eq!(p.x, Frac::new(7, 2));
                assert_eq!(p.y, Frac::new(11, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn endpoint_cases() {
        // a.from on the interior of b.
        assert_eq!(
            segment_intersection(&seg(5, 0, 10, 10), &seg(0, 0, 10, 0)),
            SegmentIntersection::AFromOnB
        );
        // a.to on the interior of b.
        assert_eq!(
            segment_intersection(&seg(0, 10, 5, 0), &seg(0, 0, 10, 0)),
            SegmentIntersection::AToOnB
        );
        // b endpoints on the interior of a.
        assert_eq!(
            segment_intersection(&seg(0, 0, 10, 0), &seg(5, 0, 10, 10)),
            SegmentIntersection::BFromOnA
        );
        assert_eq!(
            segment_intersection(&seg(0, 0, 10, 0), &seg(0, 10, 5, 0)),
            SegmentIntersection::BToOnA
        );
        // Shared endpoint.
        assert_eq!(
            segment_intersection(&seg(0, 0, 10, 0), &seg(10, 0, 10, 10)),
            SegmentIntersection::Shared
        );
    }

    #[test]
    fn disjoint_and_parallel() {
        assert_eq!(
            segment_intersection(&seg(0, 0, 10, 0), &seg(0, 1, 10, 1)),
            SegmentIntersection::Parallel
        );
        assert_eq!(
            segment_intersection(&seg(0, 0, 10, 0), &seg(0, 0, 10, 0)),
            SegmentIntersection::Parallel
        );
        assert_eq!(
            segment_intersection(&seg(0, 0, 1, 1), &seg(5, 0, 6, -5)),
            SegmentIntersection::None
        );
    }
}
