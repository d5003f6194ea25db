//! Zonogon Join
//!
//! A distribution's zonogon is bounded below by its Lorenz-like curve: the
//! share pairs sorted by indicator-to-population ratio and accumulated. The
//! join of two distributions is the distribution whose curve is the lower
//! convex hull of both curves: the least distribution whose zonogon contains
//! both zonogons.

use crate::core::distribution::{Distribution, SharePair};
use std::cmp::Ordering;

/// Curve endpoints within this distance of 1 are snapped to 1
const END_SNAP_TOLERANCE: f64 = 1e-12;

/// Vertex of a cumulative share curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

impl CurvePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Order by x, then y
    fn cmp_xy(&self, other: &CurvePoint) -> Ordering {
        self.x
            .partial_cmp(&other.x)
            .unwrap_or(Ordering::Equal)
            .then(self.y.partial_cmp(&other.y).unwrap_or(Ordering::Equal))
    }
}

/// Indicator-to-population ratio; empty populations sort last
fn share_ratio(pair: &SharePair) -> f64 {
    if pair.population == 0.0 {
        f64::INFINITY
    } else {
        pair.indicator / pair.population
    }
}

/// Sort pairs by ascending ratio and accumulate them into a curve.
///
/// The sort is stable, running sums are capped at 1 and the final point is
/// snapped onto (1, 1) when rounding left it just short.
pub fn integrate(distribution: &Distribution) -> Vec<CurvePoint> {
    let mut sorted: Vec<SharePair> = distribution.pairs().to_vec();
    sorted.sort_by(|a, b| {
        share_ratio(a)
            .partial_cmp(&share_ratio(b))
            .unwrap_or(Ordering::Equal)
    });

    let mut x = 0.0;
    let mut y = 0.0;
    let mut curve: Vec<CurvePoint> = sorted
        .iter()
        .map(|pair| {
            x = f64::min(1.0, x + pair.population);
            y = f64::min(1.0, y + pair.indicator);
            CurvePoint::new(x, y)
        })
        .collect();

    if let Some(last) = curve.last_mut() {
        if (1.0 - last.x).abs() < END_SNAP_TOLERANCE {
            last.x = 1.0;
        }
        if (1.0 - last.y).abs() < END_SNAP_TOLERANCE {
            last.y = 1.0;
        }
    }
    curve
}

/// Turn a curve back into share pairs: the first vertex, then the clipped
/// increments between consecutive vertices.
pub fn differentiate(curve: &[CurvePoint]) -> Distribution {
    let mut pairs = Vec::with_capacity(curve.len());
    if let Some(first) = curve.first() {
        pairs.push(SharePair::new(first.x, first.y));
    }
    for window in curve.windows(2) {
        pairs.push(SharePair::new(
            f64::max(0.0, window[1].x - window[0].x),
            f64::max(0.0, window[1].y - window[0].y),
        ));
    }
    Distribution::new(pairs)
}

/// z-component of (a - o) x (b - o); negative for a clockwise turn
fn cross(o: &CurvePoint, a: &CurvePoint, b: &CurvePoint) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Join of two distributions.
///
/// Both curves are merged in (x, y) order and swept with a monotone stack
/// that keeps the lower convex hull, starting from the origin. Collinear
/// vertices are kept so that joining a distribution with the identity
/// returns its pairs unmerged.
pub fn join(left: &Distribution, right: &Distribution) -> Distribution {
    let a = integrate(left);
    let b = integrate(right);

    let mut hull: Vec<CurvePoint> = Vec::with_capacity(a.len() + b.len() + 1);
    hull.push(CurvePoint::new(0.0, 0.0));

    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let take_left = j >= b.len() || (i < a.len() && a[i].cmp_xy(&b[j]) != Ordering::Greater);
        let point = if take_left {
            i += 1;
            a[i - 1]
        } else {
            j += 1;
            b[j - 1]
        };

        if hull.last() == Some(&point) {
            continue;
        }
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) < 0.0 {
            hull.pop();
        }
        hull.push(point);
    }

    differentiate(&hull[1..])
}

/// Join of any number of distributions, starting from the identity
pub fn join_all<'a, I>(distributions: I) -> Distribution
where
    I: IntoIterator<Item = &'a Distribution>,
{
    distributions
        .into_iter()
        .fold(Distribution::identity(), |acc, next| join(&acc, next))
}
