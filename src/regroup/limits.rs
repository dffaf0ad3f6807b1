//! Radial and angular extent of a rectangular image around the origin.

use std::f64::consts::TAU;

use geometry::Coord;

use crate::error::{Error, Result};
use crate::image::Header;
use crate::reference::{Projection, ReferenceSystem, INDEXSTART, LOWERBORDER};
use crate::waxs::{DetectorPair, Transform, WaxsParams};

const ANGLE_EPS: f64 = 1e-32;

/// Radii and angles covered by a rectangle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    pub min_radius: f64,
    pub max_radius: f64,
    pub min_angle: f64,
    pub max_angle: f64,
}

/// Where an interval `[lo, hi]` lies relative to zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side { Positive, Across, Negative }

fn side(lo: f64, hi: f64) -> Side {
    if 0.0 < lo { Side::Positive } else if 0.0 < hi { Side::Across } else { Side::Negative }
}

/// Limits of the rectangle `[min, max]`, classified by which of the nine
/// regions around the origin it occupies. Angles come straight from `atan2`.
fn classify(min: Coord, max: Coord) -> Limits {
    use Side::*;
    // corners, ccw from the lower left
    let e1 = min;
    let e2 = Coord::new(max.s1, min.s2);
    let e3 = max;
    let e4 = Coord::new(min.s1, max.s2);
    let [d1, d2, d3, d4] = [e1, e2, e3, e4].map(|e| e.norm());
    let angle = |e: Coord| e.s2.atan2(e.s1);
    let (min_radius, max_radius, min_angle, max_angle) = match (side(min.s1, max.s1), side(min.s2, max.s2)) {
        (Positive, Positive) => (d1      , d3               , angle(e2), angle(e4)),
        (Positive, Across  ) => (e1.s1   , d2.max(d3)       , angle(e1), angle(e4)),
        (Positive, Negative) => (d4      , d2               , angle(e1), angle(e3)),
        (Across  , Positive) => (e1.s2   , d4.max(d3)       , angle(e2), angle(e1)),
        (Across  , Across  ) => (0.0     , d1.max(d2).max(d3).max(d4), 0.0, TAU),
        (Across  , Negative) => (-e3.s2  , d1.max(d2)       , angle(e4), angle(e3)),
        (Negative, Positive) => (d2      , d4               , angle(e3), angle(e1)),
        (Negative, Across  ) => (-e2.s1  , d1.max(d4)       , angle(e3), angle(e2)),
        (Negative, Negative) => (d3      , d1               , angle(e4), angle(e2)),
    };
    Limits { min_radius, max_radius, min_angle, max_angle }
}

/// Limits of the rectangle `[min, max]` with `min_angle <= max_angle`,
/// `min_angle` in `[0, 2π)`.
pub fn ang_limits(min: Coord, max: Coord) -> Limits {
    let mut limits = classify(min, max);
    if limits.max_angle < limits.min_angle { limits.max_angle += TAU }
    if limits.min_angle < -ANGLE_EPS || limits.max_angle <= 0.0 {
        limits.min_angle += TAU;
        limits.max_angle += TAU;
    }
    limits
}

/// Limits of the rectangle `[min, max]` around `center`, with both angles
/// in `(0, 2π]`. A range crossing angle zero has `min_angle > max_angle`.
pub fn angle_limits(min: Coord, max: Coord, center: Coord) -> Limits {
    let mut limits = classify(min - center, max - center);
    if limits.min_angle <  0.0 { limits.min_angle += TAU }
    if limits.max_angle <= 0.0 { limits.max_angle += TAU }
    limits
}

/// World coordinates of the outer pixel edges of an image
pub fn world_extent(header: &Header, rsys: ReferenceSystem) -> Result<(Coord, Coord)> {
    let ax1 = header.axis(0, rsys)?;
    let ax2 = header.axis(1, rsys)?;
    let lower = INDEXSTART + LOWERBORDER;
    let [dim1, dim2] = header.dim.map(|d| d as f64);
    Ok((Coord::new(ax1.world(lower), ax2.world(lower)),
        Coord::new(ax1.world(lower + dim1), ax2.world(lower + dim2))))
}

/// Rectangle covered by `input` in output world coordinates of `rsys`, and
/// the transform which maps output coordinates of projection `proout` back
/// onto the input.
///
/// The Ewald sphere geometry is only involved for the Saxs system, when at
/// least one side is a flat detector, unless both are flat and the input is
/// not rotated.
pub fn ang_range(rsys: ReferenceSystem, input: &Header, proout: Projection) -> Result<(Coord, Coord, Transform)> {
    use ReferenceSystem::{Normal, Saxs};
    let proin = input.projection;
    let rotated = input.is_rotated();
    let flat = proin == Projection::Saxs || proout == Projection::Saxs;
    if rsys == Saxs && flat && !(proin == proout && !rotated) {
        let transform = Transform::between(proin, proout, rotated);
        let k = input.wavenumber()?;
        let pair = DetectorPair::new(WaxsParams::unrotated(k), WaxsParams::new(k, input.rotation), transform);
        let axes = [input.axis_params(0, Saxs)?, input.axis_params(1, Saxs)?];
        let (min, max) = pair.range(input.dim, axes)?;
        return Ok((min, max, transform));
    }
    match rsys {
        Saxs | Normal => {
            let (min, max) = world_extent(input, rsys)?;
            Ok((min, max, Transform::Identity))
        }
        _ => Err(Error::InvalidReferenceSystem(rsys.to_string())),
    }
}
