use geometry::Coord;

use crate::reference::{AxisParams, ReferenceSystem, Projection, INDEXSTART, LOWERBORDER};
use crate::error::{Error, Result};
use super::{Outcome, WaxsParams};

/// How output coordinates relate to the input detector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    /// Same coordinates
    Identity,
    /// Flat input detector, Waxs projected output
    SaxsToWaxs,
    /// Waxs projected input, flat output detector
    WaxsToSaxs,
    /// Both flat, input detector rotated
    Tilt,
}

impl Transform {
    /// Transform between an input of projection `proin` and an output of
    /// projection `proout`; `rotated` tells whether the input detector is
    /// rotated.
    pub fn between(proin: Projection, proout: Projection, rotated: bool) -> Self {
        use Projection::*;
        match (proin, proout) {
            (Saxs, Waxs) => Transform::SaxsToWaxs,
            (Waxs, Saxs) => Transform::WaxsToSaxs,
            (Saxs, Saxs) if rotated => Transform::Tilt,
            _ => Transform::Identity,
        }
    }
}

/// The geometry of an output image (unrotated, possibly with sample symmetry)
/// and of the input detector it is computed from
#[derive(Clone, Copy, Debug)]
pub struct DetectorPair {
    pub output: WaxsParams,
    pub input: WaxsParams,
    pub transform: Transform,
}

impl DetectorPair {
    pub fn new(output: WaxsParams, input: WaxsParams, transform: Transform) -> Self {
        Self { output, input, transform }
    }

    /// Input detector coordinate of the output coordinate `w`
    pub fn to_input(&self, w: Coord) -> Outcome<Coord> {
        let (o, i) = (&self.output, &self.input);
        match self.transform {
            Transform::Identity   => Ok(w),
            Transform::SaxsToWaxs => i.kdir2s(o.proj2kdir(w)?),
            Transform::WaxsToSaxs => Ok(i.kdir2proj(o.s2kdir(w))),
            Transform::Tilt       => i.kdir2s(o.s2kdir(w)),
        }
    }

    /// Output coordinate of the input detector coordinate `w`
    pub fn to_output(&self, w: Coord) -> Outcome<Coord> {
        let (o, i) = (&self.output, &self.input);
        match self.transform {
            Transform::Identity   => Ok(w),
            Transform::SaxsToWaxs => Ok(o.kdir2proj(i.s2kdir(w))),
            Transform::WaxsToSaxs => o.kdir2s(i.proj2kdir(w)?),
            Transform::Tilt       => o.kdir2s(i.s2kdir(w)),
        }
    }

    /// Bounding rectangle, in output Saxs coordinates, of an input image of
    /// `dim` pixels with axis geometry `axes`.
    ///
    /// Only the corners of the input are transformed, so parts of the output
    /// may lie outside the rectangle. If a flat input covers backscattering,
    /// the rectangle is widened to the full sphere `|s| <= 2k`.
    pub fn range(&self, dim: [usize; 2], axes: [AxisParams; 2]) -> Result<(Coord, Coord)> {
        let mut edges = [[0.0; 2]; 2];
        for (edge, (d, ax)) in edges.iter_mut().zip(dim.into_iter().zip(axes)) {
            if ax.pixel_size == 0.0 || ax.distance == 0.0 || ax.wavelength == 0.0 {
                return Err(Error::InvalidParameter("zero pixel size, distance or wavelength".into()));
            }
            let lower = INDEXSTART + LOWERBORDER;
            *edge = [ax.index2world(ReferenceSystem::Saxs, lower)?,
                     ax.index2world(ReferenceSystem::Saxs, lower + d as f64)?];
        }
        let mut min = Coord::new(f64::INFINITY, f64::INFINITY);
        let mut max = Coord::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (c1, c2) in [(0, 0), (1, 0), (1, 1), (0, 1)] {
            let w = self.to_output(Coord::new(edges[0][c1], edges[1][c2])).map_err(|_| Error::NoSolution)?;
            min = min.zip(w, f64::min);
            max = max.zip(w, f64::max);
        }
        if self.transform == Transform::SaxsToWaxs
            && self.to_input(Coord::new(0.0, 0.0)).is_err()
            && min.s1 * max.s1 < 0.0 && min.s2 * max.s2 < 0.0
        {
            let smax = 2.0 * self.output.k();
            return Ok((Coord::new(-smax, -smax), Coord::new(smax, smax)));
        }
        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;
    use units::radian;

    fn axis(center: f64) -> AxisParams {
        AxisParams { offset: 0.0, pixel_size: 1e-4, center, distance: 0.1, wavelength: 1e-10 }
    }

    fn pair(rot: (f64, f64, f64), transform: Transform) -> DetectorPair {
        let k = 10.0;
        let input = WaxsParams::new(k, [radian(rot.0), radian(rot.1), radian(rot.2)]);
        DetectorPair::new(WaxsParams::unrotated(k), input, transform)
    }

    #[rstest(/**/ proin           , proout          , rotated, expected,
             case(Projection::Saxs, Projection::Waxs, false  , Transform::SaxsToWaxs),
             case(Projection::Waxs, Projection::Saxs, true   , Transform::WaxsToSaxs),
             case(Projection::Saxs, Projection::Saxs, true   , Transform::Tilt),
             case(Projection::Saxs, Projection::Saxs, false  , Transform::Identity),
             case(Projection::Waxs, Projection::Waxs, true   , Transform::Identity),
    )]
    fn selection(proin: Projection, proout: Projection, rotated: bool, expected: Transform) {
        assert_eq!(Transform::between(proin, proout, rotated), expected);
    }

    #[rstest(/**/ transform,
             case(Transform::SaxsToWaxs),
             case(Transform::WaxsToSaxs),
             case(Transform::Tilt),
    )]
    fn to_output_undoes_to_input(transform: Transform) {
        let p = pair((0.05, -0.1, 0.3), transform);
        let w = Coord::new(1.2, -0.7);
        let back = p.to_output(p.to_input(w).unwrap()).unwrap();
        assert_float_eq!(back.s1, w.s1, abs <= 1e-9);
        assert_float_eq!(back.s2, w.s2, abs <= 1e-9);
    }

    #[test]
    fn same_detector_reduces_to_single_transform() {
        let p = WaxsParams::new(10.0, [radian(0.1), radian(0.2), radian(0.3)]);
        let pair = DetectorPair::new(p, p, Transform::SaxsToWaxs);
        let sp = Coord::new(2.0, 1.0);
        assert_eq!(pair.to_input(sp), p.saxs(sp));
        assert_eq!(pair.to_output(sp), Ok(p.waxs(sp)));
    }

    #[test]
    fn centred_range_is_symmetric() {
        // 100 x 100 pixels, centered: edges at +-50 pixels of 1e-4 m at 0.1 m
        let p = pair((0.0, 0.0, 0.0), Transform::Identity);
        let (min, max) = p.range([100, 100], [axis(50.0), axis(50.0)]).unwrap();
        let edge = 50.0 * 1e-4 / 0.1 * 10.0;
        assert_float_eq!(min.s1, -edge, abs <= 1e-9);
        assert_float_eq!(max.s2,  edge, abs <= 1e-9);

        let p = pair((0.0, 0.0, 0.0), Transform::SaxsToWaxs);
        let (min, max) = p.range([100, 100], [axis(50.0), axis(50.0)]).unwrap();
        // projection shrinks the corners
        assert!(max.s1 < edge && max.s1 > 0.99 * edge);
        assert_float_eq!(min.s1, -max.s1, abs <= 1e-9);
    }

    #[test]
    fn backscattering_covers_sphere() {
        // detector facing the sample from behind: the direct beam position
        // (origin) is not on the detector, but inside the corners
        let p = pair((0.0, std::f64::consts::PI, 0.0), Transform::SaxsToWaxs);
        let (min, max) = p.range([100, 100], [axis(50.0), axis(50.0)]).unwrap();
        assert_float_eq!(max.s1, 20.0, abs <= 1e-12);
        assert_float_eq!(min.s2, -20.0, abs <= 1e-12);
    }

    #[test]
    fn zero_distance_is_rejected() {
        let p = pair((0.0, 0.0, 0.0), Transform::Identity);
        let mut bad = axis(50.0);
        bad.distance = 0.0;
        assert!(p.range([10, 10], [bad, axis(5.0)]).is_err());
    }
}
