//! Polarization factor of Thomson scattering.
//!
//! The incident beam is described by its degree of polarization `P`, the
//! ellipticity `χ` and the inclination `ψ` of the polarization plane (ccw
//! about axis 3, relative to axis 1 of orientation 1). The scattered
//! intensity relative to an unpolarized, forward scattered beam is
//!
//! ```text
//! Iu = (1-P) (1 + k3²) / 2
//! Ip =    P  ((1-k1²) (1 + cos2χ cos2ψ)/2 + (1-k2²) (1 - cos2χ cos2ψ)/2 + k1 k2 cos2χ sin2ψ)
//! ```
//!
//! where `k` is the unit vector along the scattered beam.

use geometry::Coord;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use units::{radian_, Angle};

use crate::error::{Error, Result};
use crate::raster::raster_inversion;
use crate::reference::Projection;
use crate::waxs::WaxsParams;

const CHI_EPS: f64 = 1e-6;

/// Polarization of the incident beam
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Beam {
    /// Degree of polarization, `0 ..= 1`
    pub degree: f64,
    /// Ellipticity, `-π/4 ..= π/4`; zero for linear polarization
    pub chi: Angle,
    /// Inclination of the polarization plane
    pub psi: Angle,
}

#[derive(Clone, Copy, Debug)]
pub struct Polarization {
    orientation: i64,
    degree: f64,
    factor: f64,
    invert: bool,
    half_one_plus: f64,
    half_one_minus: f64,
    cos2chi_sin2psi: f64,
    waxs: WaxsParams,
}

/// Inclination of the polarization plane as seen in an image of
/// `orientation` (1..16).
fn oriented_psi(orientation: i64, psi: f64) -> f64 {
    match orientation {
        2 | 10 => -psi + PI,
        3 | 11 => -psi,
        4 | 12 =>  psi - PI,
        5 | 13 => -psi + FRAC_PI_2,
        6 | 14 =>  psi - FRAC_PI_2,
        7 | 15 =>  psi + FRAC_PI_2,
        8 | 16 => -psi - FRAC_PI_2,
        _      =>  psi,
    }
}

impl Polarization {

    /// Polarization of `beam` seen by a detector of wavenumber `k`, rotated
    /// by `rot`, whose image has `orientation`. A negative orientation
    /// stands for the inverse of its absolute value. All factors are
    /// multiplied by `factor`, and inverted if `invert` is set.
    pub fn new(orientation: i64, k: f64, rot: [Angle; 3], beam: Beam, factor: f64, invert: bool) -> Result<Self> {
        let Beam { degree, chi, psi } = beam;
        let (chi, psi) = (radian_(chi), radian_(psi));
        if !(0.0..=1.0).contains(&degree) {
            return Err(Error::OutOfRangePolarization(format!("degree of polarization {degree} not in [0, 1]")));
        }
        if chi.abs() > FRAC_PI_4 + CHI_EPS {
            return Err(Error::OutOfRangePolarization(format!("ellipticity {chi} not in [-pi/4, pi/4]")));
        }
        if factor <= 0.0 || factor.is_nan() {
            return Err(Error::OutOfRangePolarization(format!("factor {factor} not positive")));
        }
        let orientation = if orientation < 0 { raster_inversion(-orientation)? } else { orientation };
        let psi = oriented_psi(orientation, psi);
        let (cos2chi, cos2psi, sin2psi) = ((2.0 * chi).cos(), (2.0 * psi).cos(), (2.0 * psi).sin());
        Ok(Self {
            orientation,
            degree,
            factor,
            invert,
            half_one_plus:  (1.0 + cos2chi * cos2psi) * 0.5,
            half_one_minus: (1.0 - cos2chi * cos2psi) * 0.5,
            cos2chi_sin2psi: cos2chi * sin2psi,
            waxs: WaxsParams::new(k, rot),
        })
    }

    /// Orientation after folding negative values
    pub fn orientation(&self) -> i64 { self.orientation }

    /// Polarization factor at the Saxs coordinate `wc` of a flat detector
    /// image (`Projection::Saxs`) or of an Ewald sphere projection
    /// (`Projection::Waxs`). `None` where no scattered beam corresponds to
    /// `wc`, or where an inverted factor would be infinite.
    pub fn factor(&self, wc: Coord, projection: Projection) -> Option<f64> {
        let kdir = match projection {
            Projection::Saxs => self.waxs.s2kdir(wc),
            Projection::Waxs => self.waxs.sp2kdir(wc).ok()?,
        };
        let k = kdir.unit();
        let iu = (1.0 - self.degree) * 0.5 * (1.0 + k.z * k.z);
        let ip = self.degree * ( (1.0 - k.x * k.x) * self.half_one_plus
                               + (1.0 - k.y * k.y) * self.half_one_minus
                               +  k.x * k.y        * self.cos2chi_sin2psi);
        let value = (iu + ip) * self.factor;
        match self.invert {
            false => Some(value),
            true if value > 0.0 => Some(1.0 / value),
            true => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;
    use units::radian;

    fn beam(degree: f64, chi: f64, psi: f64) -> Beam { Beam { degree, chi: radian(chi), psi: radian(psi) } }

    fn pol(ori: i64, b: Beam) -> Polarization {
        Polarization::new(ori, 1.0, [radian(0.0); 3], b, 1.0, false).unwrap()
    }

    #[test]
    fn forward_scattering_is_unity() {
        for b in [beam(0.0, 0.0, 0.0), beam(1.0, 0.0, 0.3), beam(0.5, 0.2, 1.0)] {
            let p = pol(1, b);
            assert_float_eq!(p.factor(Coord::new(0.0, 0.0), Projection::Saxs).unwrap(), 1.0, abs <= 1e-12);
        }
    }

    #[test]
    fn linear_polarization_along_axis_1() {
        // |sp| = 1 at k = 1: cos2θ = 1/2
        let p = pol(1, beam(1.0, 0.0, 0.0));
        let along = p.factor(Coord::new(1.0, 0.0), Projection::Waxs).unwrap();
        let across = p.factor(Coord::new(0.0, 1.0), Projection::Waxs).unwrap();
        assert_float_eq!(along, 0.25, abs <= 1e-12);
        assert_float_eq!(across, 1.0, abs <= 1e-12);
    }

    #[test]
    fn unpolarized_depends_on_angle_only() {
        let p = pol(1, beam(0.0, 0.0, 0.7));
        let a = p.factor(Coord::new(0.6, 0.0), Projection::Waxs).unwrap();
        let b = p.factor(Coord::new(0.0, -0.6), Projection::Waxs).unwrap();
        assert_float_eq!(a, b, abs <= 1e-12);
        assert!(a < 1.0);
    }

    #[rstest(/**/ ori, psi, same_as,
             case(  3, 0.4, -0.4),
             case( 11, 0.4, -0.4),
             case(  2, 0.4, -0.4 + PI),
             case(  5, 0.0,  FRAC_PI_2),
             case( 13, 0.3, -0.3 + FRAC_PI_2),
             case(  6, 0.3,  0.3 - FRAC_PI_2),
             case(  8, 0.3, -0.3 - FRAC_PI_2),
             case( -2, 0.4, -0.4 + PI),
    )]
    fn orientation_turns_polarization_plane(ori: i64, psi: f64, same_as: f64) {
        let oriented = pol(ori, beam(1.0, 0.1, psi));
        let plain = pol(1, beam(1.0, 0.1, same_as));
        for sp in [Coord::new(0.7, 0.2), Coord::new(-0.3, 0.9)] {
            assert_float_eq!(oriented.factor(sp, Projection::Waxs).unwrap(),
                             plain   .factor(sp, Projection::Waxs).unwrap(), abs <= 1e-12);
        }
    }

    #[rstest(/**/ degree, chi , factor,
             case(  -0.1, 0.0 , 1.0),
             case(   1.1, 0.0 , 1.0),
             case(   0.5, 0.8 , 1.0),
             case(   0.5, -0.8, 1.0),
             case(   0.5, 0.0 , 0.0),
    )]
    fn out_of_range(degree: f64, chi: f64, factor: f64) {
        let r = Polarization::new(1, 1.0, [radian(0.0); 3], beam(degree, chi, 0.0), factor, false);
        assert!(matches!(r, Err(Error::OutOfRangePolarization(_))));
    }

    #[test]
    fn circular_limit_is_accepted() {
        assert!(Polarization::new(1, 1.0, [radian(0.0); 3], beam(1.0, FRAC_PI_4, 0.0), 1.0, false).is_ok());
    }

    #[test]
    fn inverted_and_scaled() {
        let b = beam(0.9, 0.0, 0.2);
        let direct = Polarization::new(1, 1.0, [radian(0.0); 3], b, 2.0, false).unwrap();
        let inverse = Polarization::new(1, 1.0, [radian(0.0); 3], b, 2.0, true).unwrap();
        let s = Coord::new(0.4, 0.5);
        let d = direct.factor(s, Projection::Saxs).unwrap();
        let i = inverse.factor(s, Projection::Saxs).unwrap();
        assert_float_eq!(d * i, 1.0, abs <= 1e-12);
    }

    #[test]
    fn beyond_ewald_sphere() {
        let p = pol(1, beam(0.5, 0.0, 0.0));
        assert_eq!(p.factor(Coord::new(3.0, 0.0), Projection::Waxs), None);
    }
}
