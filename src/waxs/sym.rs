//! Waxs projection of samples with cylindrical symmetry.
//!
//! The projection coordinate `ssym1` is the component of the scattering
//! vector along the symmetry axis, `ssym2` the (signed) component
//! perpendicular to it. With [`Symmetry::Axis2`] the roles of the axes are
//! exchanged by a quarter turn, so that the same formulas apply.

use geometry::{Coord, Dot, Rotation, Vector};
use units::Angle;

use super::{Direction, Failure, Outcome, Symmetry, WaxsParams, EPS};

/// Quarter turn taking axis 2 onto axis 1
fn to_axis1(c: Coord) -> Coord { Coord::new(c.s2, -c.s1) }

/// Inverse of [`to_axis1`]
fn from_axis1(c: Coord) -> Coord { Coord::new(-c.s2, c.s1) }

impl WaxsParams {

    /// Attach a sample symmetry whose axis is rotated ccw by `rot` (about
    /// axes 1, 2 and 3, applied in this order).
    pub fn with_symmetry(self, symmetry: Symmetry, rot: [Angle; 3]) -> Self {
        let rot = match symmetry {
            Symmetry::Axis2 => [rot[1], -rot[0], rot[2]],
            _               => rot,
        };
        Self {
            symmetry,
            sym_rot: Rotation::detector(rot),
            inv_sym_rot: Rotation::detector_inverse(rot),
            ..self
        }
    }

    /// Direction of the beam which reaches the symmetric projection at `ssym`
    pub fn ssym2kdir(&self, ssym: Coord) -> Outcome<Direction> {
        let ssym = if self.symmetry == Symmetry::Axis2 { to_axis1(ssym) } else { ssym };
        let k0 = self.inv_sym_rot * Vector::new(0.0, 0.0, -self.k);
        let sp2 = ssym.s1 * ssym.s1;
        let ss2 = ssym.s2 * ssym.s2;
        let a = -((ss2 + sp2) * 0.5 + k0.x * ssym.s1);
        let b = ss2;
        let k0_perp2 = k0.y * k0.y + k0.z * k0.z;
        if k0_perp2.abs() < EPS { return Err(Failure::AxisAlongBeam) }
        let arg = k0_perp2 * b - a * a;
        if arg < 0.0 { return Err(Failure::NoSolution) }
        let arg = arg.sqrt();
        let root = if ssym.s2 < 0.0 { arg } else { -arg };
        let s0 = Vector::new(ssym.s1,
                             (a * k0.y + k0.z * root) / k0_perp2,
                             (a * k0.z - k0.y * root) / k0_perp2);
        let s = self.sym_rot * s0;
        // kout^ = (s + kin) / k
        let kout = Vector::new(s.x / self.k, s.y / self.k, s.z / self.k - 1.0);
        let kout = if self.symmetry == Symmetry::Axis2 { Vector::new(-kout.y, kout.x, kout.z) } else { kout };
        Ok(Direction::from_unit(kout))
    }

    /// Symmetric projection of the beam `kdir`
    pub fn kdir2ssym(&self, kdir: Direction) -> Coord {
        let kvec = kdir.unit();
        let kvec = if self.symmetry == Symmetry::Axis2 { Vector::new(kvec.y, -kvec.x, kvec.z) } else { kvec };
        let svec = Vector::new(kvec.x * self.k, kvec.y * self.k, (kvec.z + 1.0) * self.k);
        let sym = self.sym_rot.first_column();
        let s1 = svec.dot(sym);
        let perp = (svec.dot(svec) - s1 * s1).max(0.0).sqrt();
        let s2 = if svec.y * sym.x - svec.x * sym.y > 0.0 { perp } else { -perp };
        let ssym = Coord::new(s1, s2);
        if self.symmetry == Symmetry::Axis2 { from_axis1(ssym) } else { ssym }
    }

    /// Isotropic Waxs projection of the symmetric projection `ssym`
    pub fn uni2iso(&self, ssym: Coord) -> Outcome<Coord> {
        match self.symmetry {
            Symmetry::Isotropic => Ok(ssym),
            _                   => Ok(self.kdir2sp(self.ssym2kdir(ssym)?)),
        }
    }

    /// Symmetric projection of the isotropic Waxs projection `sp`
    pub fn iso2uni(&self, sp: Coord) -> Outcome<Coord> {
        match self.symmetry {
            Symmetry::Isotropic => Ok(sp),
            _                   => Ok(self.kdir2ssym(self.sp2kdir(sp)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;
    use units::radian;

    fn sym(symmetry: Symmetry, r: (f64, f64, f64)) -> WaxsParams {
        WaxsParams::unrotated(1.0).with_symmetry(symmetry, [radian(r.0), radian(r.1), radian(r.2)])
    }

    #[rstest(/**/ symmetry        , rot            , s1  ,  s2  ,
             case(Symmetry::Axis1, (0.0, 0.0, 0.0), 0.3 ,  0.4 ),
             case(Symmetry::Axis1, (0.0, 0.0, 0.0), 0.3 , -0.4 ),
             case(Symmetry::Axis1, (0.0, 0.0, 0.5), -0.2,  0.6 ),
             case(Symmetry::Axis2, (0.0, 0.0, 0.0), 0.3 ,  0.4 ),
             case(Symmetry::Axis2, (0.1, 0.0, 0.2), -0.5, -0.1 ),
    )]
    fn symmetric_round_trip(symmetry: Symmetry, rot: (f64, f64, f64), s1: f64, s2: f64) {
        let p = sym(symmetry, rot);
        let s = Coord::new(s1, s2);
        let ssym = p.waxs(s);
        let back = p.saxs(ssym).unwrap();
        assert_float_eq!(back.s1, s1, abs <= 1e-9);
        assert_float_eq!(back.s2, s2, abs <= 1e-9);
    }

    #[test]
    fn components_of_scattering_vector() {
        let p = sym(Symmetry::Axis1, (0.0, 0.0, 0.0));
        let s = Coord::new(0.3, 0.4);
        let svec = p.saxs2vector(s);
        let ssym = p.waxs(s);
        // parallel component is the projection onto axis 1
        assert_float_eq!(ssym.s1, svec.x, abs <= 1e-12);
        assert_float_eq!(ssym.s1.hypot(ssym.s2), svec.magnitude(), abs <= 1e-12);
        assert!(ssym.s2 > 0.0);
    }

    #[test]
    fn iso_uni_conversions() {
        let p = sym(Symmetry::Axis1, (0.0, 0.0, 0.2));
        let sp = Coord::new(0.4, -0.3);
        let back = p.uni2iso(p.iso2uni(sp).unwrap()).unwrap();
        assert_float_eq!(back.s1, sp.s1, abs <= 1e-9);
        assert_float_eq!(back.s2, sp.s2, abs <= 1e-9);

        let iso = WaxsParams::unrotated(1.0);
        assert_eq!(iso.iso2uni(sp), Ok(sp));
        assert_eq!(iso.uni2iso(sp), Ok(sp));
    }

    #[test]
    fn axis_along_beam() {
        // symmetry axis 1 turned onto the beam
        let p = sym(Symmetry::Axis1, (0.0, std::f64::consts::FRAC_PI_2, 0.0));
        assert_eq!(p.ssym2kdir(Coord::new(0.1, 0.1)), Err(Failure::AxisAlongBeam));
    }
}
