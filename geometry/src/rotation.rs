use std::ops::Mul;

use nalgebra::Matrix3;
use units::{Angle, radian_};

use crate::Vector;

/// Laboratory axis about which a rotation is performed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis { X1, X2, X3 }

/// A proper rotation of 3-space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation(Matrix3<f64>);

impl Rotation {

    pub fn identity() -> Self { Self(Matrix3::identity()) }

    /// Right-handed rotation by `angle` about `axis`
    pub fn about(axis: Axis, angle: Angle) -> Self {
        let (s, c) = radian_(angle).sin_cos();
        Self(match axis {
            Axis::X1 => Matrix3::new(1.0, 0.0, 0.0,
                                     0.0,   c,  -s,
                                     0.0,   s,   c),
            Axis::X2 => Matrix3::new(  c, 0.0,   s,
                                     0.0, 1.0, 0.0,
                                      -s, 0.0,   c),
            Axis::X3 => Matrix3::new(  c,  -s, 0.0,
                                       s,   c, 0.0,
                                     0.0, 0.0, 1.0),
        })
    }

    /// Detector rotation: first about x1 by `rot[0]`, then about x2 by
    /// `rot[1]`, finally about x3 by `rot[2]`
    pub fn detector(rot: [Angle; 3]) -> Self {
        Self::about(Axis::X3, rot[2]) * Self::about(Axis::X2, rot[1]) * Self::about(Axis::X1, rot[0])
    }

    /// Undoes [`Rotation::detector`]
    pub fn detector_inverse(rot: [Angle; 3]) -> Self {
        Self::about(Axis::X1, -rot[0]) * Self::about(Axis::X2, -rot[1]) * Self::about(Axis::X3, -rot[2])
    }

    pub fn transpose(&self) -> Self { Self(self.0.transpose()) }

    pub fn is_identity(&self, eps: f64) -> bool {
        (self.0 - Matrix3::identity()).abs().max() <= eps
    }

    /// Image of the first laboratory axis `(1,0,0)`
    pub fn first_column(&self) -> Vector { Vector::new(self.0[(0, 0)], self.0[(1, 0)], self.0[(2, 0)]) }
}

impl Mul for Rotation {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self { Self(self.0 * rhs.0) }
}

impl Mul<Vector> for Rotation {
    type Output = Vector;
    fn mul(self, rhs: Vector) -> Vector { (self.0 * nalgebra::Vector3::from(rhs)).into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use units::degree;

    fn assert_vec_eq(a: Vector, b: Vector) {
        assert_float_eq!((a.x, a.y, a.z), (b.x, b.y, b.z), abs <= (1e-12, 1e-12, 1e-12));
    }

    #[rstest(/**/ axis    , v                         , expected,
             case(Axis::X1, Vector::new(0.0, 1.0, 0.0), Vector::new(0.0, 0.0, 1.0)),
             case(Axis::X2, Vector::new(0.0, 0.0, 1.0), Vector::new(1.0, 0.0, 0.0)),
             case(Axis::X3, Vector::new(1.0, 0.0, 0.0), Vector::new(0.0, 1.0, 0.0)),
    )]
    fn quarter_turns(axis: Axis, v: Vector, expected: Vector) {
        assert_vec_eq(Rotation::about(axis, degree(90.0)) * v, expected);
    }

    #[test]
    fn detector_rotation_order() {
        // x1 first: e2 -> e3, then x2 turns e3 -> e1, x3 leaves nothing more to do
        let r = Rotation::detector([degree(90.0), degree(90.0), degree(0.0)]);
        assert_vec_eq(r * Vector::new(0.0, 1.0, 0.0), Vector::new(1.0, 0.0, 0.0));
        assert!(Rotation::detector([degree(0.0); 3]).is_identity(0.0));
    }

    proptest! {
        #[test]
        fn inverse_undoes_rotation(
            a in -180.0..180.0_f64,
            b in -180.0..180.0_f64,
            c in -180.0..180.0_f64,
        ) {
            let rot = [degree(a), degree(b), degree(c)];
            let product = Rotation::detector_inverse(rot) * Rotation::detector(rot);
            prop_assert!(product.is_identity(1e-12));
            prop_assert!((Rotation::detector(rot).transpose() * Rotation::detector(rot)).is_identity(1e-12));
        }
    }
}
