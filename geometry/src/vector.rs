use std::ops::{Add, Sub, Mul, Neg, Index};

/// A dimensionless 3-vector, used for scattering vectors in units of the
/// reference wavenumber and for unit directions of scattered rays
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub trait Dot<RHS> {
    type Output;
    fn dot(self, other: RHS) -> Self::Output;
}

impl Dot<Vector> for Vector {
    type Output = f64;
    fn dot(self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self { Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z) }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self { Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z) }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self { Self::new(self.x * rhs, self.y * rhs, self.z * rhs) }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self { self * -1.0 }
}

impl Index<usize> for Vector {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("index {index} is out of bounds [0,2]")
        }
    }
}

impl From<nalgebra::Vector3<f64>> for Vector {
    fn from(v: nalgebra::Vector3<f64>) -> Self { Self::new(v.x, v.y, v.z) }
}

impl From<Vector> for nalgebra::Vector3<f64> {
    fn from(v: Vector) -> Self { nalgebra::Vector3::new(v.x, v.y, v.z) }
}

impl Vector {

    pub const fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }

    pub fn magnitude(&self) -> f64 { self.dot(*self).sqrt() }

    /// Unit vector in the same direction, `None` for the null vector
    pub fn normalized(self) -> Option<Self> {
        let m = self.magnitude();
        if m > 0.0 { Some(self * (1.0 / m)) } else { None }
    }
}
