use std::ops::{Add, Sub, Mul, Neg, Index};

/// A point or displacement in a 2-dimensional detector plane
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coord {
    pub s1: f64,
    pub s2: f64,
}

impl Coord {
    pub const fn new(s1: f64, s2: f64) -> Self { Self { s1, s2 } }

    pub fn norm(&self) -> f64 { self.s1.hypot(self.s2) }

    /// Swap the two components
    pub fn swap(self) -> Self { Self::new(self.s2, self.s1) }

    /// Apply `f` to each component separately
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self { Self::new(f(self.s1), f(self.s2)) }

    /// Combine corresponding components of `self` and `other` with `f`
    pub fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(f(self.s1, other.s1), f(self.s2, other.s2))
    }
}

impl From<(f64, f64)> for Coord {
    fn from((s1, s2): (f64, f64)) -> Self { Self::new(s1, s2) }
}

impl Add for Coord {
    type Output = Self;
    fn add(self, rhs: Self) -> Self { self.zip(rhs, |a, b| a + b) }
}

impl Sub for Coord {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self { self.zip(rhs, |a, b| a - b) }
}

impl Mul<f64> for Coord {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self { self.map(|a| a * rhs) }
}

impl Neg for Coord {
    type Output = Self;
    fn neg(self) -> Self { self.map(|a| -a) }
}

impl Index<usize> for Coord {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.s1,
            1 => &self.s2,
            _ => panic!("index {index} is out of bounds [0,1]")
        }
    }
}
