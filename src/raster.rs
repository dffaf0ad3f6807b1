//! Raster configurations: the `2ⁿ·n!` ways an n-dimensional array can be laid
//! out in memory.
//!
//! An [`Order`] lists, for each offset index (fastest first), the array
//! coordinate it runs along: `order[i] = ±j` means that offset index `i` runs
//! along coordinate `j`, backwards if negative. Configuration 1 is the
//! identity `1,2,…,n`. Raster numbers enumerate all configurations such that
//! the sub-array rule holds: the number of `[a1,…,an,n+1]` equals the number
//! of `[a1,…,an]`.

use nalgebra::DMatrix;
use thiserror::Error;

mod normalize;
mod parse;

pub use normalize::{normalization, order_normalization, normalize_in_place};

/// Highest dimension for which all raster numbers fit into an `i64` with
/// room to spare; beyond it, axes `10..n` are implicitly in identity order
pub const MAX_RASTER_DIMENSION: usize = 9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("raster number {number} outside [1, {max}] for dimension {n}")]
    NumberOutOfRange { n: usize, number: i64, max: i64 },
    #[error("`{0}` is not a signed permutation")]
    NotAPermutation(String),
    #[error("dimension mismatch: {0}")]
    Dimensions(String),
    #[error("index {0} given twice")]
    ExplicitDuplication(i64),
    #[error("index {index} outside 1..={n}")]
    OutsideRange { index: i64, n: usize },
    #[error("implicit index {0} already used")]
    ImplicitDuplication(usize),
    #[error("{got} of {expected} indices given")]
    NotEnoughParameters { expected: usize, got: usize },
    #[error("more than {n} indices given; `{0}` was read", n = .0.dim())]
    TooManyParameters(Order),
    #[error("cannot convert raster number {0}")]
    Conversion(i64),
    #[error("{0}")]
    Number(#[from] units::expr::Error),
}

pub type Result<T> = std::result::Result<T, RasterError>;

/// Number of raster configurations of an `n`-dimensional array, `2ⁿ·n!`.
/// `None` above [`MAX_RASTER_DIMENSION`].
pub fn raster_numbers(n: usize) -> Option<i64> {
    if n > MAX_RASTER_DIMENSION { return None }
    Some((1..=n as i64).map(|i| 2 * i).product())
}

/// Coordinate order of a raster configuration
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Order(Vec<i64>);

impl Order {

    pub fn identity(n: usize) -> Self { Self((1..=n as i64).collect()) }

    /// Checks that `values` is a signed permutation of `1..=n`
    pub fn new(values: Vec<i64>) -> Result<Self> {
        let n = values.len() as i64;
        let mut seen = vec![false; values.len() + 1];
        for &v in &values {
            let a = v.abs();
            if a < 1 || a > n || seen[a as usize] {
                return Err(RasterError::NotAPermutation(Self(values).to_string()))
            }
            seen[a as usize] = true;
        }
        Ok(Self(values))
    }

    pub fn dim(&self) -> usize { self.0.len() }

    pub fn as_slice(&self) -> &[i64] { &self.0 }

    pub fn is_identity(&self) -> bool { self.0.iter().zip(1..).all(|(&o, i)| o == i) }

    /// Order of raster configuration `number` in dimension `n`. A negative
    /// number yields the inverse configuration of `-number`.
    pub fn from_number(n: usize, number: i64) -> Result<Self> {
        let d = number.abs();
        let mut order = vec![0_i64; n];
        let mut m_dim = n;
        // Dimensions above the limit stay in identity order
        if n > MAX_RASTER_DIMENSION {
            for (i, o) in order.iter_mut().enumerate().skip(MAX_RASTER_DIMENSION) { *o = i as i64 + 1 }
            m_dim = MAX_RASTER_DIMENSION;
        }
        let max = raster_numbers(m_dim).unwrap_or(0);
        if !(0 < d && d <= max) {
            return Err(RasterError::NumberOutOfRange { n, number, max })
        }

        let mut d = d;
        let mut an = max;
        for k in (1..=m_dim as i64).rev() {
            let anm1 = an / (2 * k);
            let m = (d - 1) / (2 * anm1);
            d -= m * 2 * anm1;
            let free_index = k - m;
            let value = if d <= anm1 { k } else { d -= anm1; -k };
            if let Some(slot) = order.iter_mut().filter(|o| **o == 0).nth(free_index as usize - 1) {
                *slot = value;
            }
            an = anm1;
        }
        let order = Self(order);
        Ok(if number < 0 { order.inverse() } else { order })
    }

    /// Raster number of this configuration. Above [`MAX_RASTER_DIMENSION`]
    /// only configurations which leave the excess axes alone have a number.
    pub fn number(&self) -> Result<i64> {
        let mut n = self.dim();
        if n > MAX_RASTER_DIMENSION {
            if self.0.iter().enumerate().skip(MAX_RASTER_DIMENSION).any(|(i, &o)| o != i as i64 + 1) {
                return Err(RasterError::Conversion(0))
            }
            n = MAX_RASTER_DIMENSION;
        }
        let mut d = 1;
        let mut anm1 = 1;
        for i in 1..=n as i64 {
            let index = self.signed_position(i);
            if index == 0 { return Err(RasterError::NotAPermutation(self.to_string())) }
            d += if index > 0 { (i - index) * 2 * anm1 }
                 else         { (i + index) * 2 * anm1 + anm1 };
            anm1 *= 2 * i;
        }
        Ok(d)
    }

    /// 1-based position of `±value` among the elements with magnitude up to
    /// `value`; negative if `-value` is found, 0 if absent
    fn signed_position(&self, value: i64) -> i64 {
        let mut index = 1;
        for &o in self.0.iter().filter(|o| o.abs() <= value) {
            if o ==  value { return index }
            if o == -value { return -index }
            index += 1;
        }
        0
    }

    /// `y = a·x` with `y[i] = sign(a[i])·x[|a[i]|]`: the configuration reached
    /// by applying transformation `self` to configuration `x`. `self` must not
    /// have more axes than `x`.
    pub fn multiply(&self, x: &Order) -> Result<Order> {
        if self.dim() > x.dim() {
            return Err(RasterError::Dimensions(format!("{} axes applied to {} axes", self.dim(), x.dim())))
        }
        Ok(Order(self.0.iter().map(|&a| a.signum() * x.0[a.unsigned_abs() as usize - 1]).collect()))
    }

    /// `a = x⁻¹` such that `a·x` is the identity
    pub fn inverse(&self) -> Order {
        let mut a = vec![0; self.dim()];
        for (i, &x) in (1..).zip(&self.0) {
            a[x.unsigned_abs() as usize - 1] = x.signum() * i;
        }
        Order(a)
    }

    /// Determinant of the signed permutation matrix, `±1`
    pub fn determinant(&self) -> i64 {
        let mut o = self.0.clone();
        let mut det = 1;
        for l in 0..o.len() {
            let n = o[l].abs();
            let cofactor = if n % 2 == 1 { 1 } else { -1 };
            det *= cofactor * o[l].signum();
            for later in &mut o[l + 1..] {
                if later.abs() > n { *later -= later.signum() }
            }
        }
        det
    }

    /// Signed permutation matrix, `m[(l, |order[l]| - 1)] = sign(order[l])`
    pub fn matrix(&self) -> DMatrix<f64> {
        let n = self.dim();
        let mut m = DMatrix::zeros(n, n);
        for (l, &o) in self.0.iter().enumerate() {
            m[(l, o.unsigned_abs() as usize - 1)] = o.signum() as f64;
        }
        m
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = itertools::join(&self.0, ",");
        f.write_str(&text)
    }
}

/// `out[l][n] = Σ_m a[m][n]·b[l][m]`, i.e. `b·a`
pub fn matrix_product(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if b.ncols() != a.nrows() {
        return Err(RasterError::Dimensions(format!(
            "{}x{} times {}x{}", b.nrows(), b.ncols(), a.nrows(), a.ncols())))
    }
    Ok(b * a)
}

/// Raster number of the configuration which transforms `x` into 1
pub fn raster_inversion(x: i64) -> Result<i64> {
    Order::from_number(MAX_RASTER_DIMENSION, x)?.inverse().number()
}

/// Raster number of `a·x`
pub fn raster_multiplication(a: i64, x: i64) -> Result<i64> {
    let a = Order::from_number(MAX_RASTER_DIMENSION, a)?;
    let x = Order::from_number(MAX_RASTER_DIMENSION, x)?;
    a.multiply(&x)?.number()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest(/**/ n, number, order        , determinant,
             case(2, 1     , vec![ 1,  2]    ,  1),
             case(2, 2     , vec![-1,  2]    , -1),
             case(2, 3     , vec![ 1, -2]    , -1),
             case(2, 4     , vec![-1, -2]    ,  1),
             case(2, 5     , vec![ 2,  1]    , -1),
             case(2, 6     , vec![ 2, -1]    ,  1),
             case(2, 7     , vec![-2,  1]    ,  1),
             case(2, 8     , vec![-2, -1]    , -1),
             case(3, 1     , vec![ 1,  2,  3],  1),
             case(3, 5     , vec![ 2,  1,  3], -1),
             case(3, 9     , vec![ 1,  2, -3], -1),
             case(3, 13    , vec![ 2,  1, -3],  1),
             case(3, 17    , vec![ 1,  3,  2], -1),
             case(3, 33    , vec![ 3,  1,  2],  1),
             case(3, 37    , vec![ 3,  2,  1], -1),
             case(3, 48    , vec![-3, -2, -1],  1),
    )]
    fn numbered_configurations(n: usize, number: i64, order: Vec<i64>, determinant: i64) {
        let o = Order::from_number(n, number).unwrap();
        assert_eq!(o.as_slice(), &order[..]);
        assert_eq!(o.number().unwrap(), number);
        assert_eq!(o.determinant(), determinant);
    }

    #[test]
    fn inverse_of_orientations_six_and_seven() {
        assert_eq!(raster_inversion(6).unwrap(), 7);
        assert_eq!(raster_inversion(7).unwrap(), 6);
        assert_eq!(raster_inversion(33).unwrap(), 21);
        assert_eq!(Order::from_number(3, -33).unwrap().number().unwrap(), 21);
    }

    #[test]
    fn sub_array_rule() {
        for number in 1..=8 {
            let small = Order::from_number(2, number).unwrap();
            let mut big = small.as_slice().to_vec();
            big.push(3);
            assert_eq!(Order::new(big).unwrap().number().unwrap(), number);
        }
        assert_eq!(Order::from_number(9, 2).unwrap().as_slice()[..3], [-1, 2, 3]);
    }

    #[test]
    fn beyond_nine_axes() {
        let o = Order::from_number(11, 5).unwrap();
        assert_eq!(o.as_slice()[..3], [2, 1, 3]);
        assert_eq!(o.as_slice()[9..], [10, 11]);
        assert_eq!(o.number().unwrap(), 5);
        assert!(Order::new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 10]).unwrap().number().is_err());
    }

    #[test]
    fn out_of_range_numbers() {
        assert!(matches!(Order::from_number(2, 9), Err(RasterError::NumberOutOfRange { .. })));
        assert!(matches!(Order::from_number(2, 0), Err(RasterError::NumberOutOfRange { .. })));
        assert_eq!(raster_numbers(9), Some(185_794_560));
        assert_eq!(raster_numbers(10), None);
    }

    #[test]
    fn not_a_permutation() {
        assert!(Order::new(vec![1, 1]).is_err());
        assert!(Order::new(vec![1, 3]).is_err());
        assert!(Order::new(vec![0, 2]).is_err());
    }

    #[test]
    fn matrices() {
        let m = Order::from_number(2, 6).unwrap().matrix();
        assert_eq!(m, DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -1.0, 0.0]));
        let a = Order::from_number(3, 17).unwrap();
        let x = Order::from_number(3, 33).unwrap();
        // the matrix of a·x is the product of the individual matrices
        let product = matrix_product(&x.matrix(), &a.matrix()).unwrap();
        assert_eq!(product, a.multiply(&x).unwrap().matrix());
        assert!(matrix_product(&DMatrix::zeros(2, 2), &DMatrix::zeros(3, 3)).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Order::from_number(3, 48).unwrap().to_string(), "-3,-2,-1");
    }

    proptest! {
        #[test]
        fn number_order_bijection(number in 1..=384_i64) {
            let o = Order::from_number(4, number).unwrap();
            prop_assert_eq!(o.number().unwrap(), number);
            prop_assert_eq!(o.inverse().inverse(), o.clone());
            prop_assert!(o.inverse().multiply(&o).unwrap().is_identity());
            prop_assert_eq!(o.determinant() as f64, o.matrix().determinant().round());
        }

        #[test]
        fn numeric_inverse_and_product(number in 1..=48_i64) {
            let inv = raster_inversion(number).unwrap();
            prop_assert_eq!(raster_inversion(inv).unwrap(), number);
            prop_assert_eq!(raster_multiplication(inv, number).unwrap(), 1);
        }
    }
}
