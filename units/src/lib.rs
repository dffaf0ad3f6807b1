//! Physical quantities used to describe detector geometry, plus the unit-aware
//! expression evaluator used to read user-supplied numbers.

pub use uom;
pub use uom::si::Quantity;
pub use uom::si::f64::{Angle, Length, Ratio};

pub mod expr;
mod table;

mod units {
  pub use uom::si::{length::{meter, millimeter, micrometer, nanometer, angstrom},
                    angle ::{radian, degree},
                    ratio ::ratio,
  };
}

// Making values from float literals is very long-winded in uom, so provide
// some pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f64) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(m        Length      meter);
wrap!(mm       Length millimeter);
wrap!(um       Length micrometer);
wrap!(nm       Length  nanometer);
wrap!(angstrom Length   angstrom);
wrap!(radian   Angle      radian);
wrap!(degree   Angle      degree);
wrap!(ratio    Ratio       ratio);

// Reverse direction of the above.
pub fn m_ (x: Length) -> f64 { x.get::<units::meter>() }
pub fn nm_(x: Length) -> f64 { x.get::<units::nanometer>() }

pub fn radian_(x: Angle) -> f64 { x.get::<units::radian>() }
pub fn ratio_ (x: Ratio) -> f64 { x.get::<units::ratio>() }

/// Reference wavelength of the Saxs reference system
pub fn wavelength0() -> Length { nm(1.0) }

/// Dimensionless wavenumber `λ₀/λ` used by all geometry transforms
pub fn wavenumber(wavelength: Length) -> f64 { ratio_(wavelength0() / wavelength) }

/// Evaluate `text` as an expression whose value is a length in meters
pub fn parse_length(text: &str) -> Result<Length, expr::Error> {
  expr::str2double(text).map(m)
}

/// Evaluate `text` as an expression whose value is an angle in radians
pub fn parse_angle(text: &str) -> Result<Angle, expr::Error> {
  expr::str2double(text).map(radian)
}

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}
