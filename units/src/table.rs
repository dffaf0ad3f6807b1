//! Named constants and units known to the expression evaluator. All values are
//! in SI base units, angles in radian.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::f64::consts::PI;

const PREFIXES: [(&str, f64); 20] = [
  ("Y", 1e24), ("Z", 1e21), ("E", 1e18), ("P", 1e15), ("T", 1e12),
  ("G", 1e9 ), ("M", 1e6 ), ("k", 1e3 ), ("h", 1e2 ), ("" , 1.0 ),
  ("d", 1e-1), ("c", 1e-2), ("m", 1e-3), ("u", 1e-6), ("n", 1e-9),
  ("p", 1e-12), ("f", 1e-15), ("a", 1e-18), ("z", 1e-21), ("y", 1e-24),
];

// Physical constants (CODATA 2002)
pub const BOLTZMANN:          f64 = 1.3806505e-23;
pub const ELECTRON_MASS:      f64 = 9.1093826e-31;
pub const PROTON_MASS:        f64 = 1.67262171e-27;
pub const DEUTERON_MASS:      f64 = 3.34358335e-27;
pub const NEUTRON_MASS:       f64 = 1.67492728e-27;
pub const AVOGADRO:           f64 = 6.0221415e23;
pub const ELECTRON_RADIUS:    f64 = 2.817940325e-15;
pub const LIGHT_SPEED:        f64 = 2.99792458e8;
pub const ELEMENTARY_CHARGE:  f64 = 1.60217653e-19;
pub const PLANCK:             f64 = 6.6260693e-34;
pub const GRAVITATION:        f64 = 6.6742e-11;
pub const STANDARD_GRAVITY:   f64 = 9.80665;
pub const EULER_GAMMA:        f64 = 0.577215664901532861;

struct Table(HashMap<String, f64>);

impl Table {
  fn insert(&mut self, name: &str, value: f64) { self.0.insert(name.to_string(), value); }

  /// `base` with every SI prefix
  fn unit(&mut self, base: &str, value: f64) {
    for (prefix, factor) in PREFIXES {
      self.insert(&format!("{prefix}{base}"), factor * value);
    }
  }

  /// squares of `base` with every SI prefix, written `<prefix><base>2`
  fn unit2(&mut self, base: &str, value: f64) {
    for (prefix, factor) in PREFIXES {
      self.insert(&format!("{prefix}{base}2"), (factor * value).powi(2));
    }
  }

  fn unit3(&mut self, base: &str, value: f64) {
    for (prefix, factor) in PREFIXES {
      self.insert(&format!("{prefix}{base}3"), (factor * value).powi(3));
    }
  }
}

fn build() -> Table {
  let mut t = Table(HashMap::new());
  let deg = PI / 180.0;
  let inch = 2.54e-2;
  let lb = 0.45359237;
  let lbf = lb * STANDARD_GRAVITY;
  let u0 = 4e-7 * PI;

  t.insert("inf", f64::MAX);
  t.insert("gamma", EULER_GAMMA);
  t.insert("pi", PI);
  t.insert("e", std::f64::consts::E);

  // angles
  for (name, value) in [("rad", 1.0), ("deg", deg), ("gon", PI / 200.0)] {
    t.insert(name, value);
    t.insert(&format!("m{name}"), 1e-3 * value);
    t.insert(&format!("u{name}"), 1e-6 * value);
  }
  t.insert("arcmin", deg / 60.0);
  t.insert("arcsec", deg / 3600.0);
  t.insert("sr", 1.0);

  // physical constants
  t.insert("k",  BOLTZMANN);
  t.insert("me", ELECTRON_MASS);
  t.insert("mp", PROTON_MASS);
  t.insert("md", DEUTERON_MASS);
  t.insert("mn", NEUTRON_MASS);
  t.insert("NA", AVOGADRO);
  t.insert("re", ELECTRON_RADIUS);
  t.insert("c",  LIGHT_SPEED);
  t.insert("ec", ELEMENTARY_CHARGE);
  t.insert("h",  PLANCK);
  t.insert("gN", GRAVITATION);
  t.insert("ga", STANDARD_GRAVITY);
  t.insert("u0", u0);
  t.insert("e0", 1.0 / (u0 * LIGHT_SPEED * LIGHT_SPEED));

  // electromagnetic units
  for base in ["C", "V", "F", "Ohm", "S", "T", "Wb", "H", "A"] { t.unit(base, 1.0); }
  t.unit("G", 1e-4);

  // time and frequency
  t.unit("s", 1.0);
  t.insert("min", 60.0);
  t.insert("hr", 3600.0);
  t.insert("d", 86400.0);
  t.unit2("s", 1.0);
  t.unit("Hz", 1.0);

  // length, speed, area, volume
  t.unit("m", 1.0);
  t.insert("in", inch);
  t.insert("ft", 0.3048);
  t.insert("yd", 0.9144);
  t.insert("mile", 1609.344);
  t.insert("sm", 1852.0);
  t.insert("kn", 1852.0 / 3600.0);
  t.unit2("m", 1.0);
  t.insert("b", 1e-28);
  t.insert("a", 1e2);
  t.insert("ha", 1e4);
  t.unit3("m", 1.0);
  t.unit("l", 1e-3);

  // mass and amount
  t.unit("g", 1e-3);
  t.insert("lb", lb);
  t.insert("oz", 0.0283495);
  t.insert("amu", 1.66053886e-27);
  t.unit("mol", 1.0);

  // energy, power, temperature
  t.unit("J", 1.0);
  t.unit("eV", ELEMENTARY_CHARGE);
  t.unit("cal", 4.1868);
  t.insert("erg", 1e-7);
  t.unit("W", 1.0);
  t.insert("K", 1.0);
  t.insert("mK", 1e-3);
  t.insert("uK", 1e-6);
  t.insert("degK", 1.0);
  t.insert("degC", 1.0);
  t.insert("degF", 5.0 / 9.0);

  // force and pressure
  t.unit("N", 1.0);
  t.insert("p", 9.80665e-3);
  t.insert("lbf", lbf);
  t.insert("pdl", 0.138255);
  t.insert("dyn", 1e-5);
  t.unit("Pa", 1.0);
  t.unit("bar", 1e5);
  t.insert("atm", 1.01325e5);
  t.insert("at", 0.980665e5);
  t.insert("psi", lbf / inch / inch);
  t.insert("Torr", 133.3224);

  // bytes, decimal and binary multiples
  t.insert("Byte", 1.0);
  for (n, prefix) in (1..).zip(["k", "M", "G", "T", "P", "E", "Z", "Y"]) {
    t.insert(&format!("{prefix}Byte"), 1e3_f64.powi(n));
    let binary = if prefix == "k" { "K" } else { prefix };
    t.insert(&format!("{binary}iByte"), 1024_f64.powi(n));
  }
  t
}

static TABLE: OnceLock<Table> = OnceLock::new();

/// Value of a named constant or unit
pub(crate) fn lookup(name: &str) -> Option<f64> {
  TABLE.get_or_init(build).0.get(name).copied()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;
  use float_eq::assert_float_eq;

  #[rstest(/**/ name   , value,
           case("m"     , 1.0),
           case("mm"    , 1e-3),
           case("nm"    , 1e-9),
           case("um2"   , 1e-12),
           case("cm3"   , 1e-6),
           case("ms"    , 1e-3),
           case("keV"   , 1e3 * ELEMENTARY_CHARGE),
           case("deg"   , PI / 180.0),
           case("mrad"  , 1e-3),
           case("kByte" , 1e3),
           case("MByte" , 1e6),
           case("KiByte", 1024.0),
           case("GiByte", 1024.0 * 1024.0 * 1024.0),
           case("degF"  , 5.0 / 9.0),
  )]
  fn known_units(name: &str, value: f64) {
    assert_float_eq!(lookup(name).unwrap(), value, r2nd <= 1e-12);
  }

  #[test]
  fn unknown_name() {
    assert_eq!(lookup("furlong"), None);
  }
}
