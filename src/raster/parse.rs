use units::expr::str2long;

use super::{Order, RasterError, Result};

impl Order {

    /// Read an order from `n` comma-separated indices, or from a single raster
    /// number (negative for the inverse configuration). Each item may be an
    /// expression.
    ///
    /// For `n = 1` only the indices `1`, `-1` and the raster numbers `1`, `2`
    /// are accepted. Extra items yield [`RasterError::TooManyParameters`]
    /// carrying the order read so far.
    pub fn parse(n: usize, text: &str) -> Result<Self> {
        let items: Vec<i64> = text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str2long)
            .collect::<std::result::Result<_, _>>()?;

        let Some(&first) = items.first() else {
            return Err(RasterError::NotEnoughParameters { expected: n, got: 0 })
        };

        let in_range = |v: i64| 0 < v.abs() && v.unsigned_abs() as usize <= n;
        let single_number = items.len() == 1 && n > 1 && first != 0;

        if single_number || !in_range(first) {
            let raster_number = if n > 1 || first > 0 { first } else { 0 };
            if raster_number == 0 {
                return Err(RasterError::OutsideRange { index: first, n })
            }
            let order = Order::from_number(n, raster_number)
                .map_err(|_| RasterError::Conversion(raster_number))?;
            return if items.len() > 1 { Err(RasterError::TooManyParameters(order)) }
                   else                { Ok(order) }
        }

        let mut values = Vec::with_capacity(n);
        let mut used = vec![false; n + 1];
        for &v in items.iter().take(n) {
            if !in_range(v) { return Err(RasterError::OutsideRange { index: v, n }) }
            let a = v.unsigned_abs() as usize;
            if used[a] { return Err(RasterError::ExplicitDuplication(v)) }
            used[a] = true;
            values.push(v);
        }
        if values.len() < n {
            let got = values.len();
            // implicit identity for the missing positions
            for i in got + 1..=n {
                if used[i] { return Err(RasterError::ImplicitDuplication(i)) }
            }
            return Err(RasterError::NotEnoughParameters { expected: n, got })
        }
        let order = Order(values);
        if items.len() > n { Err(RasterError::TooManyParameters(order)) }
        else               { Ok(order) }
    }

    /// Raster number read with [`Order::parse`]
    pub fn parse_number(n: usize, text: &str) -> Result<i64> {
        Self::parse(n, text)?.number()
    }
}
