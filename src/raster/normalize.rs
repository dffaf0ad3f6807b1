use super::{Order, RasterError, Result};

/// Copy `src`, stored in raster configuration `order`, into `dest` in
/// configuration 1. `dim[k]` is the length of array coordinate `k + 1`.
///
/// The source is read sequentially. Offset index `k` runs along coordinate
/// `|order[k]|`, upwards from 1 or, if `order[k]` is negative, downwards from
/// its length; each element goes to `Σ (I - 1)·wrap` in `dest`, where the
/// wrap of a coordinate is the product of the lengths of all faster ones.
pub fn order_normalization<T: Copy>(dest: &mut [T], src: &[T], dim: &[usize], order: &Order) -> Result<()> {
    let n = dim.len();
    if n == 0 || order.dim() != n {
        return Err(RasterError::Dimensions(format!("{n} dimensions for order {order}")))
    }
    let total: usize = dim.iter().product();
    if src.len() < total || dest.len() < total {
        return Err(RasterError::Dimensions(format!(
            "{total} elements needed, source has {}, destination {}", src.len(), dest.len())))
    }

    let coordinate: Vec<usize> = order.as_slice().iter().map(|o| o.unsigned_abs() as usize - 1).collect();
    let backwards: Vec<bool> = order.as_slice().iter().map(|&o| o < 0).collect();
    let loops: Vec<usize> = coordinate.iter().map(|&c| dim[c]).collect();
    let wrap: Vec<usize> = coordinate.iter().map(|&c| dim[..c].iter().product()).collect();

    let mut counter = vec![0_usize; n];
    for &value in &src[..total] {
        let offset: usize = (0..n).map(|k| {
            let i = if backwards[k] { loops[k] - 1 - counter[k] } else { counter[k] };
            i * wrap[k]
        }).sum();
        dest[offset] = value;
        // odometer, fastest offset index first
        for k in 0..n {
            counter[k] += 1;
            if counter[k] < loops[k] { break }
            counter[k] = 0;
        }
    }
    Ok(())
}

/// [`order_normalization`] with the configuration given by its raster number
pub fn normalization<T: Copy>(dest: &mut [T], src: &[T], dim: &[usize], raster_number: i64) -> Result<()> {
    let order = Order::from_number(dim.len(), raster_number)?;
    order_normalization(dest, src, dim, &order)
}

/// Normalize `data` in place. Configuration 1 leaves the buffer untouched,
/// anything else is staged through a copy.
pub fn normalize_in_place<T: Copy>(data: &mut [T], dim: &[usize], order: &Order) -> Result<()> {
    if order.is_identity() && order.dim() == dim.len() { return Ok(()) }
    let staging = data.to_vec();
    order_normalization(data, &staging, dim, order)
}
