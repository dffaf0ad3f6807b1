//! Read / write `f32` arrays as raw little-endian binary

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::error::{Error, Result};

const VALUE_SIZE: usize = std::mem::size_of::<f32>();

/// Write `values` one after the other
pub fn write_values(values: impl IntoIterator<Item = f32>, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for value in values {
        out.write_all(&value.to_le_bytes())?;
    }
    Ok(out.flush()?)
}

/// All values in `path`, which must hold a whole number of them
pub fn read_values(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % VALUE_SIZE != 0 {
        return Err(Error::Dimensions(format!(
            "`{}` has {} bytes, not a multiple of {VALUE_SIZE}", path.display(), bytes.len())));
    }
    Ok(bytes
        .chunks_exact(VALUE_SIZE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Read an array of `shape` (`(dim2, dim1)`), stored with axis 1 fastest
pub fn read_array(path: &Path, shape: (usize, usize)) -> Result<Array2<f32>> {
    let data = read_values(path)?;
    if data.len() != shape.0 * shape.1 {
        return Err(Error::Dimensions(format!(
            "`{}` holds {} values, expected {} x {}", path.display(), data.len(), shape.1, shape.0)));
    }
    Array2::from_shape_vec(shape, data).map_err(|e| Error::Dimensions(e.to_string()))
}

/// Write an array in memory order
pub fn write_array(array: &Array2<f32>, path: &Path) -> Result<()> {
    write_values(array.iter().copied(), path)
}
