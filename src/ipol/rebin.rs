use ndarray::{s, Array2, ArrayView2};

use super::Dummy;

/// Combine blocks of `bin1 x bin2` pixels into one. Dummy pixels are left
/// out; a block without valid pixels becomes a dummy. With `average` the
/// block mean is written, otherwise the block sum. Incomplete blocks at the
/// upper edges are dropped. Bin factors below 1 are treated as 1.
pub fn rebin2(data: ArrayView2<f32>, dummy: Dummy, (bin1, bin2): (usize, usize), average: bool) -> Array2<f32> {
    let (b1, b2) = (bin1.max(1), bin2.max(1));
    let (dim2, dim1) = data.dim();
    Array2::from_shape_fn((dim2 / b2, dim1 / b1), |(j2, j1)| {
        let block = data.slice(s![j2 * b2..(j2 + 1) * b2, j1 * b1..(j1 + 1) * b1]);
        let (sum, count) = block.iter()
            .filter(|&&v| !dummy.is_dummy(v))
            .fold((0.0_f32, 0_usize), |(s, n), &v| (s + v, n + 1));
        match (count, average) {
            (0, _)     => dummy.value,
            (n, true)  => sum / n as f32,
            (_, false) => sum,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn blocks() {
        let data = arr2(&[[ 1.0_f32,  2.0,  3.0,  4.0,  5.0],
                          [ 5.0    ,  6.0, -1.0, -1.0,  5.0],
                          [ 9.0    , 10.0, 11.0, 12.0,  5.0]]);
        let d = Dummy::new(-1.0, 0.1);
        assert_eq!(rebin2(data.view(), d, (2, 2), true),  arr2(&[[3.5_f32, 3.5]]));
        assert_eq!(rebin2(data.view(), d, (2, 2), false), arr2(&[[14.0_f32, 7.0]]));
        assert_eq!(rebin2(data.view(), d, (1, 3), false), arr2(&[[15.0_f32, 18.0, 14.0, 16.0, 15.0]]));
        assert_eq!(rebin2(data.view(), d, (0, 1), true),  data);
    }

    #[test]
    fn empty_block_is_dummy() {
        let data = arr2(&[[-1.0_f32, -1.0], [-1.0, 2.0]]);
        let d = Dummy::new(-1.0, 0.1);
        assert_eq!(rebin2(data.view(), d, (1, 1), true), data);
        assert_eq!(rebin2(data.view(), d, (2, 1), true), arr2(&[[-1.0_f32], [2.0]]));
    }
}
