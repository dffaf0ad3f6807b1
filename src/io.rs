//! Loading and saving the images of a regrouping job

pub mod raw;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::image::Image;

/// Read the input image (and variance) of `config`, bring it into
/// orientation 1 and bin it. Binning sums blocks, so variances stay valid.
pub fn load_input(config: &Config) -> Result<Image> {
    let header = config.input_header();
    let shape = header.shape();
    debug!(file = %config.input.file.display(), ?shape, "reading input");
    let mut image = Image::new(header, raw::read_array(&config.input.file, shape)?)?;
    if let Some(path) = &config.input.variance {
        debug!(file = %path.display(), "reading input variance");
        image = image.with_variance(raw::read_array(path, shape)?)?;
    }
    image.normalize_orientation()?;
    if let Some(bin) = config.input.bin {
        image = image.rebin(bin, false);
    }
    Ok(image)
}

/// Write the regrouped image, and its variance if both the image has one
/// and a file is configured for it
pub fn save_output(config: &Config, image: &Image) -> Result<()> {
    raw::write_array(&image.data, &config.output.file)?;
    match (&config.output.variance, &image.variance) {
        (Some(path), Some(var)) => raw::write_array(var, path)?,
        (Some(path), None) => warn!(file = %path.display(), "no variance to write"),
        _ => {}
    }
    Ok(())
}
