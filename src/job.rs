//! One regrouping job: read, correct, regroup, write

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::image::Image;
use crate::io::{load_input, save_output};
use crate::utils::{group_digits, timing::Steps};

/// Regroup the input of `config` without writing anything
pub fn regroup(config: &Config) -> Result<Image> {
    let mut steps = Steps::new();
    let mut input = load_input(config)?;
    steps.done("read input");

    if let Some(polarization) = config.polarization(&input.header)? {
        input.correct_polarization(&polarization)?;
        steps.done("polarization correction");
    }

    let output = config.output_header(&input.header)?;
    let image = config.regroup().run(config.driver, &input, output)?;
    steps.done("regrouping");

    let valid = image.data.iter().filter(|&&v| !image.header.dummy.is_dummy(v)).count();
    info!("{} of {} output pixels set", group_digits(valid), group_digits(image.data.len()));
    Ok(image)
}

/// Run the job described by `config` and write its result
#[instrument(skip_all, fields(driver = %config.driver, output = %config.output.file.display()))]
pub fn run(config: &Config) -> Result<()> {
    let image = regroup(config)?;
    save_output(config, &image)
}
