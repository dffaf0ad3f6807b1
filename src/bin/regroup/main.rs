use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use saxsregroup::config::read_config_file;
use saxsregroup::raster::Order;
use saxsregroup::utils::Jobs;
use saxsregroup::{job, logger};

mod cli;
use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logger::init(args.debug);
    match args.command {
        Command::Run { jobs, threads } => run(&jobs, threads),
        Command::Check { jobs } => check(&jobs),
        Command::Raster { n, order } => raster(n, &order),
        Command::Eval { expressions } => eval(&expressions),
    }
}

fn run(files: &[PathBuf], threads: usize) -> anyhow::Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("Could not start the thread pool")?;
    let mut jobs = Jobs::new(files);
    for file in files {
        jobs.start(file);
        let result = read_config_file(file)
            .and_then(|config| job::run(&config))
            .with_context(|| format!("Job `{}` failed", file.display()));
        jobs.done(file, &result);
    }
    let failed = jobs.finish();
    if !failed.is_empty() {
        bail!("{} of {} jobs failed", failed.len(), files.len());
    }
    Ok(())
}

fn check(files: &[PathBuf]) -> anyhow::Result<()> {
    for file in files {
        let config = read_config_file(file)
            .with_context(|| format!("Could not read `{}`", file.display()))?;
        println!("{}:\n{}", file.display(), config.describe());
    }
    Ok(())
}

fn raster(n: usize, text: &str) -> anyhow::Result<()> {
    let order = Order::parse(n, text).with_context(|| format!("Invalid raster configuration `{text}`"))?;
    let inverse = order.inverse();
    println!("order       {order}");
    println!("number      {}", order.number()?);
    println!("determinant {}", order.determinant());
    println!("inverse     {inverse} (number {})", inverse.number()?);
    print!("matrix{}", order.matrix());
    Ok(())
}

fn eval(expressions: &[String]) -> anyhow::Result<()> {
    for text in expressions {
        let value = units::expr::str2double(text).with_context(|| format!("Cannot evaluate `{text}`"))?;
        info!(expression = %text, value);
        println!("{value}");
    }
    Ok(())
}
