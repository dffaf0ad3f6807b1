use std::path::PathBuf;

/// Command line interface for `regroup` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "regroup", about = "Regroup 2-D scattering images onto polar grids")]
pub (super) struct Cli {
    /// Log debug messages (`RUST_LOG` overrides)
    #[clap(short, long, global = true)]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub (super) enum Command {

    /// Run the regrouping jobs described in TOML files
    Run {
        /// Job files
        #[clap(required = true)]
        jobs: Vec<PathBuf>,

        /// Maximum number of rayon threads
        #[clap(short = 'j', long, default_value = "4")]
        threads: usize,
    },

    /// Parse job files and show the derived geometry without regrouping
    Check {
        #[clap(required = true)]
        jobs: Vec<PathBuf>,
    },

    /// Show a raster configuration given as a number or as a
    /// comma-separated signed permutation
    Raster {
        /// Number of dimensions
        #[clap(short, long, default_value = "2")]
        n: usize,

        order: String,
    },

    /// Evaluate numerical expressions, with units such as `_mm` or `_deg`
    Eval {
        #[clap(required = true)]
        expressions: Vec<String>,
    },
}
