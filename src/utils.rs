use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info};

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

pub mod timing {

    use super::*;

    /// Logs the time spent in consecutive steps of a job
    pub struct Steps {
        previous: Instant,
    }

    impl Steps {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Log the time elapsed since the previous step, restart the timer
        pub fn done(&mut self, step: &str) {
            info!("{step}: {} ms", group_digits(self.previous.elapsed().as_millis()));
            self.previous = Instant::now();
        }
    }
}

/// Progress bar over the job files given on the command line, with a record
/// of the jobs that failed
pub struct Jobs {
    bar: ProgressBar,
    failed: Vec<PathBuf>,
}

impl Jobs {

    pub fn new(files: &[PathBuf]) -> Self {
        // A single job has nothing to count
        let bar = if files.len() > 1 {
            ProgressBar::new(files.len() as u64)
        } else {
            ProgressBar::with_draw_target(Some(files.len() as u64), ProgressDrawTarget::hidden())
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("Job: {msg}\n[{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})")
        {
            bar.set_style(style);
        }
        Self { bar, failed: vec![] }
    }

    pub fn start(&self, file: &Path) {
        self.bar.set_message(file.display().to_string());
        self.bar.tick();
    }

    pub fn done<T, E: std::fmt::Display>(&mut self, file: &Path, result: &Result<T, E>) {
        if let Err(e) = result {
            error!(job = %file.display(), "{e:#}");
            self.failed.push(file.to_path_buf());
        }
        self.bar.inc(1);
    }

    /// Finish the bar and return the jobs which failed
    pub fn finish(self) -> Vec<PathBuf> {
        self.bar.finish_with_message("<finished>");
        let n = self.bar.length().unwrap_or(0);
        info!("{} / {} jobs succeeded", group_digits(n as usize - self.failed.len()), group_digits(n));
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn digits_are_grouped() {
        assert_eq!(group_digits(1234567), "1,234,567");
        assert_eq!(group_digits(12), "12");
    }

    #[test]
    fn failed_jobs_are_reported() {
        let files = vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")];
        let mut jobs = Jobs::new(&files);
        jobs.start(&files[0]);
        jobs.done(&files[0], &Ok::<_, String>(()));
        jobs.start(&files[1]);
        jobs.done(&files[1], &Err::<(), _>("broken".to_string()));
        assert_eq!(jobs.finish(), vec![PathBuf::from("b.toml")]);
    }
}
