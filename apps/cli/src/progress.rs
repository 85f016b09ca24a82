//! Terminal progress reporting.

use indicatif::{ProgressBar, ProgressStyle};

use portscout_core::{ProgressReporter, RunSummary, UrlOutcome};
use portscout_shared::{PipelineRecord, ResolutionSource};

/// CLI progress reporter using an indicatif bar.
///
/// Per-URL lines are printed to stdout with the bar suspended, so they never
/// tear the bar and still show up when stdout is not a terminal.
pub(crate) struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    fn line(&self, text: impl AsRef<str>) {
        self.bar.suspend(|| println!("{}", text.as_ref()));
    }
}

impl ProgressReporter for CliProgress {
    fn run_started(&self, pending: usize, already_processed: usize) {
        self.bar.set_length(pending as u64);
        self.line(format!("Already processed  : {already_processed}"));
        self.line(format!("Remaining to scrape: {pending}"));
    }

    fn url_started(&self, url: &str, current: usize, total: usize) {
        self.bar.set_message(url.to_string());
        self.line(format!("\nProcessing [{current}/{total}]: {url}"));
    }

    fn company_saved(&self, record: &PipelineRecord, source: ResolutionSource) {
        let website = if record.company_website.is_empty() {
            "no website"
        } else {
            record.company_website.as_str()
        };
        self.line(format!(
            "  + {} ({website}, via {source}) - {} article(s)",
            record.company_name,
            record.article_count()
        ));
    }

    fn url_finished(&self, _url: &str, outcome: &UrlOutcome) {
        match outcome {
            UrlOutcome::Completed { companies: 0 } => {
                self.line("  no companies found");
            }
            UrlOutcome::Completed { .. } => {}
            UrlOutcome::Skipped { stage, reason } => {
                self.line(format!("  skipped while {stage}: {reason}"));
            }
            UrlOutcome::Fatal(err) => {
                self.line(format!("  fatal: {err}"));
            }
        }
        self.bar.inc(1);
    }

    fn done(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        println!();
        println!("  Run complete");
        println!("  Processed: {}", summary.completed + summary.skipped);
        println!("  Completed: {}", summary.completed);
        println!("  Skipped:   {}", summary.skipped);
        println!("  Records:   {}", summary.records);
        println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
        println!();
    }
}
