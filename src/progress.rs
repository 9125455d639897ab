//! Progress indicators for pcmkctl.

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Clear the spinner and print a success line
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    println!("{} {}", "✓".green(), msg);
}

/// Clear the spinner and print a warning line
pub fn finish_warn(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    println!("{} {}", "⚠".yellow(), msg);
}

/// Clear the spinner and print an error line
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    eprintln!("{} {}", "✗".red(), msg);
}

/// Reports executor progress on a bar, one tick per resource
#[derive(Default)]
pub struct ApplyProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallback for ApplyProgress {
    fn on_batch_start(&mut self, count: usize) {
        let pb = ProgressBar::new(count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.bar = Some(pb);
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let line = match result {
            ApplyResult::Created => format!("  {} {id} created", "+".green()),
            ApplyResult::Modified => format!("  {} {id} modified", "~".yellow()),
            ApplyResult::Removed => format!("  {} {id} removed", "-".red()),
            ApplyResult::Skipped { reason } => format!("  {} {id} skipped ({reason})", "·".dimmed()),
            ApplyResult::Failed { error } => format!("  {} {id}: {error}", "✗".red()),
            ApplyResult::NoChange => return,
        };
        match &self.bar {
            Some(pb) => {
                pb.println(line);
                pb.inc(1);
            }
            None => println!("{line}"),
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
