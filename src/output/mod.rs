//! Output module for run summaries and candidate reports
//!
//! This module handles:
//! - Printing the per-run outcome counters
//! - Summarising the state file by status, keyword and category

pub mod stats;

pub use stats::{
    compute_statistics, load_statistics, print_statistics, CandidateStatistics, TemplateOutcomes,
};

use crate::pipeline::RunSummary;

/// Prints a finished run's counters to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");
    println!("  Keywords searched: {}", summary.keywords);
    println!("  Content items visited: {}", summary.content_items);
    println!("  New candidates discovered: {}", summary.discovered);
    if summary.already_pending > 0 {
        println!("  Already awaiting a send: {}", summary.already_pending);
    }
    println!("  Skipped by admission: {}", summary.rejected);
    println!("  Screened out: {}", summary.screened_out);
    println!("  Handle not found: {}", summary.extraction_failures);
    println!("  Messages sent: {}", summary.sent);
    println!("  Sends failed: {}", summary.failed);

    if summary.replied + summary.followed_up + summary.follow_up_failures > 0 {
        println!("  Replies detected: {}", summary.replied);
        println!("  Follow-ups sent: {}", summary.followed_up);
        println!("  Follow-ups failed: {}", summary.follow_up_failures);
    }
}
