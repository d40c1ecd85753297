//! Statistics generation from the state file
//!
//! This module provides functionality for summarising candidate records
//! and displaying them without opening a browser.

use crate::state::CandidateStatus;
use crate::storage::{CandidateMap, StateStore};
use crate::OutreachError;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Candidate statistics summary
#[derive(Debug, Clone, Default)]
pub struct CandidateStatistics {
    /// Total number of candidate records
    pub total: usize,

    /// Count of candidates by status
    pub by_status: HashMap<CandidateStatus, usize>,

    /// Count of candidates by the keyword that discovered them
    pub by_keyword: BTreeMap<String, usize>,

    /// Count of candidates by classification category
    pub by_category: BTreeMap<String, usize>,

    /// Contacted and replied counts per message template fingerprint
    pub by_template: BTreeMap<String, TemplateOutcomes>,

    /// Sent candidates whose follow-up window has elapsed
    pub follow_up_due: usize,

    /// Failed candidates that the next send run will retry
    pub awaiting_retry: usize,
}

/// How candidates contacted with one message template responded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateOutcomes {
    pub contacted: usize,
    pub replied: usize,
}

/// Loads statistics from a state store
pub fn load_statistics(
    store: &dyn StateStore,
    now: DateTime<Utc>,
    follow_up_window: Duration,
) -> Result<CandidateStatistics, OutreachError> {
    let candidates = store.load()?;
    Ok(compute_statistics(&candidates, now, follow_up_window))
}

/// Summarises an in-memory candidate mapping
pub fn compute_statistics(
    candidates: &CandidateMap,
    now: DateTime<Utc>,
    follow_up_window: Duration,
) -> CandidateStatistics {
    let mut stats = CandidateStatistics {
        total: candidates.len(),
        ..Default::default()
    };

    for record in candidates.values() {
        *stats.by_status.entry(record.status).or_insert(0) += 1;

        let crate::state::Source::Search { keyword } = &record.source;
        *stats.by_keyword.entry(keyword.clone()).or_insert(0) += 1;

        if let Some(category) = &record.category {
            *stats.by_category.entry(category.clone()).or_insert(0) += 1;
        }
        if let (Some(template), true) = (&record.template, record.status.is_contacted()) {
            let outcomes = stats.by_template.entry(template.clone()).or_default();
            outcomes.contacted += 1;
            if record.status == CandidateStatus::Replied {
                outcomes.replied += 1;
            }
        }
        if record.follow_up_due(now, follow_up_window) {
            stats.follow_up_due += 1;
        }
        if record.retry_eligible() {
            stats.awaiting_retry += 1;
        }
    }

    stats
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CandidateStatistics) {
    println!("=== Candidate Statistics ===\n");

    println!("Overview:");
    println!("  Total candidates: {}", stats.total);
    println!("  Awaiting retry: {}", stats.awaiting_retry);
    println!("  Due for follow-up: {}", stats.follow_up_due);
    println!();

    println!("Candidates by Status:");
    for status in CandidateStatus::all_states() {
        let count = stats.by_status.get(&status).copied().unwrap_or(0);
        let percentage = if stats.total > 0 {
            (count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.by_keyword.is_empty() {
        println!("Candidates by Keyword:");
        let mut keyword_counts: Vec<_> = stats.by_keyword.iter().collect();
        keyword_counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (keyword, count) in keyword_counts {
            println!("  {}: {}", keyword, count);
        }
        println!();
    }

    if !stats.by_category.is_empty() {
        println!("Candidates by Category:");
        for (category, count) in &stats.by_category {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if !stats.by_template.is_empty() {
        println!("Replies by Message Template:");
        for (template, outcomes) in &stats.by_template {
            println!(
                "  {}: {} / {} replied",
                template, outcomes.replied, outcomes.contacted
            );
        }
        println!();
    }

    let contacted: usize = stats
        .by_status
        .iter()
        .filter(|(status, _)| status.is_contacted())
        .map(|(_, count)| count)
        .sum();
    let replied = stats
        .by_status
        .get(&CandidateStatus::Replied)
        .copied()
        .unwrap_or(0);
    let reply_rate = if contacted > 0 {
        (replied as f64 / contacted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Reply Rate: {:.1}% ({} / {} contacted candidates replied)",
        reply_rate, replied, contacted
    );
}
