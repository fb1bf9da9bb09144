//! Journal statistics: mood distribution, writing streaks, word and tag counts.
//!
//! # Invariants
//! - Calendar days are UTC.
//! - The current streak ends today, or yesterday when today has no entry
//!   yet; any older last entry means a current streak of zero.

use crate::model::journal::{JournalEntry, Mood};
use crate::time::{date_of, previous_day, start_of_month};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const TOP_TAG_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalInsights {
    pub total_entries: u64,
    pub entries_this_month: u64,
    pub mood_distribution: BTreeMap<Mood, u64>,
    pub most_common_mood: Option<Mood>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_words: u64,
    pub average_words: f64,
    pub top_tags: Vec<TagCount>,
}

/// Computes insights over active entries at `now`.
pub fn compute_insights(entries: &[JournalEntry], now: i64) -> JournalInsights {
    let month_start = start_of_month(now);
    let total_entries = entries.len() as u64;
    let entries_this_month = entries
        .iter()
        .filter(|entry| entry.created_at >= month_start && entry.created_at <= now)
        .count() as u64;

    let mood_distribution = mood_distribution(entries);
    let most_common_mood = most_common_mood(&mood_distribution);

    let days: BTreeSet<NaiveDate> = entries.iter().map(|entry| date_of(entry.created_at)).collect();
    let today = date_of(now);

    let total_words: u64 = entries.iter().map(|entry| entry.word_count() as u64).sum();
    let average_words = if total_entries == 0 {
        0.0
    } else {
        crate::analytics::round_to(total_words as f64 / total_entries as f64, 1)
    };

    JournalInsights {
        total_entries,
        entries_this_month,
        mood_distribution,
        most_common_mood,
        current_streak: current_streak(&days, today),
        longest_streak: longest_streak(&days),
        total_words,
        average_words,
        top_tags: top_tags(entries, TOP_TAG_LIMIT),
    }
}

/// Counts per mood; every mood is present, possibly with zero.
pub fn mood_distribution(entries: &[JournalEntry]) -> BTreeMap<Mood, u64> {
    let mut counts: BTreeMap<Mood, u64> = Mood::ALL.iter().map(|mood| (*mood, 0)).collect();
    for entry in entries {
        *counts.entry(entry.mood).or_insert(0) += 1;
    }
    counts
}

/// Highest count wins; ties go to the mood declared first.
pub fn most_common_mood(distribution: &BTreeMap<Mood, u64>) -> Option<Mood> {
    let mut best: Option<(Mood, u64)> = None;
    for (mood, count) in distribution {
        if *count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if *count <= best_count => {}
            _ => best = Some((*mood, *count)),
        }
    }
    best.map(|(mood, _)| mood)
}

pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if days.contains(&today) {
        today
    } else {
        let yesterday = previous_day(today);
        if !days.contains(&yesterday) {
            return 0;
        }
        yesterday
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        let previous = previous_day(cursor);
        if previous == cursor {
            break;
        }
        cursor = previous;
    }
    streak
}

pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut last: Option<NaiveDate> = None;
    for day in days {
        run = match last {
            Some(previous) if previous.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        last = Some(*day);
    }
    longest
}

/// Most used tags, ties broken alphabetically.
pub fn top_tags(entries: &[JournalEntry], limit: usize) -> Vec<TagCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for entry in entries {
        for tag in &entry.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    ranked.truncate(limit);
    ranked
}
