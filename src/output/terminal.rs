// Colored terminal output for keyword lists and sentiment tables.
//
// main.rs display calls delegate here. Nothing in this module computes
// anything; it only formats what the pipeline produced.

use std::collections::BTreeMap;

use colored::Colorize;

use crate::aggregate::{AggregateReport, LabelCounts};
use crate::keywords::tfidf::RankedKeyword;

/// Display the top keywords for each bank.
pub fn display_bank_keywords(keywords: &BTreeMap<String, Vec<RankedKeyword>>) {
    if keywords.is_empty() {
        return;
    }

    println!("\n{}", "=== Top Keywords by Bank ===".bold());
    for (bank, ranked) in keywords {
        println!("\n  {}", bank.bold());
        if ranked.is_empty() {
            println!("    {}", "(no keywords)".dimmed());
            continue;
        }
        for (i, keyword) in ranked.iter().enumerate() {
            println!(
                "    {:>2}. {:<28} {}",
                i + 1,
                keyword.term,
                format!("{:.4}", keyword.score).dimmed()
            );
        }
    }
}

/// Display the count tables and mean score per rating.
pub fn display_aggregate(report: &AggregateReport) {
    let banks: Vec<(String, &LabelCounts)> =
        report.by_bank.iter().map(|(b, c)| (b.clone(), c)).collect();
    display_count_table("Sentiment by Bank", "Bank", &banks);

    let ratings: Vec<(String, &LabelCounts)> = report
        .by_rating
        .iter()
        .map(|(r, c)| (format!("{r} star"), c))
        .collect();
    display_count_table("Sentiment by Rating", "Rating", &ratings);

    println!("\n{}", "=== Mean Sentiment Score by Rating ===".bold());
    for (rating, mean) in &report.mean_score_by_rating {
        println!("  {} star  {}", rating, format_mean(*mean));
    }
    if report.unscored > 0 {
        println!(
            "  {}",
            format!("{} blank reviews not scored", report.unscored).dimmed()
        );
    }
}

fn display_count_table(title: &str, key_header: &str, rows: &[(String, &LabelCounts)]) {
    println!("\n{}", format!("=== {title} ===").bold());
    let Some((_, first)) = rows.first() else {
        println!("  {}", "(no reviews)".dimmed());
        return;
    };
    let labels = first.labels();

    let mut header = format!("  {:<32}", key_header);
    for label in &labels {
        header.push_str(&format!(" {:>9}", label));
    }
    println!("{}", header.dimmed());
    println!("  {}", "-".repeat(32 + labels.len() * 10).dimmed());

    for (key, counts) in rows {
        let mut line = format!("  {:<32}", super::truncate_chars(key, 32));
        for label in &labels {
            let cell = format!(" {:>9}", counts.get(label));
            line.push_str(&colorize_cell(label, &cell).to_string());
        }
        println!("{line}");
    }
}

/// Display which scorer produced the sentiment column, and why if it fell back.
pub fn display_scorer(scorer: &str, fallback_reason: Option<&str>) {
    match fallback_reason {
        Some(reason) => {
            println!(
                "\nSentiment scorer: {} {}",
                scorer.yellow(),
                "(model unavailable, lexicon fallback)".dimmed()
            );
            println!("  {}", super::truncate_chars(reason, 160).dimmed());
        }
        None => println!("\nSentiment scorer: {}", scorer.green()),
    }
}

/// Mean score cell; an empty rating bucket shows as n/a.
pub fn format_mean(mean: f64) -> String {
    if mean.is_nan() {
        "n/a".to_string()
    } else {
        format!("{mean:+.3}")
    }
}

fn colorize_cell(label: &str, cell: &str) -> colored::ColoredString {
    match label {
        "positive" => cell.green(),
        "negative" => cell.red(),
        "neutral" => cell.normal(),
        _ => cell.dimmed(),
    }
}
