/// Output formatting: terminal table and JSON.
use paperrank_core::{Item, Paper, Standing};
use serde::Serialize;

use crate::bail;

#[derive(Serialize)]
struct JsonWeight<'a> {
    id: &'a str,
    weight: f64,
}

fn print_pretty<T: Serialize + ?Sized>(value: &T) {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| bail(format!("Failed to serialize output: {e}")));
    println!("{text}");
}

fn describe(item: &Item, paper: Option<&Paper>) -> String {
    let title = paper.and_then(|p| p.title.as_deref()).unwrap_or(item.id.as_str());
    match item.category.as_deref() {
        Some(cat) => format!("{title} [{cat}]"),
        None => title.to_string(),
    }
}

/// Print the pair awaiting a vote.
pub fn print_pair(a: &Item, paper_a: Option<&Paper>, b: &Item, paper_b: Option<&Paper>) {
    for (label, item, paper) in [("A", a, paper_a), ("B", b, paper_b)] {
        let r = &item.rating;
        println!(
            "{label}: {}\n   id {} | mu {:.1} | sigma {:.1} | n {}",
            describe(item, paper),
            item.id,
            r.mu,
            r.sigma,
            r.n,
        );
    }
}

/// Print standings as a formatted terminal table.
pub fn print_table(rows: &[Standing], total_comparisons: usize) {
    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(5).max(5);

    println!("  # | {:<id_width$} |      Mu |  Sigma |   N |   W |   L |   T", "Paper");
    println!("----|-{}-|---------|--------|-----|-----|-----|----", "-".repeat(id_width));

    for r in rows {
        println!(
            "{:>3} | {:<id_width$} | {:>7.1} | {:>6.1} | {:>3} | {:>3} | {:>3} | {:>3}",
            r.rank, r.id, r.mu, r.sigma, r.n, r.wins, r.losses, r.ties,
        );
    }

    println!("\n{} papers, {} ledger entries", rows.len(), total_comparisons);
}

/// Print standings as JSON.
pub fn print_json(rows: &[Standing]) {
    print_pretty(rows);
}

/// Print preference weights as a JSON array.
pub fn print_weights(weights: &[(String, f64)]) {
    let rows: Vec<JsonWeight> = weights
        .iter()
        .map(|(id, weight)| JsonWeight { id, weight: *weight })
        .collect();
    print_pretty(&rows);
}
