/// Paper catalog loading.
///
/// Auto-detects a JSON array of `{id, title?, category?}` objects versus plain
/// text with one `id[<TAB>category[<TAB>title]]` per line.
use std::collections::HashSet;
use std::path::Path;

use paperrank_core::Paper;
use tracing::warn;

use crate::bail;

fn non_empty(field: Option<&str>) -> Option<String> {
    field.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_line(line: &str) -> Option<Paper> {
    let mut fields = line.split('\t');
    let id = non_empty(fields.next())?;
    Some(Paper {
        id,
        category: non_empty(fields.next()),
        title: non_empty(fields.next()),
    })
}

/// Parse a catalog, dropping blank ids and keeping the first of any
/// duplicate id.
pub fn parse_papers_from_str(content: &str) -> Result<Vec<Paper>, serde_json::Error> {
    let trimmed = content.trim();
    let papers: Vec<Paper> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed.lines().filter_map(parse_line).collect()
    };

    let mut seen = HashSet::new();
    Ok(papers
        .into_iter()
        .filter_map(|mut p| {
            p.id = p.id.trim().to_string();
            if p.id.is_empty() {
                return None;
            }
            if !seen.insert(p.id.clone()) {
                warn!(id = %p.id, "duplicate paper id in catalog, keeping the first");
                return None;
            }
            Some(p)
        })
        .collect())
}

pub fn load_papers(path: &Path) -> Vec<Paper> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read papers file {}: {e}", path.display())));
    parse_papers_from_str(&content)
        .unwrap_or_else(|e| bail(format!("File looks like JSON but failed to parse: {e}")))
}
