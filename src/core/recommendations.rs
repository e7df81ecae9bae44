use crate::domain::model::{Priority, Recommendation};

pub const MAX_RECOMMENDATIONS: usize = 7;

/// Turn a numbered free-text list into recommendation records.
///
/// `1. Title` starts a record; a line mentioning "priority" sets the priority; other
/// lines accumulate into the description and rationale.
pub fn parse_recommendations(text: &str) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = Vec::new();
    let mut current: Option<Recommendation> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(title) = numbered_title(line) {
            if let Some(rec) = current.take() {
                recommendations.push(rec);
            }
            current = Some(Recommendation {
                title,
                description: String::new(),
                priority: Priority::Medium,
                rationale: String::new(),
                impact: String::new(),
            });
            continue;
        }

        let Some(rec) = current.as_mut() else {
            continue;
        };

        let lower = line.to_lowercase();
        if lower.contains("priority") {
            if lower.contains("high") {
                rec.priority = Priority::High;
            } else if lower.contains("low") {
                rec.priority = Priority::Low;
            }
            continue;
        }

        // ASCII lowercasing keeps byte offsets aligned with `line`
        if let Some(pos) = line.to_ascii_lowercase().find("impact:") {
            rec.impact = line[pos + "impact:".len()..].trim().to_string();
        }
        rec.description.push(' ');
        rec.description.push_str(line);
        rec.rationale.push(' ');
        rec.rationale.push_str(line);
    }

    if let Some(rec) = current {
        recommendations.push(rec);
    }

    if recommendations.is_empty() {
        return fallback_recommendations(text);
    }

    for rec in &mut recommendations {
        rec.description = rec.description.trim().to_string();
        rec.rationale = rec.rationale.trim().to_string();
        if rec.description.is_empty() {
            rec.description = rec.title.clone();
        }
        if rec.rationale.is_empty() {
            rec.rationale = rec.description.clone();
        }
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

/// A line like `3. Rebalance` or `10.Trim` yields its title.
fn numbered_title(line: &str) -> Option<String> {
    let first = line.chars().next()?;
    if !first.is_ascii_digit() {
        return None;
    }
    let head: String = line.chars().take(3).collect();
    if !head.contains('.') {
        return None;
    }
    let (_, rest) = line.split_once('.')?;
    Some(rest.trim().to_string())
}

fn fallback_recommendations(text: &str) -> Vec<Recommendation> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(MAX_RECOMMENDATIONS)
        .enumerate()
        .map(|(i, line)| Recommendation {
            title: format!("Recommendation {}", i + 1),
            description: line.to_string(),
            priority: Priority::Medium,
            rationale: line.to_string(),
            impact: "Portfolio optimization".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_recommendations() {
        let text = "\
Here are my recommendations:

1. Reduce banking exposure
Banks make up 40% of the book.
Priority: High
Expected impact: lower concentration risk

2. Add duration
Priority: Low

3. Review cash buffer
";

        let recs = parse_recommendations(text);
        assert_eq!(recs.len(), 3);

        assert_eq!(recs[0].title, "Reduce banking exposure");
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(
            recs[0].description,
            "Banks make up 40% of the book. Expected impact: lower concentration risk"
        );
        assert_eq!(recs[0].rationale, recs[0].description);
        assert_eq!(recs[0].impact, "lower concentration risk");

        assert_eq!(recs[1].priority, Priority::Low);
        assert_eq!(recs[1].description, "Add duration");

        assert_eq!(recs[2].priority, Priority::Medium);
        assert_eq!(recs[2].rationale, "Review cash buffer");
    }

    #[test]
    fn test_preamble_before_first_number_is_ignored() {
        let recs = parse_recommendations("Intro line\n1. Only one");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Only one");
    }

    #[test]
    fn test_caps_at_seven() {
        let text: String = (1..=9).map(|i| format!("{}. Item {}\n", i, i)).collect();
        let recs = parse_recommendations(&text);
        assert_eq!(recs.len(), 7);
        assert_eq!(recs[6].title, "Item 7");
    }

    #[test]
    fn test_two_digit_numbers() {
        let recs = parse_recommendations("10. Tenth idea");
        assert_eq!(recs[0].title, "Tenth idea");
    }

    #[test]
    fn test_unnumbered_text_falls_back() {
        let recs = parse_recommendations("Diversify more\n\nHedge currency risk");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title, "Recommendation 1");
        assert_eq!(recs[1].description, "Hedge currency risk");
        assert_eq!(recs[1].impact, "Portfolio optimization");
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_recommendations("").is_empty());
    }
}
