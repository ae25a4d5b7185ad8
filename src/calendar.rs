use crate::models::NewDeadline;
use crate::parsing::ParsedRow;
use crate::validation::RowChecks;

/// Regulators a deadline can be filed against.
pub const CATEGORIES: &[&str] = &["SEBI", "NSE", "BSE", "MCX", "NCDEX", "RBI", "Other"];

pub const DEFAULT_CATEGORY: &str = "SEBI";

fn normalize_category(checks: &mut RowChecks, raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    match CATEGORIES.iter().find(|c| c.eq_ignore_ascii_case(raw)) {
        Some(category) => Some(category.to_string()),
        None => {
            checks.push(format!(
                "category must be one of {} (got: {raw})",
                CATEGORIES.join(", ")
            ));
            None
        }
    }
}

/// Title and due date are required; the description may be blank.
pub fn deadline_from_fields(
    title: &str,
    description: &str,
    due_date: &str,
    category: &str,
) -> Result<NewDeadline, Vec<String>> {
    let row: ParsedRow = [("title", title), ("due_date", due_date), ("category", category)]
        .into_iter()
        .collect();
    let mut checks = RowChecks::new(&row);
    let title = checks.required("title");
    let due_date = checks.date("due_date");
    let category = checks.required("category");
    let category = normalize_category(&mut checks, category);

    let errors = checks.into_errors();
    match (title, due_date, category) {
        (Some(title), Some(due_date), Some(category)) if errors.is_empty() => Ok(NewDeadline {
            title: title.to_string(),
            description: description.trim().to_string(),
            due_date,
            category,
        }),
        _ => Err(errors),
    }
}
