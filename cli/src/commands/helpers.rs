use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::models::{CatalogRecord, NutrientProfile};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Print `prompt` and read one line. `None` at end of input.
pub(crate) fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).context("Failed to read input")? == 0 {
        writeln!(out)?;
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Four right-aligned nutrient cells, without negative zeros.
pub(crate) fn nutrient_cells(p: &NutrientProfile) -> [String; 4] {
    [
        format!("{:.2}", no_neg_zero(p.calories)),
        format!("{:.2}", no_neg_zero(p.fat)),
        format!("{:.2}", no_neg_zero(p.carbs)),
        format!("{:.2}", no_neg_zero(p.protein)),
    ]
}

pub(crate) fn format_profile(p: &NutrientProfile) -> String {
    let [cal, fat, carbs, protein] = nutrient_cells(p);
    format!("{cal} kcal | F:{fat}g C:{carbs}g P:{protein}g")
}

pub(crate) fn render_catalog_table(records: &[CatalogRecord]) -> String {
    #[derive(Tabled)]
    struct CatalogRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let rows: Vec<CatalogRow> = records
        .iter()
        .map(|r| {
            let [calories, fat, carbs, protein] = nutrient_cells(&r.profile);
            CatalogRow {
                name: truncate(&r.name, 40),
                calories,
                fat,
                carbs,
                protein,
            }
        })
        .collect();

    Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string()
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
