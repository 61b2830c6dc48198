use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::service::NoshService;

use super::helpers::nutrient_cells;

pub(crate) fn cmd_summary(svc: &NoshService, days: u32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let today = Local::now().date_naive();
    let summary = svc.period_summary(today, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let Some(summary) = summary else {
        eprintln!("No entries in the last {days} days");
        process::exit(2);
    };

    let mut rows: Vec<SummaryRow> = summary
        .days
        .iter()
        .map(|d| {
            let [calories, fat, carbs, protein] = nutrient_cells(&d.total);
            SummaryRow {
                date: d.date.to_string(),
                calories,
                fat,
                carbs,
                protein,
            }
        })
        .collect();

    let [calories, fat, carbs, protein] = nutrient_cells(&summary.average);
    rows.push(SummaryRow {
        date: "Average".to_string(),
        calories,
        fat,
        carbs,
        protein,
    });

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!(
        "Averaged over {} of the last {days} days (days without entries are not counted).",
        summary.days_with_entries
    );
    for d in &summary.dangling {
        eprintln!("Note: {d}");
    }

    Ok(())
}
