use anyhow::Result;
use chrono::NaiveDate;
use std::io::{self, BufRead, Write};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::diary::DiaryPicker;
use nosh_core::error::LedgerError;
use nosh_core::models::{DiaryEntry, EntryKind, parse_quantity};
use nosh_core::service::NoshService;

use super::helpers::{format_profile, json_error, nutrient_cells, parse_date, prompt_line, truncate};

#[derive(Debug, PartialEq, Eq)]
enum PickerCommand {
    Next,
    Prev,
    Pick(usize),
    Quit,
}

fn parse_picker_command(line: &str) -> Option<PickerCommand> {
    match line.trim().to_lowercase().as_str() {
        "n" | "next" => Some(PickerCommand::Next),
        "p" | "prev" => Some(PickerCommand::Prev),
        "q" | "quit" => Some(PickerCommand::Quit),
        other => other.parse().ok().map(PickerCommand::Pick),
    }
}

fn render_picker<W: Write>(out: &mut W, picker: &DiaryPicker) -> Result<()> {
    #[derive(Tabled)]
    struct PickRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Name")]
        name: String,
    }

    let rows: Vec<PickRow> = picker
        .page_rows()
        .iter()
        .map(|r| PickRow {
            idx: r.index,
            name: truncate(r.name, 40),
        })
        .collect();

    writeln!(
        out,
        "\nChoose a {} (page {}/{}):",
        picker.kind(),
        picker.current_page(),
        picker.total_pages()
    )?;
    writeln!(out, "{}", Table::new(&rows).with(Style::rounded()).to_string())?;
    writeln!(out, "Enter a number, n (next), p (prev) or q (quit).")?;
    Ok(())
}

/// Ask until a positive whole number is given. `None` at end of input.
fn prompt_quantity<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    kind: EntryKind,
) -> Result<Option<u32>> {
    let prompt = format!("Quantity ({}): ", kind.unit_label());
    while let Some(line) = prompt_line(input, out, &prompt)? {
        match parse_quantity(&line) {
            Ok(n) => return Ok(Some(n)),
            Err(e) => writeln!(out, "{e}")?,
        }
    }
    Ok(None)
}

/// Browse one catalog, pick a name, ask for a quantity and log it on `date`.
pub(crate) fn run_log_browser<R: BufRead, W: Write>(
    svc: &mut NoshService,
    kind: EntryKind,
    date: NaiveDate,
    page_size: usize,
    input: &mut R,
    out: &mut W,
) -> Result<Option<DiaryEntry>> {
    let mut picker = svc.picker(kind, page_size)?;
    if picker.is_empty() {
        writeln!(out, "Nothing to log: no {kind} entries in your catalog yet.")?;
        return Ok(None);
    }

    render_picker(out, &picker)?;
    let name = loop {
        let Some(line) = prompt_line(input, out, "log> ")? else {
            return Ok(None);
        };
        match parse_picker_command(&line) {
            Some(PickerCommand::Next) => match picker.next().notice() {
                Some(notice) => writeln!(out, "{notice}")?,
                None => render_picker(out, &picker)?,
            },
            Some(PickerCommand::Prev) => match picker.prev().notice() {
                Some(notice) => writeln!(out, "{notice}")?,
                None => render_picker(out, &picker)?,
            },
            Some(PickerCommand::Pick(index)) => match picker.resolve(index) {
                Ok(name) => break name.to_string(),
                Err(e) => writeln!(out, "Error: {e}")?,
            },
            Some(PickerCommand::Quit) => return Ok(None),
            None => writeln!(out, "Enter a number, n, p or q.")?,
        }
    };

    let Some(quantity) = prompt_quantity(input, out, kind)? else {
        return Ok(None);
    };

    let entry = svc.log_entry(date, kind, &name, quantity)?;
    writeln!(
        out,
        "Logged {} {} of {} on {date}.",
        entry.quantity,
        kind.unit_label(),
        entry.name
    )?;
    Ok(Some(entry))
}

pub(crate) fn cmd_log(
    svc: &mut NoshService,
    kind: &str,
    date: Option<String>,
    page_size: usize,
) -> Result<()> {
    let kind: EntryKind = kind.parse()?;
    let date = parse_date(date)?;
    let stdin = io::stdin();
    run_log_browser(
        svc,
        kind,
        date,
        page_size,
        &mut stdin.lock(),
        &mut io::stdout(),
    )?;
    Ok(())
}

pub(crate) fn cmd_day(svc: &NoshService, date: Option<String>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let date = parse_date(date)?;
    let summary = svc.day_summary(date);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.lines.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    let rows: Vec<EntryRow> = summary
        .lines
        .iter()
        .map(|line| {
            let [calories, fat, carbs, protein] = match &line.contribution {
                Some(p) => nutrient_cells(p),
                None => std::array::from_fn(|_| "N/A".to_string()),
            };
            EntryRow {
                position: line.position,
                kind: line.entry.kind.to_string(),
                name: truncate(&line.entry.name, 35),
                quantity: format!("{} {}", line.entry.quantity, line.entry.kind.unit_label()),
                calories,
                fat,
                carbs,
                protein,
            }
        })
        .collect();

    println!("=== {date} ===\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("  TOTAL: {}", format_profile(&summary.total.total));
    for d in &summary.total.dangling {
        eprintln!("Note: {d}");
    }

    Ok(())
}

pub(crate) fn cmd_unlog(
    svc: &mut NoshService,
    position: usize,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    match svc.remove_entry(date, position) {
        Ok(entry) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "date": date, "position": position, "removed": entry })
                );
            } else {
                println!(
                    "Removed #{position} on {date}: {} {} x{}",
                    entry.kind, entry.name, entry.quantity
                );
            }
            Ok(())
        }
        Err(e @ LedgerError::NotFound { .. }) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("{e}");
            }
            process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
