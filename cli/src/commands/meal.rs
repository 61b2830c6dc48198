use anyhow::{Result, bail};
use std::io::{self, BufRead, Write};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::error::{LedgerError, RecordKind};
use nosh_core::meal_editor::{LineChange, MealEditor};
use nosh_core::models::{Catalog, MealDefinition};
use nosh_core::service::NoshService;

use super::helpers::{
    format_profile, json_error, nutrient_cells, prompt_line, render_catalog_table, truncate,
};

const MEAL_HELP: &str = "\
Meal editor commands:
  list [pattern]        (l)  list foods you can add, optionally filtered (e.g. 'ap*')
  add <food> <pieces>   (a)  add pieces of a food; adding it again increases the count
  delete <food>         (d)  remove a food from this meal
  show                  (s)  show this meal and its totals
  help                  (h)  show this help
  quit                  (q)  save the meal and leave";

#[derive(Debug, PartialEq, Eq)]
enum MealCommand {
    List(Option<String>),
    Add { food: String, pieces: i64 },
    Delete(String),
    Show,
    Help,
    Quit,
}

fn parse_meal_command(line: &str) -> Result<MealCommand> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(v, r)| (v, r.trim()));

    match verb.to_lowercase().as_str() {
        "list" | "l" => Ok(MealCommand::List(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "add" | "a" => {
            let Some((food, pieces)) = rest.rsplit_once(char::is_whitespace) else {
                bail!("Usage: add <food> <pieces>");
            };
            let food = food.trim();
            if food.is_empty() {
                bail!("Usage: add <food> <pieces>");
            }
            let pieces: i64 = pieces.parse().map_err(|_| {
                anyhow::anyhow!("Invalid pieces '{pieces}'. Please provide a whole number")
            })?;
            Ok(MealCommand::Add {
                food: food.to_string(),
                pieces,
            })
        }
        "delete" | "d" => {
            if rest.is_empty() {
                bail!("Usage: delete <food>");
            }
            Ok(MealCommand::Delete(rest.to_string()))
        }
        "show" | "s" => Ok(MealCommand::Show),
        "help" | "h" | "?" => Ok(MealCommand::Help),
        "quit" | "q" | "exit" => Ok(MealCommand::Quit),
        "" => bail!("Type 'help' for commands"),
        other => bail!("Unknown command '{other}'. Type 'help' for commands"),
    }
}

fn render_meal_table(meal: &MealDefinition, foods: &Catalog) -> String {
    #[derive(Tabled)]
    struct LineRow {
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Pieces")]
        pieces: u32,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let rows: Vec<LineRow> = meal
        .lines
        .iter()
        .map(|line| {
            let [calories, fat, carbs, protein] = match foods.get(&line.food) {
                Some(p) => nutrient_cells(&(*p * f64::from(line.quantity))),
                None => std::array::from_fn(|_| "N/A".to_string()),
            };
            LineRow {
                food: truncate(&line.food, 40),
                pieces: line.quantity,
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

fn show_meal<W: Write>(out: &mut W, editor: &MealEditor, foods: &Catalog) -> Result<()> {
    let meal = editor.working_copy();
    if meal.lines.is_empty() {
        writeln!(out, "Meal '{}' is empty.", meal.name)?;
        return Ok(());
    }
    writeln!(out, "{}", render_meal_table(meal, foods))?;
    let rollup = editor.total(foods);
    writeln!(out, "Total: {}", format_profile(&rollup.total))?;
    for d in &rollup.dangling {
        writeln!(out, "Note: {d}")?;
    }
    Ok(())
}

/// Read editor commands until `quit` or end of input.
fn edit_until_quit<R: BufRead, W: Write>(
    editor: &mut MealEditor,
    foods: &Catalog,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let verb = if editor.is_new() { "Creating" } else { "Editing" };
    writeln!(out, "{verb} meal '{}'. Type 'help' for commands.", editor.name())?;
    if !editor.is_new() {
        show_meal(out, editor, foods)?;
    }

    let prompt = format!("meal:{}> ", editor.name());
    while let Some(line) = prompt_line(input, out, &prompt)? {
        let command = match parse_meal_command(&line) {
            Ok(c) => c,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };

        match command {
            MealCommand::List(pattern) => {
                match editor.list_catalog(pattern.as_deref(), foods) {
                    Ok(records) if records.is_empty() => writeln!(out, "No matching foods.")?,
                    Ok(records) => writeln!(out, "{}", render_catalog_table(&records))?,
                    Err(e) => writeln!(out, "Error: {e}")?,
                }
            }
            MealCommand::Add { food, pieces } => match editor.add_line(&food, pieces, foods) {
                Ok(LineChange::Added { food, quantity }) => {
                    writeln!(out, "Added {food} ({quantity} pcs).")?;
                }
                Ok(LineChange::Merged { food, quantity }) => {
                    writeln!(out, "Updated {food} to {quantity} pcs.")?;
                }
                Err(e) => writeln!(out, "Error: {e}")?,
            },
            MealCommand::Delete(food) => {
                if editor.remove_line(&food) {
                    writeln!(out, "Removed {}.", food.trim().to_lowercase())?;
                } else {
                    let missing = LedgerError::not_found(RecordKind::MealLine, food.trim().to_lowercase());
                    writeln!(out, "{missing}")?;
                }
            }
            MealCommand::Show => show_meal(out, editor, foods)?,
            MealCommand::Help => writeln!(out, "{MEAL_HELP}")?,
            MealCommand::Quit => break,
        }
    }
    Ok(())
}

/// Drive a meal editor from `input` until `quit` or end of input, then save.
/// The working copy is saved even when reading input or writing output fails;
/// that I/O error is returned after the save.
pub(crate) fn run_meal_editor<R: BufRead, W: Write>(
    svc: &mut NoshService,
    mut editor: MealEditor,
    input: &mut R,
    out: &mut W,
) -> Result<MealDefinition> {
    let session = edit_until_quit(&mut editor, svc.foods(), input, out);
    let saved = editor.exit(svc)?;
    session?;
    writeln!(
        out,
        "Saved meal '{}' with {} item(s).",
        saved.name,
        saved.lines.len()
    )?;
    Ok(saved)
}

pub(crate) fn cmd_meal_add(svc: &mut NoshService, name: &str) -> Result<()> {
    let editor = svc.start_new_meal(name)?;
    let stdin = io::stdin();
    run_meal_editor(svc, editor, &mut stdin.lock(), &mut io::stdout())?;
    Ok(())
}

pub(crate) fn cmd_meal_edit(svc: &mut NoshService, name: &str) -> Result<()> {
    let editor = match svc.start_meal_edit(name) {
        Ok(editor) => editor,
        Err(e @ LedgerError::NotFound { .. }) => {
            eprintln!("{e}. Use 'meal add' to create it.");
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };
    let stdin = io::stdin();
    run_meal_editor(svc, editor, &mut stdin.lock(), &mut io::stdout())?;
    Ok(())
}

pub(crate) fn cmd_meal_list(svc: &NoshService, pattern: Option<&str>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "Meal")]
        name: String,
        #[tabled(rename = "Contents")]
        contents: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let meals = svc.list_meals(pattern)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meals)?);
        return Ok(());
    }

    if meals.is_empty() {
        eprintln!("No meals found");
        process::exit(2);
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .map(|m| {
            let [calories, fat, carbs, protein] = nutrient_cells(&m.total.total);
            MealRow {
                name: m.name.clone(),
                contents: truncate(&m.contents, 50),
                calories,
                fat,
                carbs,
                protein,
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    for m in &meals {
        for d in &m.total.dangling {
            eprintln!("Note: meal '{}': {d}", m.name);
        }
    }

    Ok(())
}

pub(crate) fn cmd_meal_delete(svc: &mut NoshService, name: &str, json: bool) -> Result<()> {
    match svc.delete_meal(name) {
        Ok(name) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": name }));
            } else {
                println!("Deleted meal: {name}");
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
