use anyhow::{Result, bail};
use std::io::{self, BufRead, Write};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::search::{FoodSearchProvider, ImportedFood, SearchBrowser};
use nosh_core::service::NoshService;

use super::helpers::{format_profile, nutrient_cells, prompt_line, truncate};

const PAGER_HELP: &str = "\
Pager commands:
  n                                   next page
  p                                   previous page
  / <pattern>                         filter this page by name (e.g. '/ *bar*'); '/' alone clears
  a <index> <local_name> [grams]      add a result as a local food, scaled to grams (default 100)
  q                                   quit";

#[derive(Debug, PartialEq)]
enum PagerCommand {
    Next,
    Prev,
    Filter(String),
    Add {
        index: usize,
        local_name: String,
        grams: Option<f64>,
    },
    Help,
    Quit,
}

fn parse_pager_command(line: &str) -> Result<PagerCommand> {
    let line = line.trim();
    if let Some(pattern) = line.strip_prefix('/') {
        return Ok(PagerCommand::Filter(pattern.trim().to_string()));
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or("").to_lowercase();
    let args: Vec<&str> = parts.collect();

    match verb.as_str() {
        "n" | "next" => Ok(PagerCommand::Next),
        "p" | "prev" => Ok(PagerCommand::Prev),
        "q" | "quit" => Ok(PagerCommand::Quit),
        "h" | "help" | "?" => Ok(PagerCommand::Help),
        "a" | "add" => {
            let usage = "Usage: a <index> <local_name> [grams]";
            let (Some(index), Some(_)) = (args.first(), args.get(1)) else {
                bail!(usage);
            };
            let index: usize = index
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid index '{index}'. {usage}"))?;

            let name_parts = &args[1..];
            let grams = match name_parts.split_last() {
                Some((last, rest)) if !rest.is_empty() => match last.parse::<f64>() {
                    Ok(g) => Some(g),
                    Err(_) if looks_numeric(last) => {
                        bail!("Invalid grams '{last}'. Please provide a number")
                    }
                    Err(_) => None,
                },
                _ => None,
            };
            let name_parts = if grams.is_some() {
                &name_parts[..name_parts.len() - 1]
            } else {
                name_parts
            };
            Ok(PagerCommand::Add {
                index,
                local_name: name_parts.join(" "),
                grams,
            })
        }
        "" => bail!("Type 'help' for commands"),
        other => bail!("Unknown command '{other}'. Type 'help' for commands"),
    }
}

/// A token that starts like a number (and so was meant as the grams argument).
fn looks_numeric(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

fn render_page<P, W>(out: &mut W, browser: &SearchBrowser<'_, P>) -> Result<()>
where
    P: FoodSearchProvider + ?Sized,
    W: Write,
{
    #[derive(Tabled)]
    struct ResultRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Cal/100g")]
        calories: String,
        #[tabled(rename = "Fat/100g")]
        fat: String,
        #[tabled(rename = "Carbs/100g")]
        carbs: String,
        #[tabled(rename = "Protein/100g")]
        protein: String,
    }

    let total = browser.total_count();
    let page = browser.current_page();
    let pages = browser.total_pages();
    writeln!(
        out,
        "\nResults for '{}': {total} found. Page {page}/{pages}",
        browser.query()
    )?;
    if !browser.filter().is_empty() {
        writeln!(out, "Filter: {}", browser.filter())?;
    }

    let rows: Vec<ResultRow> = browser
        .displayable()
        .iter()
        .map(|r| {
            let [calories, fat, carbs, protein] = nutrient_cells(&r.per_100g);
            ResultRow {
                idx: r.index,
                name: truncate(&r.record.name, 40),
                quantity: r.record.quantity.as_deref().map_or("N/A".into(), |q| truncate(q, 15)),
                calories,
                fat,
                carbs,
                protein,
            }
        })
        .collect();

    if rows.is_empty() {
        writeln!(out, "No usable results on this page.")?;
    } else {
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
            .to_string();
        writeln!(out, "{table}")?;
    }
    Ok(())
}

/// Run the interactive pager. Returns every food imported during the session.
pub(crate) fn run_search_pager<P, R, W>(
    svc: &mut NoshService,
    provider: &P,
    query: &str,
    page_size: usize,
    input: &mut R,
    out: &mut W,
) -> Result<Vec<ImportedFood>>
where
    P: FoodSearchProvider + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut browser = SearchBrowser::open(provider, query, page_size)?;
    let mut imported = Vec::new();

    if browser.is_empty() {
        writeln!(out, "No results found for '{}'", browser.query())?;
        return Ok(imported);
    }

    render_page(out, &browser)?;
    writeln!(out, "Type 'help' for pager commands.")?;

    while let Some(line) = prompt_line(input, out, "search> ")? {
        let command = match parse_pager_command(&line) {
            Ok(c) => c,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };

        match command {
            PagerCommand::Next => match browser.next() {
                Ok(moved) => match moved.notice() {
                    Some(notice) => writeln!(out, "{notice}")?,
                    None => render_page(out, &browser)?,
                },
                Err(e) => writeln!(out, "Error: {e}")?,
            },
            PagerCommand::Prev => match browser.prev().notice() {
                Some(notice) => writeln!(out, "{notice}")?,
                None => render_page(out, &browser)?,
            },
            PagerCommand::Filter(pattern) => match browser.set_filter(&pattern) {
                Ok(()) => render_page(out, &browser)?,
                Err(e) => writeln!(out, "Error: {e}")?,
            },
            PagerCommand::Add {
                index,
                local_name,
                grams,
            } => match browser.select(index, &local_name, grams, svc) {
                Ok(food) => {
                    if food.used_default_grams {
                        writeln!(out, "Serving must be positive; using 100g.")?;
                    }
                    writeln!(
                        out,
                        "Added '{}' as '{}' ({}g): {}",
                        food.source_name,
                        food.local_name,
                        food.grams,
                        format_profile(&food.profile)
                    )?;
                    imported.push(food);
                }
                Err(e) => writeln!(out, "Error: {e}")?,
            },
            PagerCommand::Help => writeln!(out, "{PAGER_HELP}")?,
            PagerCommand::Quit => break,
        }
    }

    browser.quit();
    Ok(imported)
}

pub(crate) fn cmd_search<P: FoodSearchProvider + ?Sized>(
    svc: &mut NoshService,
    provider: &P,
    query: &str,
    page_size: usize,
    json: bool,
) -> Result<()> {
    if json {
        // Non-interactive: first page only, as JSON.
        let browser = SearchBrowser::open(provider, query, page_size)?;
        let rows: Vec<_> = browser
            .displayable()
            .iter()
            .map(|r| {
                serde_json::json!({
                    "index": r.index,
                    "name": r.record.name,
                    "quantity": r.record.quantity,
                    "per_100g": r.per_100g,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "query": browser.query(),
                "total_count": browser.total_count(),
                "page": browser.current_page(),
                "total_pages": browser.total_pages(),
                "results": rows,
            }))?
        );
        if browser.is_empty() {
            process::exit(2);
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let imported = run_search_pager(
        svc,
        provider,
        query,
        page_size,
        &mut stdin.lock(),
        &mut io::stdout(),
    )?;
    if !imported.is_empty() {
        eprintln!("{} food(s) added to your catalog.", imported.len());
    }
    Ok(())
}
