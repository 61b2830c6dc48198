use anyhow::Result;
use std::process;

use nosh_core::error::LedgerError;
use nosh_core::models::NutrientProfile;
use nosh_core::service::NoshService;

use super::helpers::{format_profile, json_error, render_catalog_table};

/// The two flat name → profile catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CatalogKind {
    Food,
    Activity,
}

impl CatalogKind {
    fn label(self) -> &'static str {
        match self {
            CatalogKind::Food => "food",
            CatalogKind::Activity => "activity",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            CatalogKind::Food => "foods",
            CatalogKind::Activity => "activities",
        }
    }
}

pub(crate) fn cmd_catalog_add(
    svc: &mut NoshService,
    kind: CatalogKind,
    name: &str,
    profile: NutrientProfile,
    json: bool,
) -> Result<()> {
    let name = match kind {
        CatalogKind::Food => svc.add_food(name, profile)?,
        CatalogKind::Activity => svc.add_activity(name, profile)?,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "name": name, "kind": kind.label(), "profile": profile })
        );
    } else {
        let label = kind.label();
        println!("Added {label}: {name} ({})", format_profile(&profile));
    }

    Ok(())
}

pub(crate) fn cmd_catalog_list(
    svc: &NoshService,
    kind: CatalogKind,
    pattern: Option<&str>,
    json: bool,
) -> Result<()> {
    let records = match kind {
        CatalogKind::Food => svc.list_foods(pattern)?,
        CatalogKind::Activity => svc.list_activities(pattern)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        let plural = kind.plural();
        match pattern {
            Some(p) => eprintln!("No {plural} match '{p}'"),
            None => eprintln!("No {plural} yet"),
        }
        process::exit(2);
    }

    println!("{}", render_catalog_table(&records));
    Ok(())
}

pub(crate) fn cmd_catalog_delete(
    svc: &mut NoshService,
    kind: CatalogKind,
    name: &str,
    json: bool,
) -> Result<()> {
    let result = match kind {
        CatalogKind::Food => svc.delete_food(name),
        CatalogKind::Activity => svc.delete_activity(name),
    };

    match result {
        Ok(name) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": name }));
            } else {
                let label = kind.label();
                println!("Deleted {label}: {name}");
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
