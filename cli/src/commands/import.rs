use std::path::Path;

use anyhow::Result;

use nosh_core::service::NoshService;
use nosh_core::yaml_import::{import_legacy, read_legacy_dir};

pub(crate) fn cmd_import_yaml(
    svc: &mut NoshService,
    dir: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let data = read_legacy_dir(dir)?;
    let summary = import_legacy(svc, &data, dry_run)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "dry_run": dry_run, "summary": summary })
        );
        return Ok(());
    }

    if dry_run {
        println!("Dry run: no changes made.\n");
    } else {
        println!("Import complete.\n");
    }
    println!(
        "  Foods:       {} new, {} already present",
        summary.foods_created, summary.foods_skipped
    );
    println!(
        "  Activities:  {} new, {} already present",
        summary.activities_created, summary.activities_skipped
    );
    println!(
        "  Meals:       {} new, {} already present",
        summary.meals_created, summary.meals_skipped
    );
    println!(
        "  Diary:       {} entries over {} dates, {} dates already logged",
        summary.diary_entries, summary.dates_imported, summary.dates_skipped
    );
    if !summary.rejected.is_empty() {
        eprintln!("\nSkipped {} invalid record(s):", summary.rejected.len());
        for r in &summary.rejected {
            eprintln!("  {r}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_yaml_dry_run_then_commit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("foods.yaml"),
            "apple:\n  calories: 52\n  fat: 0.2\n  carbs: 14\n  protein: 0.3\n",
        )
        .unwrap();

        let mut svc = NoshService::new_in_memory().unwrap();
        cmd_import_yaml(&mut svc, dir.path(), true, true).unwrap();
        assert!(svc.foods().is_empty());

        cmd_import_yaml(&mut svc, dir.path(), false, false).unwrap();
        assert!(svc.foods().contains_key("apple"));
    }
}
