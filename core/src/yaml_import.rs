//! Import of the plain YAML files kept by the older command-line tracker:
//! `foods.yaml`, `activities.yaml`, `meals.yaml` and `diary.yaml`, all in one
//! directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::LedgerResult;
use crate::models::{
    Catalog, DiaryEntry, EntryKind, MealDefinition, MealLine, NutrientProfile, normalize_name,
    validate_quantity,
};
use crate::service::NoshService;

/// Legacy nutrient values. Any that are missing count as zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LegacyProfile {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub protein: f64,
}

impl From<LegacyProfile> for NutrientProfile {
    fn from(p: LegacyProfile) -> Self {
        NutrientProfile::new(p.calories, p.fat, p.carbs, p.protein)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMealLine {
    pub food: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDiaryEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct LegacyData {
    pub foods: BTreeMap<String, LegacyProfile>,
    pub activities: BTreeMap<String, LegacyProfile>,
    pub meals: BTreeMap<String, Vec<LegacyMealLine>>,
    pub diary: BTreeMap<String, Vec<LegacyDiaryEntry>>,
}

/// What an import would do / did.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct YamlImportSummary {
    pub foods_created: usize,
    pub foods_skipped: usize,
    pub activities_created: usize,
    pub activities_skipped: usize,
    pub meals_created: usize,
    pub meals_skipped: usize,
    pub diary_entries: usize,
    pub dates_imported: usize,
    pub dates_skipped: usize,
    /// One message per record that could not be imported at all.
    pub rejected: Vec<String>,
}

/// Missing files and empty documents read as empty collections.
fn read_yaml<T: DeserializeOwned + Default>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "legacy file absent");
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: Option<T> = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(parsed.unwrap_or_default())
}

pub fn read_legacy_dir(dir: &Path) -> Result<LegacyData> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    Ok(LegacyData {
        foods: read_yaml(dir, "foods.yaml")?,
        activities: read_yaml(dir, "activities.yaml")?,
        meals: read_yaml(dir, "meals.yaml")?,
        diary: read_yaml(dir, "diary.yaml")?,
    })
}

/// Add new catalog records, returning (created, skipped).
fn merge_catalog(
    target: &mut Catalog,
    incoming: &BTreeMap<String, LegacyProfile>,
    label: &str,
    rejected: &mut Vec<String>,
) -> (usize, usize) {
    let (mut created, mut skipped) = (0, 0);
    for (raw_name, legacy) in incoming {
        let profile = NutrientProfile::from(*legacy);
        let name = match normalize_name(raw_name).and_then(|n| profile.validate().map(|()| n)) {
            Ok(n) => n,
            Err(e) => {
                rejected.push(format!("{label} '{raw_name}': {e}"));
                continue;
            }
        };
        if target.contains_key(&name) {
            skipped += 1;
        } else {
            target.insert(name, profile);
            created += 1;
        }
    }
    (created, skipped)
}

fn convert_meal(
    name: String,
    lines: &[LegacyMealLine],
    rejected: &mut Vec<String>,
) -> MealDefinition {
    let mut meal = MealDefinition::empty(&name);
    for line in lines {
        let food = match normalize_name(&line.food) {
            Ok(f) => f,
            Err(e) => {
                rejected.push(format!("meal '{name}' line '{}': {e}", line.food));
                continue;
            }
        };
        let quantity = match validate_quantity(line.quantity) {
            Ok(q) => q,
            Err(e) => {
                rejected.push(format!("meal '{name}' line '{food}': {e}"));
                continue;
            }
        };
        match meal.lines.iter_mut().find(|l| l.food == food) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => meal.lines.push(MealLine { food, quantity }),
        }
    }
    meal
}

fn convert_diary_entry(entry: &LegacyDiaryEntry) -> LedgerResult<DiaryEntry> {
    Ok(DiaryEntry {
        kind: entry.kind.parse::<EntryKind>()?,
        name: normalize_name(&entry.name)?,
        quantity: validate_quantity(entry.quantity)?,
    })
}

/// Merge legacy records into the ledger. Names already present are skipped,
/// never overwritten; dates that already have entries are skipped whole.
/// With `dry_run` nothing is written.
pub fn import_legacy(
    service: &mut NoshService,
    data: &LegacyData,
    dry_run: bool,
) -> LedgerResult<YamlImportSummary> {
    let mut summary = YamlImportSummary::default();
    let mut foods = service.foods().clone();
    let mut activities = service.activities().clone();
    let mut meals = service.meals().clone();
    let mut diary = service.diary().clone();

    (summary.foods_created, summary.foods_skipped) =
        merge_catalog(&mut foods, &data.foods, "food", &mut summary.rejected);
    (summary.activities_created, summary.activities_skipped) =
        merge_catalog(&mut activities, &data.activities, "activity", &mut summary.rejected);

    for (raw_name, lines) in &data.meals {
        let name = match normalize_name(raw_name) {
            Ok(n) => n,
            Err(e) => {
                summary.rejected.push(format!("meal '{raw_name}': {e}"));
                continue;
            }
        };
        if meals.contains_key(&name) {
            summary.meals_skipped += 1;
            continue;
        }
        let meal = convert_meal(name.clone(), lines, &mut summary.rejected);
        meals.insert(name, meal);
        summary.meals_created += 1;
    }

    let mut seen_dates = BTreeSet::new();
    for (raw_date, entries) in &data.diary {
        let Ok(date) = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d") else {
            summary.rejected.push(format!("diary date '{raw_date}': expected YYYY-MM-DD"));
            continue;
        };
        if diary.get(&date).is_some_and(|e| !e.is_empty()) && !seen_dates.contains(&date) {
            summary.dates_skipped += 1;
            continue;
        }
        seen_dates.insert(date);

        let day = diary.entry(date).or_default();
        for entry in entries {
            match convert_diary_entry(entry) {
                Ok(e) => {
                    day.push(e);
                    summary.diary_entries += 1;
                }
                Err(e) => summary
                    .rejected
                    .push(format!("diary {date} '{}': {e}", entry.name)),
            }
        }
    }
    summary.dates_imported = seen_dates.len();

    if dry_run {
        return Ok(summary);
    }

    service.replace_collections(foods, meals, activities, diary)?;
    tracing::info!(
        foods = summary.foods_created,
        activities = summary.activities_created,
        meals = summary.meals_created,
        diary_entries = summary.diary_entries,
        "legacy data imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    const FOODS: &str = "\
Apple:
  calories: 52
  fat: 0.2
  carbs: 14
  protein: 0.3
banana:
  calories: 89
  fat: 0.3
  carbs: 23
  protein: 1.1
water:
  calories: 0
";

    const MEALS: &str = "\
fruitbowl:
- food: apple
  quantity: 2
- food: banana
  quantity: 1
- food: apple
  quantity: 1
";

    const ACTIVITIES: &str = "\
running:
  calories: 300
  fat: 0
  carbs: 0
  protein: 0
";

    const DIARY: &str = "\
2024-06-15:
- type: meal
  name: fruitbowl
  quantity: 1
- type: activity
  name: running
  quantity: 1
2024-06-16:
- type: drink
  name: tea
  quantity: 1
";

    fn write_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    fn full_dir() -> tempfile::TempDir {
        write_dir(&[
            ("foods.yaml", FOODS),
            ("meals.yaml", MEALS),
            ("activities.yaml", ACTIVITIES),
            ("diary.yaml", DIARY),
        ])
    }

    #[test]
    fn test_read_missing_and_empty_files() {
        let dir = write_dir(&[("foods.yaml", ""), ("meals.yaml", "~\n")]);
        let data = read_legacy_dir(dir.path()).unwrap();
        assert!(data.foods.is_empty());
        assert!(data.meals.is_empty());
        assert!(data.activities.is_empty());
        assert!(data.diary.is_empty());
    }

    #[test]
    fn test_read_rejects_malformed_yaml() {
        let dir = write_dir(&[("foods.yaml", "apple: [unclosed\n")]);
        let err = read_legacy_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("foods.yaml"));
    }

    #[test]
    fn test_read_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_legacy_dir(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_import_full() {
        let dir = full_dir();
        let data = read_legacy_dir(dir.path()).unwrap();
        let mut svc = NoshService::new_in_memory().unwrap();

        let summary = import_legacy(&mut svc, &data, false).unwrap();
        assert_eq!(summary.foods_created, 3);
        assert_eq!(summary.activities_created, 1);
        assert_eq!(summary.meals_created, 1);
        assert_eq!(summary.diary_entries, 2);
        assert_eq!(summary.dates_imported, 2);
        assert_eq!(summary.rejected.len(), 1);
        assert!(summary.rejected[0].contains("drink"));

        assert!(svc.foods().contains_key("apple"));
        assert_eq!(svc.foods()["water"], NutrientProfile::ZERO);
        let bowl = &svc.meals()["fruitbowl"];
        assert_eq!(bowl.lines.len(), 2);
        assert_eq!(bowl.lines[0].quantity, 3);

        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let day = svc.day_summary(date);
        // 3 apples + 1 banana - running
        assert!((day.total.total.calories - (156.0 + 89.0 - 300.0)).abs() < 1e-9);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = full_dir();
        let data = read_legacy_dir(dir.path()).unwrap();
        let mut svc = NoshService::new_in_memory().unwrap();

        let summary = import_legacy(&mut svc, &data, true).unwrap();
        assert_eq!(summary.foods_created, 3);
        assert!(svc.foods().is_empty());
        assert!(svc.meals().is_empty());
        assert!(svc.diary().is_empty());
    }

    #[test]
    fn test_existing_names_are_skipped() {
        let dir = full_dir();
        let data = read_legacy_dir(dir.path()).unwrap();
        let mut svc = NoshService::new_in_memory().unwrap();
        svc.add_food("apple", NutrientProfile::new(1.0, 0.0, 0.0, 0.0))
            .unwrap();

        let summary = import_legacy(&mut svc, &data, false).unwrap();
        assert_eq!(summary.foods_created, 2);
        assert_eq!(summary.foods_skipped, 1);
        assert!((svc.foods()["apple"].calories - 1.0).abs() < f64::EPSILON);

        // Running it again adds nothing
        let again = import_legacy(&mut svc, &data, false).unwrap();
        assert_eq!(again.foods_created, 0);
        assert_eq!(again.meals_skipped, 1);
        assert_eq!(again.dates_skipped, 1);
        assert_eq!(again.diary_entries, 0);
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(svc.day_entries(date).len(), 2);
    }

    #[test]
    fn test_bad_meal_quantity_rejected_line() {
        let dir = write_dir(&[("meals.yaml", "snack:\n- food: apple\n  quantity: 0\n")]);
        let data = read_legacy_dir(dir.path()).unwrap();
        let mut svc = NoshService::new_in_memory().unwrap();

        let summary = import_legacy(&mut svc, &data, false).unwrap();
        assert_eq!(summary.meals_created, 1);
        assert_eq!(summary.rejected.len(), 1);
        assert!(svc.meals()["snack"].lines.is_empty());
    }

    #[test]
    fn test_convert_diary_entry_errors() {
        let bad = LegacyDiaryEntry {
            kind: "food".to_string(),
            name: "apple".to_string(),
            quantity: -1,
        };
        assert!(matches!(
            convert_diary_entry(&bad),
            Err(LedgerError::Validation(_))
        ));
    }
}
