//! Roll-ups of nutrient totals: foods into meals, meals and foods and
//! activities into diary days, days into period averages.
//!
//! Everything here resolves names against the catalogs at call time. Nothing
//! is cached, so deleting a catalog entry shows up on the next roll-up as a
//! [`DanglingReference`] instead of a stale number.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Catalog, Diary, DiaryEntry, EntryKind, MealBook, MealDefinition, NutrientProfile};

/// A stored name that no longer resolves in its catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub kind: EntryKind,
    pub name: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.record_kind();
        let name = &self.name;
        write!(f, "{kind} '{name}' no longer exists; skipped")
    }
}

/// A total plus every reference that had to be skipped to compute it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Rollup {
    pub total: NutrientProfile,
    pub dangling: Vec<DanglingReference>,
}

impl Rollup {
    fn skip(&mut self, kind: EntryKind, name: &str) {
        tracing::warn!(kind = %kind, name, "dangling reference skipped during aggregation");
        self.dangling.push(DanglingReference {
            kind,
            name: name.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total: NutrientProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodAverage {
    pub average: NutrientProfile,
    pub days_with_entries: usize,
    pub days: Vec<DayTotal>,
    pub dangling: Vec<DanglingReference>,
}

#[must_use]
pub fn meal_total(meal: &MealDefinition, foods: &Catalog) -> Rollup {
    let mut rollup = Rollup::default();
    for line in &meal.lines {
        match foods.get(&line.food) {
            Some(profile) => rollup.total += *profile * f64::from(line.quantity),
            None => rollup.skip(EntryKind::Food, &line.food),
        }
    }
    rollup
}

/// Contribution of a single diary entry, signed: activities are negative.
/// `None` when the entry's name does not resolve.
#[must_use]
pub fn entry_contribution(
    entry: &DiaryEntry,
    foods: &Catalog,
    meals: &MealBook,
    activities: &Catalog,
) -> Option<Rollup> {
    let quantity = f64::from(entry.quantity);
    match entry.kind {
        EntryKind::Food => foods.get(&entry.name).map(|p| Rollup {
            total: *p * quantity,
            dangling: Vec::new(),
        }),
        EntryKind::Meal => meals.get(&entry.name).map(|m| {
            let inner = meal_total(m, foods);
            Rollup {
                total: inner.total * quantity,
                dangling: inner.dangling,
            }
        }),
        EntryKind::Activity => activities.get(&entry.name).map(|p| Rollup {
            total: -(*p * quantity),
            dangling: Vec::new(),
        }),
    }
}

#[must_use]
pub fn day_total(
    entries: &[DiaryEntry],
    foods: &Catalog,
    meals: &MealBook,
    activities: &Catalog,
) -> Rollup {
    let mut rollup = Rollup::default();
    for entry in entries {
        match entry_contribution(entry, foods, meals, activities) {
            Some(part) => {
                rollup.total += part.total;
                rollup.dangling.extend(part.dangling);
            }
            None => rollup.skip(entry.kind, &entry.name),
        }
    }
    rollup
}

/// Average of the daily totals over the days in `dates` that have entries.
/// Days without entries do not count toward the denominator. `None` when no
/// day in the window has any entry.
#[must_use]
pub fn period_average(
    dates: &[NaiveDate],
    diary: &Diary,
    foods: &Catalog,
    meals: &MealBook,
    activities: &Catalog,
) -> Option<PeriodAverage> {
    let mut days = Vec::new();
    let mut dangling = Vec::new();

    for date in dates {
        let Some(entries) = diary.get(date).filter(|e| !e.is_empty()) else {
            continue;
        };
        let rollup = day_total(entries, foods, meals, activities);
        dangling.extend(rollup.dangling);
        days.push(DayTotal {
            date: *date,
            total: rollup.total,
        });
    }

    if days.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = days.len() as f64;
    let sum: NutrientProfile = days.iter().map(|d| d.total).sum();

    Some(PeriodAverage {
        average: sum * (1.0 / count),
        days_with_entries: days.len(),
        days,
        dangling,
    })
}

/// The `days` calendar dates ending at `today`, oldest first.
#[must_use]
pub fn trailing_window(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .map(|i| today - chrono::Duration::days(i64::from(i)))
        .collect()
}
