use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::catalog;
use crate::db::{Collection, Database, encode_collection};
use crate::diary::DiaryPicker;
use crate::error::{LedgerError, LedgerResult, RecordKind};
use crate::meal_editor::MealEditor;
use crate::models::{
    Catalog, CatalogRecord, Diary, DiaryEntry, EntryKind, MealBook, MealDefinition,
    NutrientProfile, normalize_name,
};
use crate::nutrition::{self, PeriodAverage, Rollup};

/// A collection whose stored body could not be read at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadWarning {
    pub collection: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealSummary {
    pub name: String,
    pub contents: String,
    pub total: Rollup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayLine {
    pub position: usize,
    pub entry: DiaryEntry,
    /// Signed contribution, `None` when the name no longer resolves.
    pub contribution: Option<NutrientProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub lines: Vec<DayLine>,
    pub total: Rollup,
}

/// Owns the store and every in-memory collection.
///
/// Mutations are applied to a copy, saved, and only then swapped in, so a
/// failed save leaves the in-memory state as it was.
pub struct NoshService {
    db: Database,
    foods: Catalog,
    meals: MealBook,
    activities: Catalog,
    diary: Diary,
    load_warnings: Vec<LoadWarning>,
}

fn load<T>(db: &Database, kind: Collection, warnings: &mut Vec<LoadWarning>) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let loaded = db.load_collection(kind)?;
    if let Some(message) = loaded.recovered {
        warnings.push(LoadWarning {
            collection: kind.as_str(),
            message,
        });
    }
    Ok(loaded.data)
}

fn commit<T: Serialize>(db: &Database, kind: Collection, slot: &mut T, next: T) -> LedgerResult<()> {
    db.save_collection(kind, &next)
        .map_err(LedgerError::Persistence)?;
    *slot = next;
    tracing::debug!(collection = kind.as_str(), "collection saved");
    Ok(())
}

impl NoshService {
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::from_database(Database::open(db_path)?)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::from_database(Database::open_in_memory()?)
    }

    fn from_database(db: Database) -> Result<Self> {
        let mut load_warnings = Vec::new();
        let foods = load(&db, Collection::Foods, &mut load_warnings)?;
        let meals = load(&db, Collection::Meals, &mut load_warnings)?;
        let activities = load(&db, Collection::Activities, &mut load_warnings)?;
        let diary = load(&db, Collection::Diary, &mut load_warnings)?;
        Ok(Self {
            db,
            foods,
            meals,
            activities,
            diary,
            load_warnings,
        })
    }

    #[must_use]
    pub fn foods(&self) -> &Catalog {
        &self.foods
    }

    #[must_use]
    pub fn meals(&self) -> &MealBook {
        &self.meals
    }

    #[must_use]
    pub fn activities(&self) -> &Catalog {
        &self.activities
    }

    #[must_use]
    pub fn diary(&self) -> &Diary {
        &self.diary
    }

    #[must_use]
    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.load_warnings
    }

    // --- Foods ---

    pub fn add_food(&mut self, name: &str, profile: NutrientProfile) -> LedgerResult<String> {
        let mut next = self.foods.clone();
        let name = catalog::insert(&mut next, RecordKind::Food, name, profile)?;
        commit(&self.db, Collection::Foods, &mut self.foods, next)?;
        tracing::info!(food = %name, "food added");
        Ok(name)
    }

    /// Meals and diary entries naming the food are left alone and resolve as
    /// dangling from now on.
    pub fn delete_food(&mut self, name: &str) -> LedgerResult<String> {
        let mut next = self.foods.clone();
        let name = catalog::remove(&mut next, RecordKind::Food, name)?;
        commit(&self.db, Collection::Foods, &mut self.foods, next)?;
        tracing::info!(food = %name, "food deleted");
        Ok(name)
    }

    pub fn list_foods(&self, pattern: Option<&str>) -> LedgerResult<Vec<CatalogRecord>> {
        catalog::list(&self.foods, pattern)
    }

    // --- Activities ---

    pub fn add_activity(&mut self, name: &str, profile: NutrientProfile) -> LedgerResult<String> {
        let mut next = self.activities.clone();
        let name = catalog::insert(&mut next, RecordKind::Activity, name, profile)?;
        commit(&self.db, Collection::Activities, &mut self.activities, next)?;
        tracing::info!(activity = %name, "activity added");
        Ok(name)
    }

    pub fn delete_activity(&mut self, name: &str) -> LedgerResult<String> {
        let mut next = self.activities.clone();
        let name = catalog::remove(&mut next, RecordKind::Activity, name)?;
        commit(&self.db, Collection::Activities, &mut self.activities, next)?;
        tracing::info!(activity = %name, "activity deleted");
        Ok(name)
    }

    pub fn list_activities(&self, pattern: Option<&str>) -> LedgerResult<Vec<CatalogRecord>> {
        catalog::list(&self.activities, pattern)
    }

    // --- Meals ---

    /// Open an editor on a fresh, empty meal. Refuses a name already in use.
    pub fn start_new_meal(&self, name: &str) -> LedgerResult<MealEditor> {
        let name = normalize_name(name)?;
        if self.meals.contains_key(&name) {
            return Err(LedgerError::already_exists(RecordKind::Meal, name));
        }
        Ok(MealEditor::new(MealDefinition::empty(&name), true))
    }

    /// Open an editor on a copy of an existing meal.
    pub fn start_meal_edit(&self, name: &str) -> LedgerResult<MealEditor> {
        let name = normalize_name(name)?;
        let meal = self
            .meals
            .get(&name)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Meal, name))?;
        Ok(MealEditor::new(meal.clone(), false))
    }

    pub(crate) fn save_meal(&mut self, meal: MealDefinition) -> LedgerResult<()> {
        let mut next = self.meals.clone();
        next.insert(meal.name.clone(), meal);
        commit(&self.db, Collection::Meals, &mut self.meals, next)
    }

    pub fn delete_meal(&mut self, name: &str) -> LedgerResult<String> {
        let name = normalize_name(name)?;
        if !self.meals.contains_key(&name) {
            return Err(LedgerError::not_found(RecordKind::Meal, name));
        }
        let mut next = self.meals.clone();
        next.remove(&name);
        commit(&self.db, Collection::Meals, &mut self.meals, next)?;
        tracing::info!(meal = %name, "meal deleted");
        Ok(name)
    }

    pub fn list_meals(&self, pattern: Option<&str>) -> LedgerResult<Vec<MealSummary>> {
        let filter = catalog::NameFilter::new(pattern.unwrap_or(""))?;
        Ok(self
            .meals
            .values()
            .filter(|meal| filter.matches(&meal.name))
            .map(|meal| MealSummary {
                name: meal.name.clone(),
                contents: meal.contents_label(),
                total: nutrition::meal_total(meal, &self.foods),
            })
            .collect())
    }

    // --- Diary ---

    /// Names of one catalog kind, sorted.
    #[must_use]
    pub fn names(&self, kind: EntryKind) -> Vec<String> {
        match kind {
            EntryKind::Food => self.foods.keys().cloned().collect(),
            EntryKind::Meal => self.meals.keys().cloned().collect(),
            EntryKind::Activity => self.activities.keys().cloned().collect(),
        }
    }

    fn contains(&self, kind: EntryKind, name: &str) -> bool {
        match kind {
            EntryKind::Food => self.foods.contains_key(name),
            EntryKind::Meal => self.meals.contains_key(name),
            EntryKind::Activity => self.activities.contains_key(name),
        }
    }

    pub fn picker(&self, kind: EntryKind, page_size: usize) -> LedgerResult<DiaryPicker> {
        DiaryPicker::new(kind, self.names(kind), page_size)
    }

    /// Append an entry to `date`, creating the date on first use.
    pub fn log_entry(
        &mut self,
        date: NaiveDate,
        kind: EntryKind,
        name: &str,
        quantity: u32,
    ) -> LedgerResult<DiaryEntry> {
        let name = normalize_name(name)?;
        if !self.contains(kind, &name) {
            return Err(LedgerError::not_found(kind.record_kind(), name));
        }
        if quantity == 0 {
            return Err(LedgerError::validation("Quantity must be a positive integer"));
        }

        let entry = DiaryEntry {
            kind,
            name,
            quantity,
        };
        let mut next = self.diary.clone();
        next.entry(date).or_default().push(entry.clone());
        commit(&self.db, Collection::Diary, &mut self.diary, next)?;
        tracing::info!(%date, kind = %kind, name = %entry.name, quantity, "diary entry logged");
        Ok(entry)
    }

    #[must_use]
    pub fn day_entries(&self, date: NaiveDate) -> &[DiaryEntry] {
        self.diary.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    /// Remove the entry at 1-based `position`. The date itself is kept, empty.
    pub fn remove_entry(&mut self, date: NaiveDate, position: usize) -> LedgerResult<DiaryEntry> {
        let count = self.day_entries(date).len();
        if count == 0 {
            return Err(LedgerError::not_found(RecordKind::DiaryDate, date.to_string()));
        }
        if position == 0 || position > count {
            return Err(LedgerError::not_found(
                RecordKind::DiaryEntry,
                format!("#{position} on {date}"),
            ));
        }

        let mut next = self.diary.clone();
        let removed = next.entry(date).or_default().remove(position - 1);
        commit(&self.db, Collection::Diary, &mut self.diary, next)?;
        tracing::info!(%date, position, name = %removed.name, "diary entry removed");
        Ok(removed)
    }

    #[must_use]
    pub fn day_summary(&self, date: NaiveDate) -> DaySummary {
        let entries = self.day_entries(date);
        let lines = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| DayLine {
                position: i + 1,
                entry: entry.clone(),
                contribution: nutrition::entry_contribution(
                    entry,
                    &self.foods,
                    &self.meals,
                    &self.activities,
                )
                .map(|r| r.total),
            })
            .collect();
        DaySummary {
            date,
            lines,
            total: nutrition::day_total(entries, &self.foods, &self.meals, &self.activities),
        }
    }

    /// Average over the `days` dates ending at `today`. `Ok(None)` when none
    /// of them has entries.
    pub fn period_summary(&self, today: NaiveDate, days: u32) -> LedgerResult<Option<PeriodAverage>> {
        if days == 0 {
            return Err(LedgerError::validation("Number of days must be at least 1"));
        }
        let window = nutrition::trailing_window(today, days);
        Ok(nutrition::period_average(
            &window,
            &self.diary,
            &self.foods,
            &self.meals,
            &self.activities,
        ))
    }

    /// Replace whole collections at once. All four are written in one
    /// transaction and swapped in only after it commits.
    pub(crate) fn replace_collections(
        &mut self,
        foods: Catalog,
        meals: MealBook,
        activities: Catalog,
        diary: Diary,
    ) -> LedgerResult<()> {
        let batch = [
            (Collection::Foods, encode_collection(Collection::Foods, &foods)),
            (Collection::Meals, encode_collection(Collection::Meals, &meals)),
            (
                Collection::Activities,
                encode_collection(Collection::Activities, &activities),
            ),
            (Collection::Diary, encode_collection(Collection::Diary, &diary)),
        ]
        .into_iter()
        .map(|(kind, body)| body.map(|b| (kind, b)))
        .collect::<Result<Vec<_>>>()
        .map_err(LedgerError::Persistence)?;

        self.db
            .save_collections(&batch)
            .map_err(LedgerError::Persistence)?;
        self.foods = foods;
        self.meals = meals;
        self.activities = activities;
        self.diary = diary;
        Ok(())
    }
}
