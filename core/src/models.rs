use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult, RecordKind};

/// Calories and macros (grams) for one unit of something: one piece of a
/// food, one serving of a meal, one repetition of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories: f64,
    pub fat: f64,
    pub carbs: f64,
    pub protein: f64,
}

impl NutrientProfile {
    pub const ZERO: NutrientProfile = NutrientProfile {
        calories: 0.0,
        fat: 0.0,
        carbs: 0.0,
        protein: 0.0,
    };

    #[must_use]
    pub fn new(calories: f64, fat: f64, carbs: f64, protein: f64) -> Self {
        Self {
            calories,
            fat,
            carbs,
            protein,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        let fields = [
            ("calories", self.calories),
            ("fat", self.fat),
            ("carbs", self.carbs),
            ("protein", self.protein),
        ];
        for (label, value) in fields {
            if !value.is_finite() {
                return Err(LedgerError::validation(format!(
                    "{label} must be a number (got {value})"
                )));
            }
        }
        Ok(())
    }
}

impl Add for NutrientProfile {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            fat: self.fat + rhs.fat,
            carbs: self.carbs + rhs.carbs,
            protein: self.protein + rhs.protein,
        }
    }
}

impl AddAssign for NutrientProfile {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for NutrientProfile {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + -rhs
    }
}

impl Neg for NutrientProfile {
    type Output = Self;

    fn neg(self) -> Self {
        self * -1.0
    }
}

impl Mul<f64> for NutrientProfile {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            fat: self.fat * factor,
            carbs: self.carbs * factor,
            protein: self.protein * factor,
        }
    }
}

impl Sum for NutrientProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// A food or activity catalog, keyed by normalized name. Sorted so listings
/// and the diary browser see names in order.
pub type Catalog = BTreeMap<String, NutrientProfile>;

/// Stored meal definitions keyed by normalized name.
pub type MealBook = BTreeMap<String, MealDefinition>;

/// Logged entries per calendar day, in insertion order within a day.
pub type Diary = BTreeMap<NaiveDate, Vec<DiaryEntry>>;

/// A named catalog row, as handed out by listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecord {
    pub name: String,
    #[serde(flatten)]
    pub profile: NutrientProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealLine {
    pub food: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MealDefinition {
    pub name: String,
    #[serde(default)]
    pub lines: Vec<MealLine>,
}

impl MealDefinition {
    #[must_use]
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn contents_label(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{} ({} pcs)", l.food, l.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Food,
    Meal,
    Activity,
}

impl EntryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Food => "food",
            EntryKind::Meal => "meal",
            EntryKind::Activity => "activity",
        }
    }

    #[must_use]
    pub fn record_kind(self) -> RecordKind {
        match self {
            EntryKind::Food => RecordKind::Food,
            EntryKind::Meal => RecordKind::Meal,
            EntryKind::Activity => RecordKind::Activity,
        }
    }

    /// What the quantity of an entry of this kind counts.
    #[must_use]
    pub fn unit_label(self) -> &'static str {
        match self {
            EntryKind::Food => "pcs",
            EntryKind::Meal => "servings",
            EntryKind::Activity => "reps",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" | "foods" | "f" => Ok(EntryKind::Food),
            "meal" | "meals" | "m" => Ok(EntryKind::Meal),
            "activity" | "activities" | "a" => Ok(EntryKind::Activity),
            other => Err(LedgerError::validation(format!(
                "Invalid entry type '{other}'. Valid: food, meal, activity"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: String,
    pub quantity: u32,
}

/// Trim and lower-case a catalog, meal, or local food name.
pub fn normalize_name(name: &str) -> LedgerResult<String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(LedgerError::validation("Name must not be empty"));
    }
    Ok(normalized)
}

/// Parse a count of pieces, servings, or repetitions.
pub fn parse_quantity(input: &str) -> LedgerResult<u32> {
    let trimmed = input.trim();
    let n: i64 = trimmed.parse().map_err(|_| {
        LedgerError::validation(format!(
            "Invalid quantity '{trimmed}'. Please provide a whole number"
        ))
    })?;
    validate_quantity(n)
}

pub fn validate_quantity(n: i64) -> LedgerResult<u32> {
    if n <= 0 {
        return Err(LedgerError::validation(
            "Quantity must be a positive integer",
        ));
    }
    u32::try_from(n).map_err(|_| LedgerError::validation(format!("Quantity {n} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_arithmetic() {
        let apple = NutrientProfile::new(52.0, 0.2, 14.0, 0.3);
        let doubled = apple * 2.0;
        assert_eq!(doubled, NutrientProfile::new(104.0, 0.4, 28.0, 0.6));

        let diff = doubled - apple;
        assert!((diff.calories - 52.0).abs() < 1e-9);
        assert!((diff.fat - 0.2).abs() < 1e-9);

        let total: NutrientProfile = [apple, apple, apple].into_iter().sum();
        assert!((total.calories - 156.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_validate_rejects_nan() {
        assert!(NutrientProfile::new(1.0, 2.0, 3.0, 4.0).validate().is_ok());
        assert!(NutrientProfile::new(f64::NAN, 0.0, 0.0, 0.0).validate().is_err());
        assert!(
            NutrientProfile::new(0.0, f64::INFINITY, 0.0, 0.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Apple ").unwrap(), "apple");
        assert!(normalize_name("   ").is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3").unwrap(), 3);
        assert_eq!(parse_quantity(" 12 ").unwrap(), 12);
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("-2").is_err());
        assert!(parse_quantity("1.5").is_err());
        assert!(parse_quantity("two").is_err());
        assert!(parse_quantity("99999999999").is_err());
    }

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!("Food".parse::<EntryKind>().unwrap(), EntryKind::Food);
        assert_eq!("meals".parse::<EntryKind>().unwrap(), EntryKind::Meal);
        assert_eq!("a".parse::<EntryKind>().unwrap(), EntryKind::Activity);
        assert!("drink".parse::<EntryKind>().is_err());
    }

    #[test]
    fn test_diary_entry_serializes_type_tag() {
        let entry = DiaryEntry {
            kind: EntryKind::Activity,
            name: "running".to_string(),
            quantity: 1,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "activity");
        assert_eq!(json["quantity"], 1);
    }

    #[test]
    fn test_diary_round_trips_with_date_keys() {
        let mut diary = Diary::new();
        diary.insert(
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            vec![DiaryEntry {
                kind: EntryKind::Food,
                name: "apple".to_string(),
                quantity: 2,
            }],
        );
        let json = serde_json::to_string(&diary).unwrap();
        assert!(json.contains("\"2024-06-15\""));
        let back: Diary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diary);
    }

    #[test]
    fn test_meal_contents_label() {
        let meal = MealDefinition {
            name: "fruitbowl".to_string(),
            lines: vec![
                MealLine {
                    food: "apple".to_string(),
                    quantity: 2,
                },
                MealLine {
                    food: "banana".to_string(),
                    quantity: 1,
                },
            ],
        };
        assert_eq!(meal.contents_label(), "apple (2 pcs), banana (1 pcs)");
    }
}
