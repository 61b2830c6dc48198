use crate::catalog;
use crate::error::{LedgerError, LedgerResult, RecordKind};
use crate::models::{Catalog, CatalogRecord, MealDefinition, MealLine, normalize_name, validate_quantity};
use crate::nutrition::{self, Rollup};
use crate::service::NoshService;

/// What `add_line` did to the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    Added { food: String, quantity: u32 },
    Merged { food: String, quantity: u32 },
}

/// An editing session over a private copy of one meal definition.
///
/// There is no discard: the only way out is [`MealEditor::exit`], which
/// writes the working copy over the stored meal.
#[derive(Debug)]
pub struct MealEditor {
    working: MealDefinition,
    is_new: bool,
}

impl MealEditor {
    pub(crate) fn new(working: MealDefinition, is_new: bool) -> Self {
        Self { working, is_new }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.working.name
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[must_use]
    pub fn working_copy(&self) -> &MealDefinition {
        &self.working
    }

    /// Add `pieces` of a food. The food must exist right now; a line that is
    /// already present has its quantity increased instead of being repeated.
    pub fn add_line(&mut self, food: &str, pieces: i64, foods: &Catalog) -> LedgerResult<LineChange> {
        let food = normalize_name(food)?;
        if !foods.contains_key(&food) {
            return Err(LedgerError::not_found(RecordKind::Food, food));
        }
        let pieces = validate_quantity(pieces)?;

        if let Some(line) = self.working.lines.iter_mut().find(|l| l.food == food) {
            line.quantity = line.quantity.checked_add(pieces).ok_or_else(|| {
                LedgerError::validation(format!("Quantity for '{food}' is too large"))
            })?;
            return Ok(LineChange::Merged {
                food,
                quantity: line.quantity,
            });
        }

        self.working.lines.push(MealLine {
            food: food.clone(),
            quantity: pieces,
        });
        Ok(LineChange::Added {
            food,
            quantity: pieces,
        })
    }

    /// Remove the line for `food`. `false` when the meal has no such line.
    pub fn remove_line(&mut self, food: &str) -> bool {
        let food = food.trim().to_lowercase();
        let before = self.working.lines.len();
        self.working.lines.retain(|l| l.food != food);
        self.working.lines.len() < before
    }

    pub fn list_catalog(&self, pattern: Option<&str>, foods: &Catalog) -> LedgerResult<Vec<CatalogRecord>> {
        catalog::list(foods, pattern)
    }

    #[must_use]
    pub fn total(&self, foods: &Catalog) -> Rollup {
        nutrition::meal_total(&self.working, foods)
    }

    /// End the session, committing the working copy as the stored meal.
    pub fn exit(self, service: &mut NoshService) -> LedgerResult<MealDefinition> {
        service.save_meal(self.working.clone())?;
        tracing::info!(meal = %self.working.name, lines = self.working.lines.len(), "meal saved");
        Ok(self.working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutrientProfile;

    fn service_with_fruit() -> NoshService {
        let mut svc = NoshService::new_in_memory().unwrap();
        svc.add_food("apple", NutrientProfile::new(52.0, 0.2, 14.0, 0.3))
            .unwrap();
        svc.add_food("banana", NutrientProfile::new(89.0, 0.3, 23.0, 1.1))
            .unwrap();
        svc
    }

    #[test]
    fn test_add_same_food_twice_merges() {
        let svc = service_with_fruit();
        let mut editor = MealEditor::new(MealDefinition::empty("snack"), true);

        let first = editor.add_line("apple", 2, svc.foods()).unwrap();
        assert_eq!(
            first,
            LineChange::Added {
                food: "apple".to_string(),
                quantity: 2
            }
        );
        let second = editor.add_line("Apple", 3, svc.foods()).unwrap();
        assert_eq!(
            second,
            LineChange::Merged {
                food: "apple".to_string(),
                quantity: 5
            }
        );

        let lines = &editor.working_copy().lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn test_add_unknown_food_fails() {
        let svc = service_with_fruit();
        let mut editor = MealEditor::new(MealDefinition::empty("snack"), true);
        let err = editor.add_line("mango", 1, svc.foods()).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
        assert!(editor.working_copy().lines.is_empty());
    }

    #[test]
    fn test_add_non_positive_pieces_fails() {
        let svc = service_with_fruit();
        let mut editor = MealEditor::new(MealDefinition::empty("snack"), true);
        assert!(matches!(
            editor.add_line("apple", 0, svc.foods()),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            editor.add_line("apple", -3, svc.foods()),
            Err(LedgerError::Validation(_))
        ));
        assert!(editor.working_copy().lines.is_empty());
    }

    #[test]
    fn test_remove_line() {
        let svc = service_with_fruit();
        let mut editor = MealEditor::new(MealDefinition::empty("snack"), true);
        editor.add_line("apple", 1, svc.foods()).unwrap();
        editor.add_line("banana", 1, svc.foods()).unwrap();

        assert!(editor.remove_line("APPLE"));
        assert!(!editor.remove_line("apple"));
        assert_eq!(editor.working_copy().lines.len(), 1);
        assert_eq!(editor.working_copy().lines[0].food, "banana");
    }

    #[test]
    fn test_list_catalog_filters() {
        let svc = service_with_fruit();
        let editor = MealEditor::new(MealDefinition::empty("snack"), true);
        let rows = editor.list_catalog(Some("b*"), svc.foods()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "banana");
    }

    #[test]
    fn test_exit_persists_working_copy() {
        let mut svc = service_with_fruit();
        let mut editor = svc.start_new_meal("fruitbowl").unwrap();
        editor.add_line("apple", 2, svc.foods()).unwrap();
        editor.add_line("banana", 1, svc.foods()).unwrap();
        assert!((editor.total(svc.foods()).total.calories - 193.0).abs() < 1e-9);

        let saved = editor.exit(&mut svc).unwrap();
        assert_eq!(saved.lines.len(), 2);
        assert_eq!(svc.meals()["fruitbowl"], saved);
    }

    #[test]
    fn test_editing_works_on_private_copy() {
        let mut svc = service_with_fruit();
        let mut editor = svc.start_new_meal("fruitbowl").unwrap();
        editor.add_line("apple", 1, svc.foods()).unwrap();
        editor.exit(&mut svc).unwrap();

        let mut editor = svc.start_meal_edit("fruitbowl").unwrap();
        editor.add_line("banana", 4, svc.foods()).unwrap();
        // Stored meal is untouched until exit
        assert_eq!(svc.meals()["fruitbowl"].lines.len(), 1);

        editor.exit(&mut svc).unwrap();
        assert_eq!(svc.meals()["fruitbowl"].lines.len(), 2);
    }
}
