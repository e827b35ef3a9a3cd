//! Session-scoped recipe collection with a selection set.

#[cfg(test)]
#[path = "recipes_test.rs"]
mod recipes_test;

use crate::net::types::{Recipe, RecipeResultPayload};

#[derive(Clone, Debug, Default)]
pub struct RecipeCollection {
    pub recipes: Vec<Recipe>,
    /// Selected recipe ids, in selection order.
    pub selected: Vec<String>,
    /// A submission is in flight.
    pub loading: bool,
}

impl RecipeCollection {
    /// Insert `recipe`, or replace the one with the same id in place.
    pub fn upsert(&mut self, recipe: Recipe) {
        match self.recipes.iter_mut().find(|existing| existing.id == recipe.id) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
    }

    pub fn select(&mut self, id: &str, selected: bool) {
        if selected {
            if !self.is_selected(id) {
                self.selected.push(id.to_owned());
            }
        } else {
            self.selected.retain(|existing| existing != id);
        }
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|existing| existing == id)
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected recipes in collection order.
    #[must_use]
    pub fn selected_recipes(&self) -> Vec<&Recipe> {
        self.recipes.iter().filter(|recipe| self.is_selected(&recipe.id)).collect()
    }

    /// Remove a recipe and drop it from the selection.
    pub fn remove(&mut self, id: &str) {
        self.recipes.retain(|recipe| recipe.id != id);
        self.selected.retain(|existing| existing != id);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Apply a result batch: clears `loading` and upserts on success.
    ///
    /// Returns the number of recipes added or replaced.
    pub fn apply_result(&mut self, result: &RecipeResultPayload) -> usize {
        self.loading = false;
        if !result.status.is_success() {
            return 0;
        }
        for recipe in &result.list {
            self.upsert(recipe.clone());
        }
        result.list.len()
    }
}
