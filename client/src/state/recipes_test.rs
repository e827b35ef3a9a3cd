use super::*;
use crate::net::types::ResultStatus;

fn recipe(id: &str, name: &str) -> Recipe {
    Recipe {
        id: id.to_owned(),
        name: name.to_owned(),
        url: format!("http://x/{id}"),
        image: None,
        ingredients: Vec::new(),
        sharer: None,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn result(status: &str, list: Vec<Recipe>) -> RecipeResultPayload {
    RecipeResultPayload { status: ResultStatus::from(status.to_owned()), request: None, list }
}

#[test]
fn upsert_replaces_by_id_in_place() {
    let mut recipes = RecipeCollection::default();
    recipes.upsert(recipe("r1", "Soup"));
    recipes.upsert(recipe("r2", "Bread"));
    recipes.upsert(recipe("r1", "Better Soup"));

    let names: Vec<&str> = recipes.recipes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Better Soup", "Bread"]);
}

#[test]
fn selection_is_a_set_returned_in_collection_order() {
    let mut recipes = RecipeCollection::default();
    for id in ["r1", "r2", "r3"] {
        recipes.upsert(recipe(id, id));
    }
    recipes.select("r3", true);
    recipes.select("r1", true);
    recipes.select("r1", true);
    assert_eq!(recipes.selected.len(), 2);

    let ids: Vec<&str> = recipes.selected_recipes().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r3"]);

    recipes.select("r3", false);
    assert!(!recipes.is_selected("r3"));
    recipes.clear_selection();
    assert!(recipes.selected_recipes().is_empty());
}

#[test]
fn remove_also_deselects() {
    let mut recipes = RecipeCollection::default();
    recipes.upsert(recipe("r1", "Soup"));
    recipes.select("r1", true);
    recipes.remove("r1");
    assert!(recipes.recipes.is_empty());
    assert!(recipes.selected.is_empty());
}

#[test]
fn successful_result_adds_recipes_and_clears_loading() {
    let mut recipes = RecipeCollection::default();
    recipes.set_loading(true);
    let added = recipes.apply_result(&result("success", vec![recipe("r1", "Soup"), recipe("r2", "Bread")]));
    assert_eq!(added, 2);
    assert_eq!(recipes.recipes.len(), 2);
    assert!(!recipes.loading);
}

#[test]
fn failed_result_clears_loading_without_changes() {
    let mut recipes = RecipeCollection::default();
    recipes.set_loading(true);
    let added = recipes.apply_result(&result("ERROR_SERVICE_UNAVAILABLE", vec![recipe("r1", "Soup")]));
    assert_eq!(added, 0);
    assert!(recipes.recipes.is_empty());
    assert!(!recipes.loading);
}
