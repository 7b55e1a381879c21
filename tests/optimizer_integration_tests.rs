use grocery_optim::optim::optimizer::{allocate, optimize_grocery_list, OptimizationRequest};
use grocery_optim::optim::ranker::{rank_ingredients, OptimizationType};
use grocery_optim::optim::targets::{calculate_deficits, DailyTargets, OptimizerSettings};
use grocery_optim::recipe_aggregator::{calculate_current_totals, select_recipes};
use grocery_optim::recipe_snapshot::{
    load_snapshot, parse_snapshot, save_scale_states, FullRecipe, GrocerySnapshot, Ingredient, RecipeScaleState,
};
use grocery_optim::session::GroceryOptimizationSession;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

const EPSILON: f64 = 1e-6;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {}, got {}",
        expected,
        actual
    );
}

// One recipe, one ingredient {100g, 200 kcal, 20g P, 5g F, 10g C}, scale 1, recipe protein total 20g.
fn single_ingredient_snapshot(calorie_target: f64, protein_target: f64, fat_target: f64) -> GrocerySnapshot {
    GrocerySnapshot {
        recipes: vec![FullRecipe {
            name: "Protein Bowl".to_string(),
            total_calories: 200.0,
            total_protein: Some(20.0),
            total_fats: Some(5.0),
            total_carbohydrates: Some(10.0),
            ingredients: Some(vec![Ingredient {
                name: "Chicken".to_string(),
                amount: 100.0,
                calories: 200.0,
                protein: 20.0,
                fat: 5.0,
                carbs: 10.0,
            }]),
        }],
        adjusted_recipes: vec![RecipeScaleState::new("Protein Bowl", 1.0, 200.0)],
        targets: DailyTargets {
            calorie_target,
            protein_target,
            fat_target,
        },
    }
}

fn request(snapshot: GrocerySnapshot) -> OptimizationRequest {
    OptimizationRequest {
        snapshot,
        settings: OptimizerSettings::default(),
    }
}

#[test]
fn test_no_targets_yields_empty_result() {
    let result = optimize_grocery_list(&request(single_ingredient_snapshot(2000.0, 0.0, 0.0)));
    assert!(!result.triggered);
    assert!(result.entries.is_empty());
    assert_eq!(result.final_state.total_calorie_increase, 0.0);
}

#[test]
fn test_pure_protein_deficit() {
    let result = optimize_grocery_list(&request(single_ingredient_snapshot(10_000.0, 40.0, 0.0)));
    assert!(result.triggered);
    assert_close(result.deficits.protein_deficit, 20.0);
    assert_close(result.deficits.calorie_ceiling, 1000.0);

    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_eq!(entry.ingredient_name, "Chicken");
    assert_eq!(entry.optimization_type, OptimizationType::Protein);
    assert_close(entry.suggested_increase, 100.0);
    assert_close(entry.new_amount, 200.0);
    assert_close(entry.calorie_increase, 200.0);
    assert_close(result.final_state.protein_needed, 0.0);
}

#[test]
fn test_calorie_ceiling_bound() {
    // 10% of 500 = 50 kcal, remaining 300 kcal -> ceiling 50
    let result = optimize_grocery_list(&request(single_ingredient_snapshot(500.0, 40.0, 0.0)));
    assert_close(result.deficits.calorie_ceiling, 50.0);
    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_close(entry.suggested_increase, 25.0);
    assert_close(entry.calorie_increase, 50.0);
    assert_close(result.final_state.total_calorie_increase, 50.0);
    assert_close(result.final_state.protein_needed, 15.0);
}

#[test]
fn test_carbs_fallback_absorbs_ceiling() {
    // Protein/fat targets met; 300 kcal left of 2000 -> ceiling 200
    let snapshot = GrocerySnapshot {
        recipes: vec![FullRecipe {
            name: "Pasta Night".to_string(),
            total_calories: 1700.0,
            total_protein: Some(120.0),
            total_fats: Some(70.0),
            total_carbohydrates: Some(180.0),
            ingredients: Some(vec![
                Ingredient {
                    name: "Spaghetti".to_string(),
                    amount: 100.0,
                    calories: 400.0,
                    protein: 12.0,
                    fat: 2.0,
                    carbs: 80.0,
                },
                Ingredient {
                    name: "Parmesan".to_string(),
                    amount: 20.0,
                    calories: 80.0,
                    protein: 7.0,
                    fat: 5.6,
                    carbs: 0.8,
                },
            ]),
        }],
        adjusted_recipes: vec![RecipeScaleState::new("Pasta Night", 1.0, 1700.0)],
        targets: DailyTargets {
            calorie_target: 2000.0,
            protein_target: 100.0,
            fat_target: 60.0,
        },
    };

    let result = optimize_grocery_list(&request(snapshot));
    assert!(result.triggered);
    assert_close(result.deficits.remaining_calories, 300.0);
    assert_close(result.deficits.calorie_ceiling, 200.0);
    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_eq!(entry.ingredient_name, "Spaghetti");
    assert_eq!(entry.optimization_type, OptimizationType::Carbs);
    assert_close(entry.suggested_increase, 50.0);
    assert_close(entry.calorie_increase, 200.0);
}

#[test]
fn test_same_data_twice_gives_identical_entries() {
    let json = r#"{
        "recipes": [
            {"name": "Chili", "total_calories": 900, "total_protein": 50, "total_fats": 30,
             "ingredients": [
                {"name": "Ground Beef", "amount": 250, "calories": 625, "protein": 45, "fats": 25, "carbohydrates": 0},
                {"name": "Kidney Beans", "amount": 200, "calories": 250, "protein": 17, "fats": 1, "carbohydrates": 45},
                {"name": "Tomatoes", "amount": 400, "calories": 72, "protein": 3.5, "fats": 0.8, "carbohydrates": 16}
             ]},
            {"name": "Oatmeal", "total_calories": 400,
             "ingredients": [
                {"name": "Oats", "amount": 80, "calories": 300, "protein": 10, "fats": 5.5, "carbohydrates": 54},
                {"name": "Peanut Butter", "amount": 16, "calories": 94, "protein": 4, "fats": 8, "carbohydrates": 3}
             ]}
        ],
        "adjustedRecipes": [
            {"name": "Chili", "scaleFactor": 1.2, "originalCalories": 900, "adjustedCalories": 1080},
            {"name": "Oatmeal", "scaleFactor": 1.0, "originalCalories": 400, "adjustedCalories": 400}
        ],
        "calorieTarget": 2400,
        "proteinTarget": 140,
        "fatTarget": 80
    }"#;

    let first = optimize_grocery_list(&request(parse_snapshot(json).unwrap()));
    let second = optimize_grocery_list(&request(parse_snapshot(json).unwrap()));
    assert!(!first.entries.is_empty());
    assert_eq!(first.entries, second.entries);
    assert_eq!(first.final_state, second.final_state);
}

fn random_snapshot(rng: &mut StdRng) -> GrocerySnapshot {
    let recipe_count = rng.gen_range(1..5);
    let mut recipes = Vec::new();
    let mut adjusted = Vec::new();

    for r in 0..recipe_count {
        let ingredient_count = rng.gen_range(0..6);
        let ingredients: Vec<Ingredient> = (0..ingredient_count)
            .map(|i| {
                let protein: f64 = rng.gen_range(0.0..40.0);
                let fat: f64 = rng.gen_range(0.0..30.0);
                let carbs: f64 = rng.gen_range(0.0..80.0);
                let calories = if rng.gen_bool(0.1) {
                    0.0
                } else {
                    protein * 4.0 + fat * 9.0 + carbs * 4.0
                };
                Ingredient {
                    name: format!("ingredient-{}-{}", r, i),
                    amount: rng.gen_range(5.0..400.0),
                    calories,
                    protein,
                    fat,
                    carbs,
                }
            })
            .collect();
        let total_calories: f64 = ingredients.iter().map(|i| i.calories).sum();
        let with_macros = rng.gen_bool(0.5);
        let recipe = FullRecipe {
            name: format!("recipe-{}", r),
            total_calories,
            total_protein: with_macros.then(|| ingredients.iter().map(|i| i.protein).sum()),
            total_fats: with_macros.then(|| ingredients.iter().map(|i| i.fat).sum()),
            total_carbohydrates: with_macros.then(|| ingredients.iter().map(|i| i.carbs).sum()),
            ingredients: if rng.gen_bool(0.1) { None } else { Some(ingredients) },
        };
        adjusted.push(RecipeScaleState::new(recipe.name.clone(), rng.gen_range(0.5..3.0), total_calories));
        recipes.push(recipe);
    }

    GrocerySnapshot {
        recipes,
        adjusted_recipes: adjusted,
        targets: DailyTargets {
            calorie_target: rng.gen_range(0.0..4000.0),
            protein_target: if rng.gen_bool(0.2) { 0.0 } else { rng.gen_range(0.0..250.0) },
            fat_target: if rng.gen_bool(0.2) { 0.0 } else { rng.gen_range(0.0..150.0) },
        },
    }
}

#[test]
fn test_randomized_allocation_invariants() {
    let mut rng = StdRng::seed_from_u64(0x6f70_7469);
    let settings = OptimizerSettings::default();

    for _ in 0..500 {
        let snapshot = random_snapshot(&mut rng);
        let result = optimize_grocery_list(&OptimizationRequest {
            snapshot: snapshot.clone(),
            settings,
        });

        let state = result.final_state;
        assert!(state.total_calorie_increase <= result.deficits.calorie_ceiling + EPSILON);
        assert!(state.protein_needed >= 0.0 && state.protein_needed <= result.deficits.protein_deficit);
        assert!(state.fat_needed >= 0.0 && state.fat_needed <= result.deficits.fat_deficit);

        let entry_calories: f64 = result.entries.iter().map(|e| e.calorie_increase).sum();
        assert_eq!(state.total_calorie_increase, entry_calories);

        for entry in &result.entries {
            assert!(entry.suggested_increase > settings.min_increase_grams);
            let ratio = entry.calorie_increase / entry.suggested_increase;
            let ranked_calories_per_gram = snapshot.recipes[entry.recipe_ref.index]
                .ingredients
                .as_ref()
                .and_then(|list| list.get(entry.ingredient_index))
                .map(|i| i.calories / i.amount)
                .unwrap();
            assert!((ratio - ranked_calories_per_gram).abs() < 1e-6);
        }

        if !result.triggered {
            assert!(result.entries.is_empty());
        }
    }
}

#[test]
fn test_ranking_order_is_allocation_order() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let snapshot = random_snapshot(&mut rng);
        let settings = OptimizerSettings::default();
        let selected = select_recipes(&snapshot.recipes, &snapshot.adjusted_recipes);
        let totals = calculate_current_totals(&selected);
        let deficits = calculate_deficits(&totals, &snapshot.targets, &settings);
        let ranked = rank_ingredients(&selected, &deficits, &snapshot.targets);

        for pair in ranked.windows(2) {
            assert!(pair[0].primary_ratio >= pair[1].primary_ratio);
        }

        let outcome = allocate(&ranked, &deficits, &settings);
        let positions: Vec<usize> = outcome
            .entries
            .iter()
            .map(|e| {
                ranked
                    .iter()
                    .position(|r| r.name == e.ingredient_name && r.recipe_ref == e.recipe_ref)
                    .unwrap()
            })
            .collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}

#[tokio::test]
async fn test_snapshot_file_apply_and_save() {
    let dir = tempdir().unwrap();
    let snapshot_path = dir.path().join("snapshot.json");
    let output_path = dir.path().join("scales.json");

    let snapshot = single_ingredient_snapshot(10_000.0, 40.0, 0.0);
    tokio::fs::write(&snapshot_path, serde_json::to_string(&snapshot).unwrap())
        .await
        .unwrap();

    let loaded = load_snapshot(&snapshot_path).await.unwrap();
    assert_eq!(loaded, snapshot);

    let mut session = GroceryOptimizationSession::new(loaded, OptimizerSettings::default());
    session.apply().unwrap();
    save_scale_states(&output_path, session.scale_states()).await.unwrap();

    let saved: Vec<RecipeScaleState> =
        serde_json::from_str(&tokio::fs::read_to_string(&output_path).await.unwrap()).unwrap();
    assert_eq!(saved.len(), 1);
    assert_close(saved[0].scale_factor, 2.0);
    assert_close(saved[0].adjusted_calories, 400.0);
}

#[tokio::test]
async fn test_missing_snapshot_file_is_an_error() {
    let dir = tempdir().unwrap();
    let result = load_snapshot(&dir.path().join("does-not-exist.json")).await;
    assert!(result.is_err());
}
