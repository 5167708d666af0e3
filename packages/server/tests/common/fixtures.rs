//! Seed data built through the bus, so every fixture goes through the same
//! handlers production traffic does.

use server_core::common::{ClientId, MealId, MenuId, ProductId, RecipeId, UserId};
use server_core::domains::clients::CreateClient;
use server_core::domains::meals::CreateMeal;
use server_core::domains::menus::{AddMealToMenu, CreateMenu, MealType, Weekday};
use server_core::domains::products::AddProduct;
use server_core::domains::recipes::{CreateRecipe, Ingredient};
use server_core::kernel::AppBus;

pub async fn seed_product(bus: &AppBus, name: &str, category: &str) -> ProductId {
    bus.handle(AddProduct {
        name: name.to_string(),
        category: category.to_string(),
        unit: "g".to_string(),
        calories_per_100g: None,
    })
    .await
    .expect("product is created")
}

pub async fn seed_recipe(bus: &AppBus, author: UserId, name: &str, tags: &[&str]) -> RecipeId {
    let product = seed_product(bus, &format!("{name} base"), "pantry").await;
    bus.handle(CreateRecipe {
        author_id: author,
        name: name.to_string(),
        instructions: String::new(),
        ingredients: vec![Ingredient {
            product_id: product,
            quantity: 100.0,
            unit: "g".to_string(),
        }],
        tags: tags.iter().map(|t| t.to_string()).collect(),
    })
    .await
    .expect("recipe is created")
}

pub async fn seed_meal(bus: &AppBus, author: UserId, name: &str, recipes: Vec<RecipeId>) -> MealId {
    bus.handle(CreateMeal {
        author_id: author,
        name: name.to_string(),
        description: String::new(),
        recipe_ids: recipes,
    })
    .await
    .expect("meal is created")
}

pub async fn seed_client(bus: &AppBus, author: UserId, name: &str) -> ClientId {
    bus.handle(CreateClient {
        author_id: author,
        name: name.to_string(),
        email: None,
        notes: String::new(),
    })
    .await
    .expect("client is created")
}

pub async fn seed_menu(bus: &AppBus, author: UserId, client: ClientId) -> MenuId {
    bus.handle(CreateMenu {
        author_id: author,
        client_id: client,
        description: "Test plan".to_string(),
    })
    .await
    .expect("menu is created")
}

pub fn monday_lunch(menu_id: MenuId, meal_id: MealId, week: u32) -> AddMealToMenu {
    AddMealToMenu {
        menu_id,
        meal_id,
        week,
        weekday: Weekday::Monday,
        meal_type: MealType::Lunch,
    }
}
