//! Typed ID definitions for all domain entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker for the person who authored a catalog entry or rated a recipe.
pub struct User;

pub struct Product;

pub struct Recipe;

pub struct Meal;

pub struct Client;

pub struct Menu;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type UserId = Id<User>;

pub type ProductId = Id<Product>;

pub type RecipeId = Id<Recipe>;

pub type MealId = Id<Meal>;

pub type ClientId = Id<Client>;

pub type MenuId = Id<Menu>;
