//! # Catalog Repository
//!
//! Read access to ingredients, per-ingredient nutrition and pricing rows,
//! drinks, base recipes and size variants. Insert helpers exist for
//! seeding and tests; the storefront never writes the catalog.
//!
//! ## What A Cart Operation Loads
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add "latte" in "large" with [oat_milk]                                 │
//! │       │                                                                 │
//! │       ├── get_drink("latte")              Drink                         │
//! │       ├── base_lines("latte")             Vec<RecipeLine>               │
//! │       ├── get_size("latte", "large")      SizeVariant (+ override)      │
//! │       │                                                                 │
//! │       └── load_snapshot(ids of every line and add-on)                   │
//! │               ├── ingredients           WHERE id IN (...)               │
//! │               ├── ingredient_nutrition  WHERE ingredient_id IN (...)    │
//! │               └── ingredient_pricing    WHERE ingredient_id IN (...)    │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                   CatalogSnapshot ──► brewline-core                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};

use brewline_core::validation::validate_price_cents;
use brewline_core::{
    CatalogSnapshot, Drink, Ingredient, IngredientNutrition, IngredientPricing, Macros,
    MeasureUnit, RecipeLine, SizeVariant,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct IngredientRow {
    id: String,
    name: String,
    default_unit: MeasureUnit,
    grams_per_unit: Option<f64>,
    density_g_per_ml: Option<f64>,
    allergens: String,
    is_active: bool,
    is_add_on: bool,
}

impl TryFrom<IngredientRow> for Ingredient {
    type Error = DbError;

    fn try_from(row: IngredientRow) -> DbResult<Self> {
        let allergens: BTreeSet<String> = serde_json::from_str(&row.allergens)
            .map_err(|e| DbError::invalid_data(format!("ingredient {} allergens", row.id), e))?;

        Ok(Ingredient {
            id: row.id,
            name: row.name,
            default_unit: row.default_unit,
            grams_per_unit: row.grams_per_unit,
            density_g_per_ml: row.density_g_per_ml,
            allergens,
            is_active: row.is_active,
            is_add_on: row.is_add_on,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NutritionRow {
    ingredient_id: String,
    energy_kcal: f64,
    protein_g: f64,
    fat_g: f64,
    carbohydrate_g: f64,
    sugar_g: f64,
    fiber_g: f64,
    sodium_mg: f64,
}

impl From<NutritionRow> for IngredientNutrition {
    fn from(row: NutritionRow) -> Self {
        IngredientNutrition {
            ingredient_id: row.ingredient_id,
            per_100g: Macros {
                energy_kcal: row.energy_kcal,
                protein_g: row.protein_g,
                fat_g: row.fat_g,
                carbohydrate_g: row.carbohydrate_g,
                sugar_g: row.sugar_g,
                fiber_g: row.fiber_g,
                sodium_mg: row.sodium_mg,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SizeRow {
    id: String,
    drink_id: String,
    name: String,
    size_ml: f64,
    price_cents: i64,
    has_override: bool,
}

impl SizeRow {
    fn into_variant(self, override_lines: Option<Vec<RecipeLine>>) -> SizeVariant {
        SizeVariant {
            id: self.id,
            drink_id: self.drink_id,
            name: self.name,
            size_ml: self.size_ml,
            price_cents: self.price_cents,
            override_lines,
        }
    }
}

/// A recipe line tagged with the size variant it overrides.
#[derive(Debug, sqlx::FromRow)]
struct OverrideLineRow {
    size_variant_id: String,
    #[sqlx(flatten)]
    line: RecipeLine,
}

const INGREDIENT_COLUMNS: &str = "id, name, default_unit, grams_per_unit, density_g_per_ml, \
     allergens, is_active, is_add_on";

const NUTRITION_COLUMNS: &str = "ingredient_id, energy_kcal, protein_g, fat_g, carbohydrate_g, \
     sugar_g, fiber_g, sodium_mg";

const LINE_COLUMNS: &str = "ingredient_id, amount, unit, role, unit_label";

fn push_id_list<'a>(builder: &mut QueryBuilder<'a, Sqlite>, ids: &'a [String]) {
    builder.push(" (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads (and seed writes).
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Ingredients
    // -------------------------------------------------------------------------

    /// Gets an ingredient by id, active or not.
    pub async fn get_ingredient(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let sql = format!("SELECT {} FROM ingredients WHERE id = ?1", INGREDIENT_COLUMNS);
        let row: Option<IngredientRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Ingredient::try_from).transpose()
    }

    /// Gets every ingredient whose id is in `ids`. Unknown ids are skipped.
    pub async fn get_ingredients(&self, ids: &[String]) -> DbResult<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM ingredients WHERE id IN",
            INGREDIENT_COLUMNS
        ));
        push_id_list(&mut builder, ids);

        let rows: Vec<IngredientRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Ingredient::try_from).collect()
    }

    /// Lists active ingredients ordered by name.
    pub async fn list_active_ingredients(&self) -> DbResult<Vec<Ingredient>> {
        let sql = format!(
            "SELECT {} FROM ingredients WHERE is_active = 1 ORDER BY name",
            INGREDIENT_COLUMNS
        );
        let rows: Vec<IngredientRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Ingredient::try_from).collect()
    }

    /// Lists ingredients a customer may add to a drink.
    pub async fn list_add_ons(&self) -> DbResult<Vec<Ingredient>> {
        let sql = format!(
            "SELECT {} FROM ingredients WHERE is_active = 1 AND is_add_on = 1 ORDER BY name",
            INGREDIENT_COLUMNS
        );
        let rows: Vec<IngredientRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Ingredient::try_from).collect()
    }

    /// Nutrition rows for `ids`. Ingredients without a row are absent.
    pub async fn nutrition_for(&self, ids: &[String]) -> DbResult<Vec<IngredientNutrition>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM ingredient_nutrition WHERE ingredient_id IN",
            NUTRITION_COLUMNS
        ));
        push_id_list(&mut builder, ids);

        let rows: Vec<NutritionRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(IngredientNutrition::from).collect())
    }

    /// Pricing rows for `ids`, any mode.
    pub async fn pricing_for(&self, ids: &[String]) -> DbResult<Vec<IngredientPricing>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(
            "SELECT ingredient_id, mode, base_price_cents, rate_centicents, unit_label \
             FROM ingredient_pricing WHERE ingredient_id IN",
        );
        push_id_list(&mut builder, ids);

        let rows: Vec<IngredientPricing> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Loads everything the core needs to value lines over `ids`.
    ///
    /// Ids are deduplicated. Inactive ingredients are included so that
    /// their recipe lines still resolve; the cart checks the active flag
    /// for add-on selections.
    pub async fn load_snapshot(&self, ids: &[String]) -> DbResult<CatalogSnapshot> {
        let unique: Vec<String> = ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(ingredients = unique.len(), "Loading catalog snapshot");

        let ingredients = self.get_ingredients(&unique).await?;
        let nutrition = self.nutrition_for(&unique).await?;
        let pricing = self.pricing_for(&unique).await?;

        Ok(CatalogSnapshot::from_rows(ingredients, nutrition, pricing))
    }

    // -------------------------------------------------------------------------
    // Drinks and sizes
    // -------------------------------------------------------------------------

    /// Gets a drink by id, active or not.
    pub async fn get_drink(&self, id: &str) -> DbResult<Option<Drink>> {
        let drink: Option<Drink> = sqlx::query_as(
            "SELECT id, name, base_size_ml, is_active FROM drinks WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(drink)
    }

    /// Lists active drinks ordered by name.
    pub async fn list_active_drinks(&self) -> DbResult<Vec<Drink>> {
        let drinks: Vec<Drink> = sqlx::query_as(
            "SELECT id, name, base_size_ml, is_active FROM drinks \
             WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drinks)
    }

    /// The drink's base recipe, in recipe order.
    pub async fn base_lines(&self, drink_id: &str) -> DbResult<Vec<RecipeLine>> {
        let sql = format!(
            "SELECT {} FROM recipe_lines WHERE drink_id = ?1 ORDER BY position, id",
            LINE_COLUMNS
        );
        let lines: Vec<RecipeLine> = sqlx::query_as(&sql)
            .bind(drink_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Gets one size of a drink, with its override recipe when it has one.
    ///
    /// Returns `None` when the size doesn't exist or belongs to another drink.
    pub async fn get_size(&self, drink_id: &str, size_id: &str) -> DbResult<Option<SizeVariant>> {
        let row: Option<SizeRow> = sqlx::query_as(
            "SELECT id, drink_id, name, size_ml, price_cents, has_override \
             FROM size_variants WHERE id = ?1 AND drink_id = ?2",
        )
        .bind(size_id)
        .bind(drink_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let override_lines = if row.has_override {
            Some(self.override_lines(&row.id).await?)
        } else {
            None
        };

        Ok(Some(row.into_variant(override_lines)))
    }

    /// Lists a drink's sizes in menu order, with override recipes attached.
    pub async fn list_sizes(&self, drink_id: &str) -> DbResult<Vec<SizeVariant>> {
        let rows: Vec<SizeRow> = sqlx::query_as(
            "SELECT id, drink_id, name, size_ml, price_cents, has_override \
             FROM size_variants WHERE drink_id = ?1 ORDER BY position, size_ml",
        )
        .bind(drink_id)
        .fetch_all(&self.pool)
        .await?;

        // One query for every override line of this drink
        let sql = format!(
            "SELECT rl.size_variant_id, {} FROM recipe_lines rl \
             JOIN size_variants sv ON sv.id = rl.size_variant_id \
             WHERE sv.drink_id = ?1 ORDER BY rl.position, rl.id",
            LINE_COLUMNS
                .split(", ")
                .map(|c| format!("rl.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let override_rows: Vec<OverrideLineRow> = sqlx::query_as(&sql)
            .bind(drink_id)
            .fetch_all(&self.pool)
            .await?;

        let mut by_size: HashMap<String, Vec<RecipeLine>> = HashMap::new();
        for row in override_rows {
            by_size.entry(row.size_variant_id).or_default().push(row.line);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = if row.has_override {
                    Some(by_size.remove(&row.id).unwrap_or_default())
                } else {
                    None
                };
                row.into_variant(lines)
            })
            .collect())
    }

    async fn override_lines(&self, size_variant_id: &str) -> DbResult<Vec<RecipeLine>> {
        let sql = format!(
            "SELECT {} FROM recipe_lines WHERE size_variant_id = ?1 ORDER BY position, id",
            LINE_COLUMNS
        );
        let lines: Vec<RecipeLine> = sqlx::query_as(&sql)
            .bind(size_variant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    // -------------------------------------------------------------------------
    // Seed writes
    // -------------------------------------------------------------------------

    /// Inserts or replaces an ingredient.
    pub async fn upsert_ingredient(&self, ingredient: &Ingredient) -> DbResult<()> {
        debug!(id = %ingredient.id, "Upserting ingredient");

        let allergens = serde_json::to_string(&ingredient.allergens)
            .map_err(|e| DbError::invalid_data("ingredient allergens", e))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, name, default_unit, grams_per_unit, density_g_per_ml,
                allergens, is_active, is_add_on, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                default_unit = excluded.default_unit,
                grams_per_unit = excluded.grams_per_unit,
                density_g_per_ml = excluded.density_g_per_ml,
                allergens = excluded.allergens,
                is_active = excluded.is_active,
                is_add_on = excluded.is_add_on,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(ingredient.default_unit)
        .bind(ingredient.grams_per_unit)
        .bind(ingredient.density_g_per_ml)
        .bind(allergens)
        .bind(ingredient.is_active)
        .bind(ingredient.is_add_on)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces the nutrition row of an ingredient.
    pub async fn upsert_nutrition(&self, row: &IngredientNutrition) -> DbResult<()> {
        let m = &row.per_100g;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO ingredient_nutrition (
                ingredient_id, energy_kcal, protein_g, fat_g,
                carbohydrate_g, sugar_g, fiber_g, sodium_mg
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&row.ingredient_id)
        .bind(m.energy_kcal)
        .bind(m.protein_g)
        .bind(m.fat_g)
        .bind(m.carbohydrate_g)
        .bind(m.sugar_g)
        .bind(m.fiber_g)
        .bind(m.sodium_mg)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces a pricing row (one per ingredient and mode).
    pub async fn upsert_pricing(&self, row: &IngredientPricing) -> DbResult<()> {
        validate_price_cents(row.base_price_cents)?;
        if let Some(rate) = row.rate_centicents {
            validate_price_cents(rate)?;
        }

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO ingredient_pricing (
                ingredient_id, mode, base_price_cents, rate_centicents, unit_label
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&row.ingredient_id)
        .bind(row.mode)
        .bind(row.base_price_cents)
        .bind(row.rate_centicents)
        .bind(&row.unit_label)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a drink together with its base recipe.
    pub async fn insert_drink(&self, drink: &Drink, base_lines: &[RecipeLine]) -> DbResult<()> {
        debug!(id = %drink.id, lines = base_lines.len(), "Inserting drink");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO drinks (id, name, base_size_ml, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&drink.id)
        .bind(&drink.name)
        .bind(drink.base_size_ml)
        .bind(drink.is_active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for (position, line) in base_lines.iter().enumerate() {
            insert_line(&mut tx, Some(&drink.id), None, line, position as i64).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts a size variant; its override lines are written when present.
    pub async fn insert_size(&self, size: &SizeVariant, position: i64) -> DbResult<()> {
        debug!(id = %size.id, drink_id = %size.drink_id, "Inserting size variant");
        validate_price_cents(size.price_cents)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO size_variants \
             (id, drink_id, name, size_ml, price_cents, has_override, position) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&size.id)
        .bind(&size.drink_id)
        .bind(&size.name)
        .bind(size.size_ml)
        .bind(size.price_cents)
        .bind(size.override_lines.is_some())
        .bind(position)
        .execute(&mut *tx)
        .await?;

        for (position, line) in size.override_lines.iter().flatten().enumerate() {
            insert_line(&mut tx, None, Some(&size.id), line, position as i64).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Activates or deactivates an ingredient.
    pub async fn set_ingredient_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE ingredients SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        Ok(())
    }
}

async fn insert_line(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    drink_id: Option<&str>,
    size_variant_id: Option<&str>,
    line: &RecipeLine,
    position: i64,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO recipe_lines \
         (drink_id, size_variant_id, ingredient_id, amount, unit, role, unit_label, position) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(drink_id)
    .bind(size_variant_id)
    .bind(&line.ingredient_id)
    .bind(line.amount)
    .bind(line.unit)
    .bind(line.role)
    .bind(&line.unit_label)
    .bind(position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
