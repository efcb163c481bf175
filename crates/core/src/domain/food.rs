use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoodId(pub i64);

/// Nutritional values on a per-100g basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroProfile {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroProfile {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self { calories, protein, carbs, fat }
    }

    /// Scale per-100g values to the consumed amount.
    pub fn scale(&self, amount_g: f64) -> Self {
        let factor = amount_g / 100.0;
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
        }
    }
}

/// One ranked hit from the food database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodCandidate {
    pub id: FoodId,
    pub name: String,
    pub macros: MacroProfile,
}
