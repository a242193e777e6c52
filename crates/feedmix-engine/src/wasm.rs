//! WASM bindings for the formulation engine
//!
//! Requests and results cross the boundary as plain JS objects in the serde
//! shape of the engine types.

use std::collections::BTreeMap;
use std::fmt::Display;

use wasm_bindgen::prelude::*;

use crate::ingredient::Ingredient;
use crate::nutrients::{NutrientVector, NutritionalTarget};
use crate::optimizer::{OptimizeRequest, Optimizer};
use crate::strategy::{DEFAULT_TOLERANCE, Strategy};
use crate::{bags, compliance, formulation};

fn js_error(e: impl Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Optimize one strategy and return the raw solver result
#[wasm_bindgen]
pub fn optimize(request: JsValue, strategy: &str) -> Result<JsValue, JsValue> {
    let request: OptimizeRequest = serde_wasm_bindgen::from_value(request).map_err(js_error)?;
    let strategy: Strategy = strategy.parse().map_err(js_error)?;
    let result = Optimizer::new().optimize(&request, strategy).map_err(js_error)?;
    to_js(&result)
}

/// Optimize every strategy and return the assembled options
#[wasm_bindgen(js_name = optimizeAll)]
pub fn optimize_all(request: JsValue) -> Result<JsValue, JsValue> {
    let request: OptimizeRequest = serde_wasm_bindgen::from_value(request).map_err(js_error)?;
    let outcome = formulation::optimize_all(&request).map_err(js_error)?;
    to_js(&outcome)
}

/// Grade a realized nutrient vector against a target
#[wasm_bindgen(js_name = checkCompliance)]
pub fn check_compliance(actual: JsValue, target: JsValue, tolerance: Option<f64>) -> Result<JsValue, JsValue> {
    let actual: NutrientVector = serde_wasm_bindgen::from_value(actual).map_err(js_error)?;
    let target: NutritionalTarget = serde_wasm_bindgen::from_value(target).map_err(js_error)?;
    let result = compliance::check_compliance(&actual, &target, tolerance.unwrap_or(DEFAULT_TOLERANCE));
    to_js(&result)
}

/// Round solved kg per ingredient id up to whole bags
#[wasm_bindgen(js_name = roundToBags)]
pub fn round_to_bags(quantities: JsValue, ingredients: JsValue) -> Result<JsValue, JsValue> {
    let quantities: BTreeMap<String, f64> = serde_wasm_bindgen::from_value(quantities).map_err(js_error)?;
    let ingredients: Vec<Ingredient> = serde_wasm_bindgen::from_value(ingredients).map_err(js_error)?;
    to_js(&bags::round_to_bags(&quantities, &ingredients))
}
