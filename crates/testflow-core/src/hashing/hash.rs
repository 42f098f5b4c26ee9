//! Hash helpers sobre blake3.

use blake3::Hasher;
use serde_json::{json, Value};

use super::to_canonical_json;
use crate::model::Parameter;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

/// Hash del JSON canónico de `value`.
pub fn hash_value(value: &Value) -> String { hash_str(&to_canonical_json(value)) }

/// Identidad estable de un test entre ejecuciones: nombre completo más los
/// parámetros no excluidos, ordenados por nombre.
pub fn history_id(full_name: &str, parameters: &[Parameter]) -> String {
    let mut params: Vec<(&str, &str)> = parameters.iter()
                                                  .filter(|p| !p.excluded)
                                                  .map(|p| (p.name.as_str(), p.value.as_str()))
                                                  .collect();
    params.sort();
    hash_value(&json!({ "full_name": full_name, "parameters": params }))
}
