//! JSON-schema rendering of parameter lists.

use serde_json::{Map, Value, json};
use toolbelt_primitives::{ParamRole, ParamSpec, TypeDescription};

/// Builds a JSON-schema object describing the orchestrator-supplied
/// parameters. Cancellation parameters are left out.
#[must_use]
pub fn parameters_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params.iter().filter(|p| p.role() == ParamRole::Value) {
        let mut schema = type_schema(param.ty());
        if let Value::Object(object) = &mut schema {
            object.insert("description".into(), Value::String(param.ty().pretty()));
        }
        properties.insert(param.name().to_owned(), schema);
        if !param.is_optional() {
            required.push(Value::String(param.name().to_owned()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Maps a type description onto the closest JSON-schema type. Unknown types
/// accept any value.
#[must_use]
pub fn type_schema(ty: &TypeDescription) -> Value {
    match ty {
        TypeDescription::Array { element } => json!({
            "type": "array",
            "items": type_schema(element),
        }),
        TypeDescription::Primitive { .. } | TypeDescription::Generic { .. } => {
            match ty.name().unwrap_or_default() {
                "String" | "string" | "str" | "char" | "PathBuf" | "Uuid" => {
                    json!({ "type": "string" })
                }
                "bool" | "Boolean" | "boolean" => json!({ "type": "boolean" }),
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "u128" | "usize" | "Int" | "Int32" | "Int64" | "int" | "long" => {
                    json!({ "type": "integer" })
                }
                "f32" | "f64" | "Double" | "Single" | "double" | "float" | "decimal" => {
                    json!({ "type": "number" })
                }
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "List" => json!({
                    "type": "array",
                    "items": first_arg_schema(ty),
                }),
                "HashMap" | "BTreeMap" | "Map" | "Dictionary" | "Mapping" => json!({
                    "type": "object",
                    "additionalProperties": second_arg_schema(ty),
                }),
                _ => json!({}),
            }
        }
    }
}

fn generic_args(ty: &TypeDescription) -> &[TypeDescription] {
    match ty {
        TypeDescription::Generic { args, .. } => args,
        _ => &[],
    }
}

fn first_arg_schema(ty: &TypeDescription) -> Value {
    generic_args(ty).first().map_or_else(|| json!({}), type_schema)
}

fn second_arg_schema(ty: &TypeDescription) -> Value {
    generic_args(ty).get(1).map_or_else(|| json!({}), type_schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_required_and_optional_params() {
        let params = vec![
            ParamSpec::value("city", TypeDescription::named("String")),
            ParamSpec::value("days", TypeDescription::named("u8")).optional(),
            ParamSpec::cancellation("cancel"),
        ];

        let schema = parameters_schema(&params);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(schema["properties"]["days"]["type"], "integer");
        assert!(schema["properties"].get("cancel").is_none());
        assert_eq!(schema["required"], json!(["city"]));
    }

    #[test]
    fn nested_types_map_to_structured_schemas() {
        let ty = TypeDescription::generic(
            "HashMap",
            vec![
                TypeDescription::named("String"),
                TypeDescription::array(TypeDescription::named("f64")),
            ],
        );
        assert_eq!(
            type_schema(&ty),
            json!({
                "type": "object",
                "additionalProperties": { "type": "array", "items": { "type": "number" } }
            })
        );
        assert_eq!(type_schema(&TypeDescription::named("Forecast")), json!({}));
    }
}
