use serde_json::{json, Map, Value};

use crate::openapi::OperationDescriptor;

/// JSON schema of the arguments a tool accepts.
pub fn input_schema(descriptor: &OperationDescriptor) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in &descriptor.parameters {
        let mut property = json!({
            "title": title_case(&param.name),
            "type": param.parameter_type.as_str(),
        });
        if let Some(description) = &param.description {
            property["description"] = json!(description);
        }
        properties.insert(param.name.clone(), property);
        if param.required {
            required.push(json!(param.name));
        }
    }

    if descriptor.has_body && !properties.contains_key("body") {
        let mut property = json!({
            "title": "Body",
            "type": "object",
        });
        if let Some(description) = &descriptor.body_description {
            property["description"] = json!(description);
        }
        properties.insert("body".to_string(), property);
        if descriptor.body_required {
            required.push(json!("body"));
        }
    }

    let mut schema = json!({
        "title": format!("{}Arguments", descriptor.id),
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

/// Human-readable documentation for a tool listing.
pub fn tool_description(descriptor: &OperationDescriptor) -> String {
    let mut sections: Vec<String> = Vec::new();
    if let Some(summary) = &descriptor.summary {
        sections.push(summary.clone());
    }
    if let Some(description) = &descriptor.description {
        sections.push(description.clone());
    }

    let mut args = Vec::new();
    for param in &descriptor.parameters {
        args.push(format!(
            "    {} ({}, {}, in {}): {}",
            param.name,
            param.parameter_type.as_str(),
            if param.required { "required" } else { "optional" },
            param.location.as_str(),
            param.description.as_deref().unwrap_or("No description.")
        ));
    }
    if descriptor.has_body {
        args.push(format!(
            "    body (object, {}): {}",
            if descriptor.body_required { "required" } else { "optional" },
            descriptor.body_description.as_deref().unwrap_or("The request body.")
        ));
    }
    if !args.is_empty() {
        sections.push(format!("Args:\n{}", args.join("\n")));
    }

    if sections.is_empty() {
        "No description.".to_string()
    } else {
        sections.join("\n\n")
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{ParameterDefinition, ParameterLocation, ParameterType};
    use reqwest::Method;

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor {
            id: "updateItem".to_string(),
            http_method: Method::PUT,
            path_template: "/items/{id}".to_string(),
            parameters: vec![
                ParameterDefinition {
                    name: "id".to_string(),
                    location: ParameterLocation::Path,
                    required: true,
                    parameter_type: ParameterType::Integer,
                    description: Some("Item id".to_string()),
                },
                ParameterDefinition {
                    name: "verbose".to_string(),
                    location: ParameterLocation::Query,
                    required: false,
                    parameter_type: ParameterType::Boolean,
                    description: None,
                },
            ],
            has_body: true,
            body_required: true,
            body_description: None,
            summary: Some("Update an item".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_input_schema() {
        let schema = input_schema(&descriptor());
        assert_eq!(
            schema,
            json!({
                "title": "updateItemArguments",
                "type": "object",
                "properties": {
                    "id": {"title": "Id", "type": "integer", "description": "Item id"},
                    "verbose": {"title": "Verbose", "type": "boolean"},
                    "body": {"title": "Body", "type": "object"}
                },
                "required": ["id", "body"]
            })
        );
    }

    #[test]
    fn test_input_schema_without_required() {
        let mut op = descriptor();
        op.parameters.remove(0);
        op.has_body = false;
        op.body_required = false;

        let schema = input_schema(&op);
        assert!(schema.get("required").is_none());
        assert_eq!(schema["properties"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_tool_description() {
        let text = tool_description(&descriptor());
        assert!(text.starts_with("Update an item\n\nArgs:\n"));
        assert!(text.contains("    id (integer, required, in path): Item id"));
        assert!(text.contains("    verbose (boolean, optional, in query): No description."));
        assert!(text.contains("    body (object, required): The request body."));
    }

    #[test]
    fn test_tool_description_empty() {
        let mut op = descriptor();
        op.parameters.clear();
        op.has_body = false;
        op.summary = None;
        assert_eq!(tool_description(&op), "No description.");
    }
}
