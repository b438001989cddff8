//! `render_altair` capability declared to the live session.

use std::sync::LazyLock;

use serde_json::{Map, json};

use crate::live::types::{FunctionDeclaration, Schema, SchemaType, Tool};

/// Name of the chart capability.
pub const RENDER_ALTAIR: &str = "render_altair";

/// Name of its single string parameter.
pub const JSON_GRAPH_ARG: &str = "json_graph";

static DECLARATION: LazyLock<FunctionDeclaration> = LazyLock::new(|| {
    let mut properties = Map::new();
    properties.insert(
        JSON_GRAPH_ARG.to_owned(),
        json!({
            "type": "STRING",
            "description": "JSON STRING representation of the graph to render. \
                            Must be a string, not a json object",
        }),
    );
    FunctionDeclaration {
        name: RENDER_ALTAIR.to_owned(),
        description: "Displays an altair graph in json format.".to_owned(),
        parameters: Schema {
            schema_type: SchemaType::Object,
            description: None,
            properties,
            required: vec![JSON_GRAPH_ARG.to_owned()],
        },
    }
});

/// The `render_altair` declaration. Built once per process.
pub fn render_altair_declaration() -> &'static FunctionDeclaration {
    &DECLARATION
}

/// Tools enabled on the session: platform search (optional) followed by
/// the chart capability.
pub fn session_tools(enable_search: bool) -> Vec<Tool> {
    let mut tools = Vec::with_capacity(2);
    if enable_search {
        tools.push(Tool::google_search());
    }
    tools.push(Tool::functions(vec![render_altair_declaration().clone()]));
    tools
}
