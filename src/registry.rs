use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::DashboardSummary;

/// ToolDefinition
///
/// A capability an agent can invoke. Schemas are JSON Schema documents, kept opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ToolDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
    #[schema(value_type = Object)]
    pub output_schema: Value,
}

/// AgentDefinition
///
/// An orchestrated task with its input/output contract and the tools it relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
    #[schema(value_type = Object)]
    pub output_schema: Value,
    pub associated_tools: Vec<ToolDefinition>,
}

/// Registry
///
/// The statically registered agents and tools listed by the admin panel. Built once at
/// startup; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    agents: Vec<AgentDefinition>,
    tools: Vec<ToolDefinition>,
}

fn photo_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "photo_data_uri": {
                "type": "string",
                "description": "A photo to analyze, as a data URI that must include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'."
            }
        },
        "required": ["photo_data_uri"]
    })
}

fn objects_output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "objects": {
                "type": "array",
                "items": { "type": "string" },
                "description": "A list of objects identified in the image."
            }
        },
        "required": ["objects"]
    })
}

impl Registry {
    pub fn new(agents: Vec<AgentDefinition>, tools: Vec<ToolDefinition>) -> Self {
        Self { agents, tools }
    }

    /// builtin
    ///
    /// The object identification tool and the agent that drives it.
    pub fn builtin() -> Self {
        let identify_tool = ToolDefinition {
            id: "tool-identify-objects".to_string(),
            name: "identifyObjectsInImage".to_string(),
            description: "Identifies objects present in a given image. Takes a data URI of an image as input.".to_string(),
            input_schema: photo_input_schema(),
            output_schema: objects_output_schema(),
        };

        let identify_agent = AgentDefinition {
            id: "agent-object-identification".to_string(),
            name: "Object Identification Agent".to_string(),
            description: "Analyzes an uploaded image and returns the list of objects it contains.".to_string(),
            input_schema: photo_input_schema(),
            output_schema: objects_output_schema(),
            associated_tools: vec![identify_tool.clone()],
        };

        Self::new(vec![identify_agent], vec![identify_tool])
    }

    pub fn agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn agent(&self, id: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            agent_count: self.agents.len(),
            tool_count: self.tools.len(),
        }
    }
}
