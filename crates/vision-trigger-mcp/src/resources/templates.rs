//! Resource URI templates and static resource definitions.

use crate::types::{ResourceDefinition, ResourceTemplateDefinition};

pub fn list_templates() -> Vec<ResourceTemplateDefinition> {
    vec![
        ResourceTemplateDefinition {
            uri_template: "vtp://reference/{id}".to_string(),
            name: "Stored Reference".to_string(),
            description: Some("A single saved reference with its image locations".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        ResourceTemplateDefinition {
            uri_template: "vtp://label/{label}".to_string(),
            name: "References By Label".to_string(),
            description: Some("Saved references matching a label, newest first".to_string()),
            mime_type: Some("application/json".to_string()),
        },
    ]
}

pub fn list_resources() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition {
            uri: "vtp://config".to_string(),
            name: "Trigger Policy".to_string(),
            description: Some("The active policy configuration".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        ResourceDefinition {
            uri: "vtp://stats".to_string(),
            name: "Planning Statistics".to_string(),
            description: Some("Turn counters and reference store size".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        ResourceDefinition {
            uri: "vtp://references".to_string(),
            name: "Recent References".to_string(),
            description: Some("Most recent 20 saved references".to_string()),
            mime_type: Some("application/json".to_string()),
        },
    ]
}
