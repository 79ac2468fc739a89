// Builtin specialty presets for known model families
//
// The catalog endpoint decorates the backend's live model list with a
// specialty, a display category, and a short description, matched by name.

use serde::{Deserialize, Serialize};

/// A backend descriptor as served by the catalog endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub category: String,
    pub specialty: String,
    pub description: String,
    pub active: bool,
}

/// One builtin specialty preset
/// Note: This is hardcoded data, not deserialized from files
struct SpecialtyPreset {
    /// Name fragment to match against the model identifier
    family: &'static str,
    specialty: &'static str,
    description: &'static str,
}

static PRESETS: &[SpecialtyPreset] = &[
    SpecialtyPreset {
        family: "codellama",
        specialty: "Code Generation",
        description: "Specialized for programming and code tasks",
    },
    SpecialtyPreset {
        family: "deepseek-coder",
        specialty: "Advanced Coding",
        description: "Superior code understanding and generation",
    },
    SpecialtyPreset {
        family: "codegemma",
        specialty: "Code Analysis",
        description: "Code comprehension and explanation",
    },
    SpecialtyPreset {
        family: "starcoder",
        specialty: "Multi-language Coding",
        description: "Supports many programming languages",
    },
    SpecialtyPreset {
        family: "qwen2.5-coder",
        specialty: "Code Generation",
        description: "Efficient code generation and problem solving",
    },
    SpecialtyPreset {
        family: "wizardcoder",
        specialty: "Code Generation",
        description: "Advanced coding capabilities and problem solving",
    },
    SpecialtyPreset {
        family: "llama3",
        specialty: "General Reasoning",
        description: "Balanced performance across tasks, good reasoning",
    },
    SpecialtyPreset {
        family: "llama2",
        specialty: "Stable Performance",
        description: "Reliable and consistent responses",
    },
    SpecialtyPreset {
        family: "qwen",
        specialty: "Multilingual Intelligence",
        description: "Strong multilingual and reasoning capabilities",
    },
    SpecialtyPreset {
        family: "mixtral",
        specialty: "Expert Mixture",
        description: "Mixture of experts for diverse capabilities",
    },
    SpecialtyPreset {
        family: "mistral",
        specialty: "Efficient Reasoning",
        description: "Fast and efficient reasoning and analysis",
    },
    SpecialtyPreset {
        family: "phi3",
        specialty: "Compact Intelligence",
        description: "Small but capable model with good performance",
    },
    SpecialtyPreset {
        family: "gemma",
        specialty: "Research & Analysis",
        description: "Strong analytical and research capabilities",
    },
    SpecialtyPreset {
        family: "tinyllama",
        specialty: "Lightweight Assistant",
        description: "Compact model for basic tasks",
    },
    SpecialtyPreset {
        family: "vicuna",
        specialty: "Open Assistant",
        description: "Open-source conversational assistant",
    },
];

/// Map a specialty to a broad display category
fn category_for(specialty: &str) -> &'static str {
    let lower = specialty.to_lowercase();
    if lower.contains("cod") || lower.contains("programming") {
        "Coding & Development"
    } else if lower.contains("reasoning") || lower.contains("analysis") || lower.contains("research")
    {
        "Reasoning & Analysis"
    } else if lower.contains("assistant") || lower.contains("conversation") {
        "Conversation & Assistance"
    } else {
        "General Purpose"
    }
}

/// Build a descriptor for a live model, matching the longest preset fragment
/// so "deepseek-coder" wins over "coder"-bearing generics.
pub fn describe_model(name: &str) -> ModelDescriptor {
    let lower = name.to_lowercase();
    let preset = PRESETS
        .iter()
        .filter(|p| lower.contains(p.family))
        .max_by_key(|p| p.family.len());

    match preset {
        Some(p) => ModelDescriptor {
            name: name.to_string(),
            category: category_for(p.specialty).to_string(),
            specialty: p.specialty.to_string(),
            description: p.description.to_string(),
            active: true,
        },
        None => ModelDescriptor {
            name: name.to_string(),
            category: "General Purpose".to_string(),
            specialty: "General Purpose".to_string(),
            description: "Multi-purpose language model".to_string(),
            active: true,
        },
    }
}
