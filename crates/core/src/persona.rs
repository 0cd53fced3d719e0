//! Personas: named presets of system prompt + tool allow-list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named preset selecting domain behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub system_prompt: String,

    /// Tool names the model may call under this persona
    #[serde(default)]
    pub tools: Vec<String>,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }
}

const SHARED_RULES: &str = "Answer only from tool results. Cite identifiers \
(project numbers, NCT ids, patent ids, PMIDs) for every record you mention. \
If a search returns nothing, say so and suggest a broader query.";

/// Lookup of personas by name.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Persona>,
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in personas: grants, trials, patents, publications, general.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(Persona::new(
            "grants",
            "Funded research projects and their investigators",
            format!(
                "You are a research funding analyst. Help the user find funded \
                 projects, investigators and institutions. {SHARED_RULES}"
            ),
            &["search_grants", "get_grant_details"],
        ));
        registry.insert(Persona::new(
            "trials",
            "Registered clinical studies",
            format!(
                "You are a clinical research analyst. Help the user find clinical \
                 studies by condition, intervention, phase and status. {SHARED_RULES}"
            ),
            &["search_clinical_trials", "search_grants"],
        ));
        registry.insert(Persona::new(
            "patents",
            "Patents arising from funded research",
            format!(
                "You are a technology transfer analyst. Help the user find patents \
                 and the projects they came from. {SHARED_RULES}"
            ),
            &["search_patents", "get_grant_details"],
        ));
        registry.insert(Persona::new(
            "publications",
            "Publications linked to funded projects",
            format!(
                "You are a bibliometrics analyst. Help the user find publications \
                 and the projects that funded them. {SHARED_RULES}"
            ),
            &["search_publications", "get_grant_details"],
        ));
        registry.insert(Persona::new(
            "general",
            "Everything: grants, trials, patents and publications",
            format!(
                "You are a research intelligence assistant with access to funded \
                 projects, clinical studies, patents and publications. {SHARED_RULES}"
            ),
            &[
                "search_grants",
                "get_grant_details",
                "search_clinical_trials",
                "search_patents",
                "search_publications",
            ],
        ));
        registry
    }

    /// Add or replace a persona.
    pub fn insert(&mut self, persona: Persona) {
        self.personas.insert(persona.name.clone(), persona);
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.personas.contains_key(name)
    }

    /// All personas, sorted by name.
    pub fn list(&self) -> Vec<&Persona> {
        self.personas.values().collect()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
