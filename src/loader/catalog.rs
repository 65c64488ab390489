//! Card catalog: the template table cards are instantiated from
//!
//! Card content lives outside the engine; a catalog is loaded from JSON
//! (a list of templates) or built in code for tests.

use crate::core::{CardTemplate, TemplateId};
use crate::{ClashError, Result};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    templates: FxHashMap<TemplateId, Arc<CardTemplate>>,
}

impl CardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(templates: impl IntoIterator<Item = CardTemplate>) -> Self {
        let mut catalog = CardCatalog::new();
        for template in templates {
            catalog.insert(template);
        }
        catalog
    }

    pub fn insert(&mut self, template: CardTemplate) {
        self.templates.insert(template.id.clone(), Arc::new(template));
    }

    pub fn get(&self, id: &TemplateId) -> Option<Arc<CardTemplate>> {
        self.templates.get(id).cloned()
    }

    pub fn require(&self, id: &TemplateId) -> Result<Arc<CardTemplate>> {
        self.get(id)
            .ok_or_else(|| ClashError::UnknownTemplate(id.to_string()))
    }

    /// Case-insensitive lookup by display name (deck files use names)
    pub fn find_by_name(&self, name: &str) -> Option<Arc<CardTemplate>> {
        let wanted = name.to_lowercase();
        let mut matches: Vec<&Arc<CardTemplate>> = self
            .templates
            .values()
            .filter(|t| t.name.as_str().to_lowercase() == wanted)
            .collect();
        // FxHashMap order is not meaningful; pick the smallest id for stability
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.first().map(|t| Arc::clone(t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let templates: Vec<CardTemplate> = serde_json::from_str(content)?;
        let mut catalog = CardCatalog::new();
        for template in templates {
            if catalog.templates.contains_key(&template.id) {
                return Err(ClashError::InvalidCatalog(format!(
                    "duplicate template id '{}'",
                    template.id
                )));
            }
            catalog.insert(template);
        }
        Ok(catalog)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
