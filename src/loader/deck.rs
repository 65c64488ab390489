//! Deck file loader (.dck format)

use crate::core::TemplateId;
use crate::loader::CardCatalog;
use crate::{ClashError, Result};
use std::fs;
use std::path::Path;

/// Deck loader for .dck files
pub struct DeckLoader;

impl DeckLoader {
    pub fn load_from_file(path: &Path) -> Result<DeckList> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a deck from its text content
    pub fn parse(content: &str) -> Result<DeckList> {
        let mut entries = Vec::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }

            // Format: "3 Card Name"
            let Some((count_str, rest)) = line.split_once(' ') else {
                return Err(ClashError::InvalidDeckFormat(format!(
                    "expected '<count> <card name>', got '{line}'"
                )));
            };
            let count = count_str.parse::<u8>().map_err(|_| {
                ClashError::InvalidDeckFormat(format!("bad card count in '{line}'"))
            })?;

            entries.push(DeckEntry {
                card_name: rest.trim().to_string(),
                count,
            });
        }

        if entries.is_empty() {
            return Err(ClashError::InvalidDeckFormat("Empty deck".to_string()));
        }

        Ok(DeckList { entries })
    }
}

#[derive(Debug, Clone)]
pub struct DeckEntry {
    pub card_name: String,
    pub count: u8,
}

#[derive(Debug, Clone)]
pub struct DeckList {
    pub entries: Vec<DeckEntry>,
}

impl DeckList {
    pub fn total_cards(&self) -> usize {
        self.entries.iter().map(|e| e.count as usize).sum()
    }

    /// Expand to template ids in file order (deck order before shuffling)
    pub fn resolve(&self, catalog: &CardCatalog) -> Result<Vec<TemplateId>> {
        let mut ids = Vec::with_capacity(self.total_cards());
        for entry in &self.entries {
            let template = catalog
                .find_by_name(&entry.card_name)
                .ok_or_else(|| ClashError::UnknownTemplate(entry.card_name.clone()))?;
            for _ in 0..entry.count {
                ids.push(template.id.clone());
            }
        }
        Ok(ids)
    }
}
