//! Card catalog and deck loaders

pub mod catalog;
pub mod deck;

pub use catalog::CardCatalog;
pub use deck::{DeckEntry, DeckList, DeckLoader};
