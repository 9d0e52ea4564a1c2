// Entity Models
//
// Plain value records shared by the extractor, the store and the pricing
// engine. No entity holds a live store handle.

pub mod category;
pub mod fx;
pub mod item;

pub use category::{registry_key, title_case, Category, CategoryId, CategoryRegistry};
pub use fx::FxTable;
pub use item::{Item, ItemEdit, ItemId, NewItem};
