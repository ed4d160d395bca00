/*!
 * Value types for translation memory content.
 */

pub mod segment;
pub mod unit;

pub use segment::{Element, Node, Segment};
pub use unit::{
    ALL_LANGUAGES, Header, Note, Property, TranslationUnit, TranslationUnitVariant,
};
