/*!
 * TMX reading and writing.
 */

pub mod reader;
pub mod writer;

pub use reader::{TmxEvent, TmxReader, parse_element, parse_segment};
pub use writer::{Layout, TmxWriter};
