pub mod xml_document;

pub use xml_document::{DocumentQuery, XmlDocument};
