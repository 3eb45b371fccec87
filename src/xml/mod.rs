//! OSM API 0.6 XML documents: parsing what clients upload and rendering what
//! the API returns.

pub mod reader;
pub mod writer;

pub use reader::*;
pub use writer::*;

pub const API_VERSION: &str = "0.6";
pub const GENERATOR: &str = "relation-api";

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("Cannot parse valid relation from xml string {xml}. {reason}")]
    BadRelation { xml: String, reason: String },

    #[error("Cannot parse valid changeset from xml string {xml}. {reason}")]
    BadChangeset { xml: String, reason: String },

    #[error("Element {element} has duplicate tags with key {key}")]
    DuplicateTags { element: String, key: String },

    #[error("XML doesn't contain an {0} element.")]
    MissingElement(&'static str),

    #[error("{0}")]
    Unsupported(String),

    #[error("Malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Rendered document is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
