use serde::{Deserialize, Serialize};

pub type ElementId = i64;
pub type ChangesetId = i64;
pub type UserId = i64;
pub type Version = i64;

/// Coordinates are stored as fixed-point integers, 10^7 units per degree
pub const COORDINATE_SCALE: i64 = 10_000_000;

/// Longest key, value or role accepted in an uploaded document
pub const MAX_STRING_LENGTH: usize = 255;

pub fn scale_coordinate(degrees: f64) -> i64 {
    (degrees * COORDINATE_SCALE as f64).round() as i64
}

pub fn unscale_coordinate(scaled: i64) -> f64 {
    scaled as f64 / COORDINATE_SCALE as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub const ALL: [ElementKind; 3] = [ElementKind::Node, ElementKind::Way, ElementKind::Relation];

    /// Capitalised name used in user-facing messages ("Node with id 3")
    pub fn title(&self) -> &'static str {
        match self {
            ElementKind::Node => "Node",
            ElementKind::Way => "Way",
            ElementKind::Relation => "Relation",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(ElementKind::Node),
            "way" => Ok(ElementKind::Way),
            "relation" => Ok(ElementKind::Relation),
            _ => Err(format!(
                "The {} is not allowed only, {} allowed",
                s,
                ElementKind::ALL.map(|k| k.as_str()).join(", ")
            )),
        }
    }
}

/// A typed pointer at an element, independent of version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: ElementId,
}

impl ElementRef {
    pub fn new(kind: ElementKind, id: ElementId) -> Self {
        Self { kind, id }
    }

    pub fn node(id: ElementId) -> Self {
        Self::new(ElementKind::Node, id)
    }

    pub fn way(id: ElementId) -> Self {
        Self::new(ElementKind::Way, id)
    }

    pub fn relation(id: ElementId) -> Self {
        Self::new(ElementKind::Relation, id)
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} with id {}", self.kind.title(), self.id)
    }
}
