use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{scale_coordinate, unscale_coordinate, ChangesetId, Tags, UserId};

/// Axis-aligned box in scaled coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: i64,
    pub min_lat: i64,
    pub max_lon: i64,
    pub max_lat: i64,
}

impl BoundingBox {
    pub fn point(lat: i64, lon: i64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    pub fn from_degrees(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon: scale_coordinate(min_lon),
            min_lat: scale_coordinate(min_lat),
            max_lon: scale_coordinate(max_lon),
            max_lat: scale_coordinate(max_lat),
        }
    }

    /// Grow this box to also cover `other`
    pub fn expand(&mut self, other: &BoundingBox) {
        self.min_lon = self.min_lon.min(other.min_lon);
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lon = self.max_lon.max(other.max_lon);
        self.max_lat = self.max_lat.max(other.max_lat);
    }

    pub fn union(mut self, other: &BoundingBox) -> Self {
        self.expand(other);
        self
    }

    /// Union of an arbitrary number of boxes, `None` when there are none
    pub fn enclosing<I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }

    /// (min_lon, min_lat, max_lon, max_lat) in degrees
    pub fn to_degrees(&self) -> (f64, f64, f64, f64) {
        (
            unscale_coordinate(self.min_lon),
            unscale_coordinate(self.min_lat),
            unscale_coordinate(self.max_lon),
            unscale_coordinate(self.max_lat),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
    pub id: ChangesetId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub num_changes: u64,
    pub bbox: Option<BoundingBox>,
    pub tags: Tags,
}

impl Changeset {
    pub fn new(id: ChangesetId, user_id: UserId, tags: Tags, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            created_at,
            closed_at: None,
            num_changes: 0,
            bbox: None,
            tags,
        }
    }

    /// Open means not closed by its owner and still below the element limit
    pub fn is_open(&self, max_elements: u64) -> bool {
        self.closed_at.is_none() && self.num_changes < max_elements
    }

    /// Merge `bbox` into the accumulated box. Closed changesets keep their box.
    pub fn expand(&mut self, bbox: &BoundingBox) {
        if self.closed_at.is_some() {
            return;
        }
        match self.bbox.as_mut() {
            Some(current) => current.expand(bbox),
            None => self.bbox = Some(*bbox),
        }
    }

    pub fn record_change(&mut self, bbox: Option<BoundingBox>) {
        self.num_changes += 1;
        if let Some(bbox) = bbox {
            self.expand(&bbox);
        }
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        self.closed_at = Some(at);
    }
}

/// A changeset as submitted on creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangesetPayload {
    pub tags: Tags,
}
