pub mod auth;
pub mod changeset_ops;
pub mod diff_upload;
pub mod error;
pub mod relation_ops;
pub mod relation_queries;

pub use auth::*;
pub use error::*;

use crate::store::Dataset;
use crate::xml::{Author, OsmDocument};

/// Name the authors of every changeset a document references. Users who
/// keep their edits private stay anonymous.
pub(crate) fn attribute(dataset: &Dataset, document: &mut OsmDocument) {
    for changeset_id in document.changeset_ids() {
        if let Some(user) = dataset
            .author_of(changeset_id)
            .filter(|u| u.data_public)
        {
            document.authors.insert(changeset_id, Author::from(user));
        }
    }
}
