use itertools::Itertools;

use crate::logic::{attribute, ApiError};
use crate::model::{ElementId, ElementKind, ElementRef, Relation, Version};
use crate::store::Dataset;
use crate::xml::OsmDocument;

fn batch_parameter_error() -> ApiError {
    ApiError::BadRequest(
        "The parameter relations is required, and must be of the form relations=id[,id[,id...]]"
            .to_string(),
    )
}

fn attributed(dataset: &Dataset, mut document: OsmDocument) -> OsmDocument {
    attribute(dataset, &mut document);
    document
}

/// Current version of a relation that has not been deleted
fn visible_relation(dataset: &Dataset, id: ElementId) -> Result<&Relation, ApiError> {
    let relation = dataset
        .relation(id)
        .ok_or_else(|| ApiError::not_found(ElementKind::Relation, id))?;
    if !relation.visible {
        return Err(ApiError::gone(ElementKind::Relation, id));
    }
    Ok(relation)
}

pub fn read(dataset: &Dataset, id: ElementId) -> Result<OsmDocument, ApiError> {
    let relation = visible_relation(dataset, id)?.clone();
    Ok(attributed(dataset, OsmDocument::new().with_relation(relation)))
}

/// All stored versions, oldest first; deleted relations included
pub fn history(dataset: &Dataset, id: ElementId) -> Result<OsmDocument, ApiError> {
    let versions = dataset
        .relation_history(id)
        .ok_or_else(|| ApiError::not_found(ElementKind::Relation, id))?;
    let document = OsmDocument {
        relations: versions.to_vec(),
        ..OsmDocument::default()
    };
    Ok(attributed(dataset, document))
}

pub fn version(dataset: &Dataset, id: ElementId, version: Version) -> Result<OsmDocument, ApiError> {
    let relation = dataset.relation_version(id, version).cloned().ok_or_else(|| {
        ApiError::NotFound(format!(
            "The relation with the id {id} has no version {version}"
        ))
    })?;
    Ok(attributed(dataset, OsmDocument::new().with_relation(relation)))
}

/// Parse the `relations=1,2,3` query parameter. Empty segments are ignored
/// and duplicates collapse to the first occurrence.
fn parse_id_list(parameter: Option<&str>) -> Result<Vec<ElementId>, ApiError> {
    let ids: Vec<ElementId> = parameter
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ElementId>().map_err(|_| batch_parameter_error()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unique()
        .collect();
    if ids.is_empty() {
        return Err(batch_parameter_error());
    }
    Ok(ids)
}

/// GET /relations?relations=…. Deleted relations are returned with
/// `visible="false"`; any unknown id fails the whole request.
pub fn batch(dataset: &Dataset, parameter: Option<&str>) -> Result<OsmDocument, ApiError> {
    let relations = parse_id_list(parameter)?
        .into_iter()
        .map(|id| {
            dataset
                .relation(id)
                .cloned()
                .ok_or_else(|| ApiError::not_found(ElementKind::Relation, id))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let document = OsmDocument {
        relations,
        ..OsmDocument::default()
    };
    Ok(attributed(dataset, document))
}

/// Visible relations that list the element directly as a member
pub fn for_member(dataset: &Dataset, element: ElementRef) -> OsmDocument {
    let relations = dataset
        .relations_with_member(&element)
        .into_iter()
        .cloned()
        .collect();
    attributed(
        dataset,
        OsmDocument {
            relations,
            ..OsmDocument::default()
        },
    )
}

/// The relation plus its direct members. Ways bring their nodes along;
/// member relations are listed but not expanded. Deleted members are left out.
pub fn full(dataset: &Dataset, id: ElementId) -> Result<OsmDocument, ApiError> {
    let relation = visible_relation(dataset, id)?;

    let mut node_ids: Vec<ElementId> = Vec::new();
    let mut ways = Vec::new();
    let mut relations = vec![relation.clone()];
    for member in &relation.members {
        match member.kind {
            ElementKind::Node => node_ids.push(member.reference),
            ElementKind::Way => {
                if let Some(way) = dataset.way(member.reference).filter(|w| w.visible) {
                    node_ids.extend(way.nodes.iter().copied());
                    ways.push(way.clone());
                }
            }
            ElementKind::Relation => {
                if let Some(child) = dataset.relation(member.reference).filter(|r| r.visible) {
                    relations.push(child.clone());
                }
            }
        }
    }

    let nodes = node_ids
        .into_iter()
        .unique()
        .filter_map(|id| dataset.node(id))
        .filter(|n| n.visible)
        .cloned()
        .collect();
    let document = OsmDocument {
        nodes,
        ways: ways.into_iter().unique_by(|w| w.id).collect(),
        relations: relations.into_iter().unique_by(|r| r.id).collect(),
        changesets: Vec::new(),
        authors: Default::default(),
    };
    Ok(attributed(dataset, document))
}

pub fn read_node(dataset: &Dataset, id: ElementId) -> Result<OsmDocument, ApiError> {
    let node = dataset
        .node(id)
        .ok_or_else(|| ApiError::not_found(ElementKind::Node, id))?;
    if !node.visible {
        return Err(ApiError::gone(ElementKind::Node, id));
    }
    let document = OsmDocument {
        nodes: vec![node.clone()],
        ..OsmDocument::default()
    };
    Ok(attributed(dataset, document))
}

pub fn read_way(dataset: &Dataset, id: ElementId) -> Result<OsmDocument, ApiError> {
    let way = dataset
        .way(id)
        .ok_or_else(|| ApiError::not_found(ElementKind::Way, id))?;
    if !way.visible {
        return Err(ApiError::gone(ElementKind::Way, id));
    }
    let document = OsmDocument {
        ways: vec![way.clone()],
        ..OsmDocument::default()
    };
    Ok(attributed(dataset, document))
}
