use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;

use crate::model::{
    unscale_coordinate, ChangeOperation, Changeset, ChangesetId, ChangesetPayload, DiffResult,
    Member, Node, OsmChange, Relation, RelationPayload, Tags, User, UserId, Way,
};
use crate::xml::{XmlError, API_VERSION, GENERATOR};

/// Public name shown next to elements edited by a user
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub uid: UserId,
    pub display_name: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            uid: user.id,
            display_name: user.display_name.clone(),
        }
    }
}

/// A response document: elements in output order, plus the authors of
/// the changesets they were written in
#[derive(Debug, Clone, Default)]
pub struct OsmDocument {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
    pub changesets: Vec<Changeset>,
    pub authors: BTreeMap<ChangesetId, Author>,
}

impl OsmDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Ids of every changeset referenced by the document
    pub fn changeset_ids(&self) -> Vec<ChangesetId> {
        let mut ids: Vec<ChangesetId> = self
            .nodes
            .iter()
            .map(|n| n.changeset_id)
            .chain(self.ways.iter().map(|w| w.changeset_id))
            .chain(self.relations.iter().map(|r| r.changeset_id))
            .chain(self.changesets.iter().map(|c| c.id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn coordinate(scaled: i64) -> String {
    format!("{:.7}", unscale_coordinate(scaled))
}

fn begin(writer: &mut XmlWriter, root: BytesStart<'_>) -> Result<(), XmlError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(root))?;
    Ok(())
}

fn finish(mut writer: XmlWriter, root: &str) -> Result<String, XmlError> {
    writer.write_event(Event::End(BytesEnd::new(root)))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn osm_root() -> BytesStart<'static> {
    let mut root = BytesStart::new("osm");
    root.push_attribute(("version", API_VERSION));
    root.push_attribute(("generator", GENERATOR));
    root
}

/// Write `start` as an empty element, or wrap `children` in it
fn element<F>(writer: &mut XmlWriter, start: BytesStart<'_>, has_children: bool, children: F) -> Result<(), XmlError>
where
    F: FnOnce(&mut XmlWriter) -> Result<(), XmlError>,
{
    if !has_children {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    children(writer)?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

fn write_tags(writer: &mut XmlWriter, tags: &Tags) -> Result<(), XmlError> {
    for (key, value) in tags {
        let mut tag = BytesStart::new("tag");
        tag.push_attribute(("k", key.as_str()));
        tag.push_attribute(("v", value.as_str()));
        writer.write_event(Event::Empty(tag))?;
    }
    Ok(())
}

fn write_members(writer: &mut XmlWriter, members: &[Member]) -> Result<(), XmlError> {
    for m in members {
        let mut member = BytesStart::new("member");
        member.push_attribute(("type", m.kind.as_str()));
        member.push_attribute(("ref", m.reference.to_string().as_str()));
        member.push_attribute(("role", m.role.as_str()));
        writer.write_event(Event::Empty(member))?;
    }
    Ok(())
}

fn common_attributes(
    start: &mut BytesStart<'_>,
    visible: bool,
    version: i64,
    changeset_id: ChangesetId,
    at: &DateTime<Utc>,
    author: Option<&Author>,
) {
    start.push_attribute(("visible", if visible { "true" } else { "false" }));
    start.push_attribute(("version", version.to_string().as_str()));
    start.push_attribute(("changeset", changeset_id.to_string().as_str()));
    start.push_attribute(("timestamp", timestamp(at).as_str()));
    if let Some(author) = author {
        start.push_attribute(("user", author.display_name.as_str()));
        start.push_attribute(("uid", author.uid.to_string().as_str()));
    }
}

fn write_node(writer: &mut XmlWriter, node: &Node, author: Option<&Author>) -> Result<(), XmlError> {
    let mut start = BytesStart::new("node");
    start.push_attribute(("id", node.id.to_string().as_str()));
    common_attributes(&mut start, node.visible, node.version, node.changeset_id, &node.timestamp, author);
    if node.visible {
        start.push_attribute(("lat", coordinate(node.lat).as_str()));
        start.push_attribute(("lon", coordinate(node.lon).as_str()));
    }
    element(writer, start, !node.tags.is_empty(), |w| write_tags(w, &node.tags))
}

fn write_way(writer: &mut XmlWriter, way: &Way, author: Option<&Author>) -> Result<(), XmlError> {
    let mut start = BytesStart::new("way");
    start.push_attribute(("id", way.id.to_string().as_str()));
    common_attributes(&mut start, way.visible, way.version, way.changeset_id, &way.timestamp, author);
    let has_children = !way.nodes.is_empty() || !way.tags.is_empty();
    element(writer, start, has_children, |w| {
        for id in &way.nodes {
            let mut nd = BytesStart::new("nd");
            nd.push_attribute(("ref", id.to_string().as_str()));
            w.write_event(Event::Empty(nd))?;
        }
        write_tags(w, &way.tags)
    })
}

fn write_relation(writer: &mut XmlWriter, relation: &Relation, author: Option<&Author>) -> Result<(), XmlError> {
    let mut start = BytesStart::new("relation");
    start.push_attribute(("id", relation.id.to_string().as_str()));
    common_attributes(
        &mut start,
        relation.visible,
        relation.version,
        relation.changeset_id,
        &relation.timestamp,
        author,
    );
    let has_children = !relation.members.is_empty() || !relation.tags.is_empty();
    element(writer, start, has_children, |w| {
        write_members(w, &relation.members)?;
        write_tags(w, &relation.tags)
    })
}

fn write_changeset(writer: &mut XmlWriter, changeset: &Changeset, author: Option<&Author>, open: bool) -> Result<(), XmlError> {
    let mut start = BytesStart::new("changeset");
    start.push_attribute(("id", changeset.id.to_string().as_str()));
    start.push_attribute(("created_at", timestamp(&changeset.created_at).as_str()));
    if let Some(closed_at) = &changeset.closed_at {
        start.push_attribute(("closed_at", timestamp(closed_at).as_str()));
    }
    start.push_attribute(("open", if open { "true" } else { "false" }));
    if let Some(author) = author {
        start.push_attribute(("user", author.display_name.as_str()));
        start.push_attribute(("uid", author.uid.to_string().as_str()));
    }
    if let Some(bbox) = &changeset.bbox {
        start.push_attribute(("min_lon", coordinate(bbox.min_lon).as_str()));
        start.push_attribute(("min_lat", coordinate(bbox.min_lat).as_str()));
        start.push_attribute(("max_lon", coordinate(bbox.max_lon).as_str()));
        start.push_attribute(("max_lat", coordinate(bbox.max_lat).as_str()));
    }
    start.push_attribute(("num_changes", changeset.num_changes.to_string().as_str()));
    element(writer, start, !changeset.tags.is_empty(), |w| write_tags(w, &changeset.tags))
}

/// Render a response document. `max_changeset_elements` decides the `open`
/// flag of any changesets it contains.
pub fn render(document: &OsmDocument, max_changeset_elements: u64) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    begin(&mut writer, osm_root())?;

    let author = |changeset_id: ChangesetId| document.authors.get(&changeset_id);
    for changeset in &document.changesets {
        write_changeset(
            &mut writer,
            changeset,
            author(changeset.id),
            changeset.is_open(max_changeset_elements),
        )?;
    }
    for node in &document.nodes {
        write_node(&mut writer, node, author(node.changeset_id))?;
    }
    for way in &document.ways {
        write_way(&mut writer, way, author(way.changeset_id))?;
    }
    for relation in &document.relations {
        write_relation(&mut writer, relation, author(relation.changeset_id))?;
    }

    finish(writer, "osm")
}

/// Render the `diffResult` answer to an upload
pub fn render_diff_result(results: &[DiffResult]) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut root = BytesStart::new("diffResult");
    root.push_attribute(("version", API_VERSION));
    root.push_attribute(("generator", GENERATOR));
    begin(&mut writer, root)?;

    for result in results {
        let mut relation = BytesStart::new("relation");
        relation.push_attribute(("old_id", result.old_id.to_string().as_str()));
        if let Some(new_id) = result.new_id {
            relation.push_attribute(("new_id", new_id.to_string().as_str()));
        }
        if let Some(new_version) = result.new_version {
            relation.push_attribute(("new_version", new_version.to_string().as_str()));
        }
        writer.write_event(Event::Empty(relation))?;
    }

    finish(writer, "diffResult")
}

fn payload_start(relation: &RelationPayload) -> BytesStart<'static> {
    let mut start = BytesStart::new("relation");
    if let Some(id) = relation.id {
        start.push_attribute(("id", id.to_string().as_str()));
    }
    if let Some(version) = relation.version {
        start.push_attribute(("version", version.to_string().as_str()));
    }
    if let Some(changeset) = relation.changeset {
        start.push_attribute(("changeset", changeset.to_string().as_str()));
    }
    start
}

fn write_payload(writer: &mut XmlWriter, relation: &RelationPayload) -> Result<(), XmlError> {
    let has_children = !relation.members.is_empty() || !relation.tags.is_empty();
    element(writer, payload_start(relation), has_children, |w| {
        write_members(w, &relation.members)?;
        write_tags(w, &relation.tags)
    })
}

/// Request body for relation create/update/delete
pub fn render_relation_payload(relation: &RelationPayload) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    begin(&mut writer, osm_root())?;
    write_payload(&mut writer, relation)?;
    finish(writer, "osm")
}

/// Request body for changeset creation
pub fn render_changeset_payload(changeset: &ChangesetPayload) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    begin(&mut writer, osm_root())?;
    element(
        &mut writer,
        BytesStart::new("changeset"),
        !changeset.tags.is_empty(),
        |w| write_tags(w, &changeset.tags),
    )?;
    finish(writer, "osm")
}

/// Request body for a diff upload
pub fn render_osm_change(change: &OsmChange) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    let mut root = BytesStart::new("osmChange");
    root.push_attribute(("version", API_VERSION));
    root.push_attribute(("generator", GENERATOR));
    begin(&mut writer, root)?;

    // one block per action keeps document order intact across operations
    for action in &change.actions {
        let name = action.operation.to_string();
        let mut block = BytesStart::new(name.as_str());
        if action.operation == ChangeOperation::Delete && action.if_unused {
            block.push_attribute(("if-unused", "true"));
        }
        element(&mut writer, block, true, |w| write_payload(w, &action.relation))?;
    }

    finish(writer, "osmChange")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, ElementKind};
    use crate::xml::{parse_osm_change, parse_relation};

    fn sample_relation() -> Relation {
        let mut tags = Tags::new();
        tags.insert("type".into(), "route".into());
        Relation {
            id: 12,
            version: 3,
            visible: true,
            changeset_id: 4,
            timestamp: Utc::now(),
            members: vec![
                Member::new(ElementKind::Way, 2, "outer"),
                Member::new(ElementKind::Node, 1, ""),
            ],
            tags,
        }
    }

    #[test]
    fn relation_renders_with_root_attributes() {
        let document = OsmDocument::new().with_relation(sample_relation());
        let xml = render(&document, 10).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<osm version="0.6" generator="relation-api">"#));
        assert!(xml.contains(r#"<relation id="12" visible="true" version="3" changeset="4""#));
        assert!(xml.contains(r#"<member type="way" ref="2" role="outer"/>"#));
        assert!(xml.contains(r#"<tag k="type" v="route"/>"#));
    }

    #[test]
    fn rendered_relation_reads_back_as_payload() {
        let relation = sample_relation();
        let xml = render(&OsmDocument::new().with_relation(relation.clone()), 10).unwrap();
        let parsed = parse_relation(&xml).unwrap();
        assert_eq!(parsed, RelationPayload::from(&relation));
    }

    #[test]
    fn author_attributes_come_from_the_changeset() {
        let mut document = OsmDocument::new().with_relation(sample_relation());
        document.authors.insert(
            4,
            Author {
                uid: 9,
                display_name: "alice".into(),
            },
        );
        let xml = render(&document, 10).unwrap();
        assert!(xml.contains(r#"user="alice" uid="9""#));
    }

    #[test]
    fn changeset_renders_bbox_with_seven_decimals() {
        let mut changeset = Changeset::new(5, 1, Tags::new(), Utc::now());
        changeset.record_change(Some(BoundingBox::from_degrees(3.0, 3.0, 5.0, 5.0)));
        let document = OsmDocument {
            changesets: vec![changeset],
            ..OsmDocument::default()
        };
        let xml = render(&document, 10).unwrap();

        assert!(xml.contains(r#"open="true""#));
        assert!(xml.contains(r#"min_lon="3.0000000" min_lat="3.0000000" max_lon="5.0000000" max_lat="5.0000000""#));
        assert!(xml.contains(r#"num_changes="1""#));
    }

    #[test]
    fn osm_change_payload_reads_back() {
        let change = OsmChange::new()
            .create(RelationPayload::new().with_id(-1).in_changeset(3).tag("a", "b"))
            .delete(RelationPayload::new().with_id(5).with_version(2).in_changeset(3), true);
        let xml = render_osm_change(&change).unwrap();
        assert_eq!(parse_osm_change(&xml).unwrap(), change);
    }

    #[test]
    fn diff_result_omits_missing_fields() {
        let xml = render_diff_result(&[
            DiffResult {
                old_id: -1,
                new_id: Some(10),
                new_version: Some(1),
            },
            DiffResult {
                old_id: 5,
                new_id: None,
                new_version: None,
            },
        ])
        .unwrap();
        assert!(xml.contains(r#"<relation old_id="-1" new_id="10" new_version="1"/>"#));
        assert!(xml.contains(r#"<relation old_id="5"/>"#));
    }
}
