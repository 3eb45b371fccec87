use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::BTreeMap;

use crate::model::{
    ChangeAction, ChangeOperation, ChangesetPayload, ElementKind, Member, OsmChange,
    RelationPayload, Tags, MAX_STRING_LENGTH,
};
use crate::xml::XmlError;

type Attributes = BTreeMap<String, String>;

/// Everything of interest found in one pass over a document
#[derive(Debug, Default)]
struct Scan {
    root: Option<String>,
    relations: Vec<(Option<(ChangeOperation, bool)>, RelationPayload)>,
    changesets: Vec<ChangesetPayload>,
    foreign_elements: Vec<String>,
}

/// Parse the first `osm/relation` element of a request body
pub fn parse_relation(xml: &str) -> Result<RelationPayload, XmlError> {
    let scan = scan(xml)?;
    if scan.root.as_deref() != Some("osm") {
        return Err(XmlError::MissingElement("osm/relation"));
    }
    scan.relations
        .into_iter()
        .map(|(_, relation)| relation)
        .next()
        .ok_or(XmlError::MissingElement("osm/relation"))
}

/// Parse the first `osm/changeset` element of a request body
pub fn parse_changeset(xml: &str) -> Result<ChangesetPayload, XmlError> {
    let scan = scan(xml)?;
    if scan.root.as_deref() != Some("osm") {
        return Err(XmlError::MissingElement("osm/changeset"));
    }
    scan.changesets
        .into_iter()
        .next()
        .ok_or(XmlError::MissingElement("osm/changeset"))
}

/// Parse an osmChange document. Only relation elements are accepted.
pub fn parse_osm_change(xml: &str) -> Result<OsmChange, XmlError> {
    let scan = scan(xml)?;
    if scan.root.as_deref() != Some("osmChange") {
        return Err(XmlError::MissingElement("osmChange"));
    }
    if let Some(name) = scan.foreign_elements.first() {
        return Err(XmlError::Unsupported(format!(
            "Only relation elements can be uploaded, found a {name} element"
        )));
    }

    let mut change = OsmChange::new();
    for (block, relation) in scan.relations {
        let Some((operation, if_unused)) = block else {
            return Err(XmlError::Unsupported(
                "Relation elements must be inside a create, modify or delete block".to_string(),
            ));
        };
        change.actions.push(ChangeAction {
            operation,
            if_unused,
            relation,
        });
    }
    Ok(change)
}

fn scan(xml: &str) -> Result<Scan, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut scan = Scan::default();
    let mut block: Option<(ChangeOperation, bool)> = None;
    let mut relation: Option<RelationPayload> = None;
    let mut changeset: Option<ChangesetPayload> = None;

    loop {
        let event = reader.read_event()?;
        let (element, empty) = match &event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) => {
                match e.name().as_ref() {
                    b"relation" => {
                        if let Some(finished) = relation.take() {
                            scan.relations.push((block, finished));
                        }
                    }
                    b"changeset" => {
                        if let Some(finished) = changeset.take() {
                            scan.changesets.push(finished);
                        }
                    }
                    b"create" | b"modify" | b"delete" => block = None,
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let qname = element.name();
        let name = qname.as_ref();
        if scan.root.is_none() {
            scan.root = Some(String::from_utf8_lossy(name).into_owned());
        }

        match name {
            b"create" | b"modify" | b"delete" => {
                let operation = match name {
                    b"create" => ChangeOperation::Create,
                    b"modify" => ChangeOperation::Modify,
                    _ => ChangeOperation::Delete,
                };
                let if_unused = attributes(element)?.contains_key("if-unused");
                if !empty {
                    block = Some((operation, if_unused));
                }
            }
            b"relation" => {
                let header = relation_header(xml, &attributes(element)?)?;
                if empty {
                    scan.relations.push((block, header));
                } else {
                    relation = Some(header);
                }
            }
            b"member" => {
                if let Some(open) = relation.as_mut() {
                    open.members.push(member(xml, &attributes(element)?)?);
                }
            }
            b"tag" => {
                let attrs = attributes(element)?;
                if let Some(open) = relation.as_mut() {
                    let label = format!(
                        "relation/{}",
                        open.id.map(|id| id.to_string()).unwrap_or_default()
                    );
                    insert_tag(&mut open.tags, &attrs, &label)
                        .map_err(|e| relation_tag_error(xml, e))?;
                } else if let Some(open) = changeset.as_mut() {
                    insert_tag(&mut open.tags, &attrs, "changeset/")
                        .map_err(|e| changeset_tag_error(xml, e))?;
                }
            }
            b"changeset" => {
                if empty {
                    scan.changesets.push(ChangesetPayload::default());
                } else {
                    changeset = Some(ChangesetPayload::default());
                }
            }
            b"node" | b"way" => {
                scan.foreign_elements
                    .push(String::from_utf8_lossy(name).into_owned());
            }
            _ => {}
        }
    }

    Ok(scan)
}

fn attributes(element: &BytesStart<'_>) -> Result<Attributes, XmlError> {
    let mut attrs = Attributes::new();
    for attribute in element.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn bad_relation(xml: &str, reason: impl Into<String>) -> XmlError {
    XmlError::BadRelation {
        xml: xml.to_string(),
        reason: reason.into(),
    }
}

fn optional_integer(xml: &str, attrs: &Attributes, name: &str) -> Result<Option<i64>, XmlError> {
    attrs
        .get(name)
        .map(|value| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| bad_relation(xml, format!("Cannot parse {name} '{value}' as an integer")))
        })
        .transpose()
}

fn relation_header(xml: &str, attrs: &Attributes) -> Result<RelationPayload, XmlError> {
    Ok(RelationPayload {
        id: optional_integer(xml, attrs, "id")?,
        version: optional_integer(xml, attrs, "version")?,
        changeset: optional_integer(xml, attrs, "changeset")?,
        members: Vec::new(),
        tags: Tags::new(),
    })
}

fn member(xml: &str, attrs: &Attributes) -> Result<Member, XmlError> {
    let kind = attrs
        .get("type")
        .ok_or_else(|| bad_relation(xml, "Member type is missing"))?
        .parse::<ElementKind>()
        .map_err(|reason| bad_relation(xml, reason))?;
    let reference = optional_integer(xml, attrs, "ref")?
        .ok_or_else(|| bad_relation(xml, "Member ref is missing"))?;
    let role = attrs.get("role").cloned().unwrap_or_default();
    if role.chars().count() > MAX_STRING_LENGTH {
        return Err(bad_relation(
            xml,
            format!("Member role cannot be longer than {MAX_STRING_LENGTH} characters"),
        ));
    }
    Ok(Member::new(kind, reference, role))
}

enum TagError {
    Invalid(String),
    Duplicate { element: String, key: String },
}

fn insert_tag(tags: &mut Tags, attrs: &Attributes, element: &str) -> Result<(), TagError> {
    let key = attrs
        .get("k")
        .ok_or_else(|| TagError::Invalid("tag is missing key".to_string()))?;
    let value = attrs
        .get("v")
        .ok_or_else(|| TagError::Invalid(format!("tag is missing value for key {key}")))?;
    if key.chars().count() > MAX_STRING_LENGTH || value.chars().count() > MAX_STRING_LENGTH {
        return Err(TagError::Invalid(format!(
            "Tag keys and values cannot be longer than {MAX_STRING_LENGTH} characters"
        )));
    }
    if tags.contains_key(key) {
        return Err(TagError::Duplicate {
            element: element.to_string(),
            key: key.clone(),
        });
    }
    tags.insert(key.clone(), value.clone());
    Ok(())
}

fn relation_tag_error(xml: &str, error: TagError) -> XmlError {
    match error {
        TagError::Invalid(reason) => bad_relation(xml, reason),
        TagError::Duplicate { element, key } => XmlError::DuplicateTags { element, key },
    }
}

fn changeset_tag_error(xml: &str, error: TagError) -> XmlError {
    match error {
        TagError::Invalid(reason) => XmlError::BadChangeset {
            xml: xml.to_string(),
            reason,
        },
        TagError::Duplicate { element, key } => XmlError::DuplicateTags { element, key },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_keeps_member_order_and_duplicates() {
        let xml = r#"<osm>
 <relation changeset='4'>
  <member ref='1' type='node' role='forward'/>
  <member ref='2' type='node' role='forward'/>
  <member ref='1' type='node' role='forward'/>
  <member ref='9' type='way'/>
  <tag k='type' v='route'/>
 </relation>
</osm>"#;
        let relation = parse_relation(xml).unwrap();

        assert_eq!(relation.changeset, Some(4));
        assert_eq!(relation.id, None);
        assert_eq!(
            relation.members,
            vec![
                Member::new(ElementKind::Node, 1, "forward"),
                Member::new(ElementKind::Node, 2, "forward"),
                Member::new(ElementKind::Node, 1, "forward"),
                Member::new(ElementKind::Way, 9, ""),
            ]
        );
        assert_eq!(relation.tags.get("type").map(String::as_str), Some("route"));
    }

    #[test]
    fn unknown_member_type_is_rejected() {
        let xml = "<osm><relation changeset='1'><member type='type' ref='1' role=''/>\
                   <tag k='tester' v='yep'/></relation></osm>";
        let message = parse_relation(xml).unwrap_err().to_string();

        assert!(message.starts_with("Cannot parse valid relation from xml string"), "{message}");
        assert!(message.contains("The type is not allowed only, "), "{message}");
    }

    #[test]
    fn duplicate_tag_keys_are_rejected() {
        let xml = "<osm><relation id='3' changeset='1'><tag k='a' v='1'/><tag k='a' v='2'/></relation></osm>";
        let err = parse_relation(xml).unwrap_err();
        assert_eq!(err.to_string(), "Element relation/3 has duplicate tags with key a");
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let xml = r#"<osm><relation changeset="1"><tag k="name" v="Fish &amp; Chips"/></relation></osm>"#;
        let relation = parse_relation(xml).unwrap();
        assert_eq!(relation.tags["name"], "Fish & Chips");
    }

    #[test]
    fn missing_relation_element_is_reported() {
        assert!(matches!(
            parse_relation(""),
            Err(XmlError::MissingElement("osm/relation"))
        ));
        assert!(matches!(
            parse_relation("<osm><node id='1'/></osm>"),
            Err(XmlError::MissingElement("osm/relation"))
        ));
        assert!(matches!(
            parse_relation("<relation id='1'/>"),
            Err(XmlError::MissingElement("osm/relation"))
        ));
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        let err = parse_relation("<osm><relation id='abc'/></osm>").unwrap_err();
        assert!(err.to_string().contains("Cannot parse id 'abc'"));
    }

    #[test]
    fn changeset_tags_are_collected() {
        let xml = "<osm><changeset><tag k='comment' v='fix route'/></changeset></osm>";
        let changeset = parse_changeset(xml).unwrap();
        assert_eq!(changeset.tags["comment"], "fix route");

        assert_eq!(parse_changeset("<osm><changeset/></osm>").unwrap(), ChangesetPayload::default());
    }

    #[test]
    fn osm_change_keeps_blocks_in_order() {
        let xml = r#"<osmChange version="0.6">
  <create><relation id="-1" changeset="5"><member type="node" ref="2"/></relation></create>
  <modify><relation id="7" version="2" changeset="5"><tag k="a" v="b"/></relation></modify>
  <delete if-unused="true"><relation id="8" version="1" changeset="5"/></delete>
</osmChange>"#;
        let change = parse_osm_change(xml).unwrap();
        let operations: Vec<_> = change
            .actions
            .iter()
            .map(|a| (a.operation, a.if_unused, a.relation.id))
            .collect();

        assert_eq!(
            operations,
            vec![
                (ChangeOperation::Create, false, Some(-1)),
                (ChangeOperation::Modify, false, Some(7)),
                (ChangeOperation::Delete, true, Some(8)),
            ]
        );
    }

    #[test]
    fn osm_change_rejects_node_elements() {
        let xml = r#"<osmChange><modify><node id="1" lat="0" lon="0"/></modify></osmChange>"#;
        assert!(matches!(parse_osm_change(xml), Err(XmlError::Unsupported(_))));
    }
}
