use std::fmt;
use std::io::{BufRead, Write};

use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use uuid::Uuid;

use crate::error::{RoleError, RoleResult};
use crate::graph::{Association, Group, Person, RoleGraph};

/// Conventional file name of the role document inside a package.
pub const ROLES_XML: &str = "roles.xml";

fn malformed(e: impl fmt::Display) -> RoleError {
    RoleError::Malformed(e.to_string())
}

/// Serialize a role graph as a `<RoleGraph>` document.
pub fn write_roles<W: Write>(out: W, graph: &RoleGraph) -> RoleResult<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(malformed)?;

    let mut root = BytesStart::new("RoleGraph");
    let source = graph.source.map(|s| s.to_string());
    if let Some(source) = &source {
        root.push_attribute(("source", source.as_str()));
    }
    writer.write_event(Event::Start(root)).map_err(malformed)?;

    writer
        .write_event(Event::Start(BytesStart::new("Groups")))
        .map_err(malformed)?;
    for group in &graph.groups {
        let id = group.id.to_string();
        let mut start = BytesStart::new("Group");
        start.push_attribute(("id", id.as_str()));
        start.push_attribute(("name", group.name.as_str()));
        if group.people.is_empty() && group.groups.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(malformed)?;
            continue;
        }
        writer.write_event(Event::Start(start)).map_err(malformed)?;
        for person in &group.people {
            let person = person.to_string();
            let mut member = BytesStart::new("Member");
            member.push_attribute(("person", person.as_str()));
            writer.write_event(Event::Empty(member)).map_err(malformed)?;
        }
        for nested in &group.groups {
            let nested = nested.to_string();
            let mut member = BytesStart::new("MemberGroup");
            member.push_attribute(("group", nested.as_str()));
            writer.write_event(Event::Empty(member)).map_err(malformed)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Group")))
            .map_err(malformed)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("Groups")))
        .map_err(malformed)?;

    writer
        .write_event(Event::Start(BytesStart::new("People")))
        .map_err(malformed)?;
    for person in &graph.people {
        let id = person.id.to_string();
        let can_login = person.can_login.to_string();
        let mut start = BytesStart::new("Person");
        start.push_attribute(("id", id.as_str()));
        start.push_attribute(("email", person.email.as_str()));
        for (key, value) in [
            ("netid", &person.netid),
            ("firstName", &person.first_name),
            ("lastName", &person.last_name),
            ("language", &person.language),
        ] {
            if let Some(value) = value {
                start.push_attribute((key, value.as_str()));
            }
        }
        start.push_attribute(("canLogin", can_login.as_str()));
        writer.write_event(Event::Empty(start)).map_err(malformed)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("People")))
        .map_err(malformed)?;

    writer
        .write_event(Event::Start(BytesStart::new("Associations")))
        .map_err(malformed)?;
    for association in &graph.associations {
        let group = association.group.to_string();
        let mut start = BytesStart::new("Association");
        start.push_attribute(("group", group.as_str()));
        start.push_attribute(("role", association.role.as_str()));
        writer.write_event(Event::Empty(start)).map_err(malformed)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("Associations")))
        .map_err(malformed)?;

    writer
        .write_event(Event::End(BytesEnd::new("RoleGraph")))
        .map_err(malformed)?;
    writer.into_inner().flush()?;
    Ok(())
}

/// Serialize to an in-memory buffer.
pub fn roles_to_vec(graph: &RoleGraph) -> RoleResult<Vec<u8>> {
    let mut out = Vec::new();
    write_roles(&mut out, graph)?;
    Ok(out)
}

/// Parse a `<RoleGraph>` document.
pub fn read_roles<R: BufRead>(input: R) -> RoleResult<RoleGraph> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut graph = RoleGraph::default();
    let mut saw_root = false;
    let mut open_group: Option<Group> = None;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(malformed)?;
        let (start, is_empty) = match event {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(end) => {
                if end.name().as_ref() == b"Group" {
                    if let Some(group) = open_group.take() {
                        graph.groups.push(group);
                    }
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let attrs = attribute_map(start.attributes())?;
        match start.name().as_ref() {
            b"RoleGraph" => {
                saw_root = true;
                if let Some(source) = lookup(&attrs, "source") {
                    graph.source = Some(parse_uuid(source)?);
                }
            }
            b"Groups" | b"People" | b"Associations" if saw_root => {}
            b"Group" if saw_root => {
                let group = Group {
                    id: parse_uuid(required(&attrs, "id")?)?,
                    name: required(&attrs, "name")?.to_string(),
                    people: Vec::new(),
                    groups: Vec::new(),
                };
                if is_empty {
                    graph.groups.push(group);
                } else {
                    open_group = Some(group);
                }
            }
            b"Member" => {
                let group = open_group
                    .as_mut()
                    .ok_or_else(|| malformed("<Member> outside <Group>"))?;
                group.people.push(parse_uuid(required(&attrs, "person")?)?);
            }
            b"MemberGroup" => {
                let group = open_group
                    .as_mut()
                    .ok_or_else(|| malformed("<MemberGroup> outside <Group>"))?;
                group.groups.push(parse_uuid(required(&attrs, "group")?)?);
            }
            b"Person" if saw_root => {
                let optional = |key: &str| lookup(&attrs, key).map(str::to_string);
                graph.people.push(Person {
                    id: parse_uuid(required(&attrs, "id")?)?,
                    email: required(&attrs, "email")?.to_string(),
                    netid: optional("netid"),
                    first_name: optional("firstName"),
                    last_name: optional("lastName"),
                    language: optional("language"),
                    can_login: lookup(&attrs, "canLogin") != Some("false"),
                });
            }
            b"Association" if saw_root => {
                graph.associations.push(Association {
                    group: parse_uuid(required(&attrs, "group")?)?,
                    role: required(&attrs, "role")?.parse()?,
                });
            }
            other => {
                return Err(malformed(format!(
                    "unexpected element <{}>",
                    String::from_utf8_lossy(other)
                )))
            }
        }
    }

    if !saw_root {
        return Err(malformed("missing <RoleGraph> root"));
    }
    if open_group.is_some() {
        return Err(malformed("unterminated <Group>"));
    }
    Ok(graph)
}

fn attribute_map(attributes: Attributes<'_>) -> RoleResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(malformed)?;
        out.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value().map_err(malformed)?.into_owned(),
        ));
    }
    Ok(out)
}

fn lookup<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn required<'a>(attrs: &'a [(String, String)], key: &str) -> RoleResult<&'a str> {
    lookup(attrs, key).ok_or_else(|| malformed(format!("missing attribute {key:?}")))
}

fn parse_uuid(value: &str) -> RoleResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| malformed(format!("invalid id {value:?}: {e}")))
}
