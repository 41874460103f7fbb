use std::collections::BTreeMap;

use aip_bag::PackageReader;
use aip_types::{DigitalObject, Handle, ObjectKind};

use crate::error::{PackResult, PackerError};

/// Name of the properties file inside `data/`.
pub const OBJECT_PROPERTIES: &str = "object.properties";

pub const BAG_TYPE: &str = "AIP";

const BAG_TYPE_KEY: &str = "bagType";
const OBJECT_TYPE_KEY: &str = "objectType";
const OBJECT_ID_KEY: &str = "objectId";
const OWNER_ID_KEY: &str = "ownerId";
const CHILD_IDS_KEY: &str = "childIds";

/// Identity and tree links recorded in a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectProperties {
    pub kind: ObjectKind,
    pub handle: Handle,
    pub owner: Option<Handle>,
    pub children: Vec<Handle>,
}

impl ObjectProperties {
    pub fn of(object: &DigitalObject) -> Self {
        Self {
            kind: object.kind,
            handle: object.handle.clone(),
            owner: object.parent.clone(),
            children: if object.kind.is_composite() {
                object.children.clone()
            } else {
                Vec::new()
            },
        }
    }

    /// `KEY  VALUE` lines for the properties file.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{BAG_TYPE_KEY}  {BAG_TYPE}"),
            format!("{OBJECT_TYPE_KEY}  {}", self.kind),
            format!("{OBJECT_ID_KEY}  {}", self.handle),
        ];
        if let Some(owner) = &self.owner {
            lines.push(format!("{OWNER_ID_KEY}  {owner}"));
        }
        if !self.children.is_empty() {
            let ids: Vec<&str> = self.children.iter().map(Handle::as_str).collect();
            lines.push(format!("{CHILD_IDS_KEY}  {}", ids.join(" ")));
        }
        lines
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> PackResult<Self> {
        let get = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        match get(BAG_TYPE_KEY) {
            Some(BAG_TYPE) => {}
            other => {
                return Err(PackerError::Properties(format!(
                    "unsupported bag type {other:?}"
                )))
            }
        }
        let kind = get(OBJECT_TYPE_KEY)
            .ok_or_else(|| PackerError::Properties(format!("missing {OBJECT_TYPE_KEY}")))?
            .parse()?;
        let handle = Handle::parse(
            get(OBJECT_ID_KEY)
                .ok_or_else(|| PackerError::Properties(format!("missing {OBJECT_ID_KEY}")))?,
        )?;
        let owner = get(OWNER_ID_KEY).map(Handle::parse).transpose()?;
        let children = get(CHILD_IDS_KEY)
            .map(|ids| ids.split_whitespace().map(Handle::parse).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            kind,
            handle,
            owner,
            children,
        })
    }

    /// Read the properties file of an opened package.
    pub fn read(reader: &PackageReader) -> PackResult<Self> {
        Self::from_map(&reader.read_properties(OBJECT_PROPERTIES)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(s: &str) -> Handle {
        Handle::parse(s).unwrap()
    }

    #[test]
    fn container_lines() {
        let object = DigitalObject::new(ObjectKind::Container, handle("1/2"))
            .with_parent(handle("1/0"))
            .with_child(handle("1/3"))
            .with_child(handle("1/4"));
        let lines = ObjectProperties::of(&object).to_lines();
        assert_eq!(
            lines,
            vec![
                "bagType  AIP",
                "objectType  container",
                "objectId  1/2",
                "ownerId  1/0",
                "childIds  1/3 1/4",
            ]
        );
    }

    #[test]
    fn parse_lines_back() {
        let props = ObjectProperties {
            kind: ObjectKind::Collection,
            handle: handle("1/3"),
            owner: Some(handle("1/2")),
            children: vec![handle("1/7")],
        };
        let map: BTreeMap<String, String> = props
            .to_lines()
            .iter()
            .filter_map(|l| l.split_once("  "))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(ObjectProperties::from_map(&map).unwrap(), props);
    }

    #[test]
    fn item_never_lists_children() {
        let mut object = DigitalObject::new(ObjectKind::Item, handle("1/7"));
        object.children.push(handle("1/8"));
        assert!(ObjectProperties::of(&object).children.is_empty());
    }

    #[test]
    fn rejects_foreign_bag_type() {
        let map = BTreeMap::from([
            ("bagType".to_string(), "SIP".to_string()),
            ("objectType".to_string(), "item".to_string()),
            ("objectId".to_string(), "1/7".to_string()),
        ]);
        assert!(matches!(
            ObjectProperties::from_map(&map),
            Err(PackerError::Properties(_))
        ));
    }

    #[test]
    fn missing_object_id() {
        let map = BTreeMap::from([
            ("bagType".to_string(), "AIP".to_string()),
            ("objectType".to_string(), "item".to_string()),
        ]);
        assert!(matches!(
            ObjectProperties::from_map(&map),
            Err(PackerError::Properties(_))
        ));
    }
}
