//! # Casting
//!
//! Normalizes loosely shaped caller input into typed entities.
//!
//! Input is described by [`Castable`], a closed set of shapes: existing
//! entities, property maps, labels (or relationship types), integers
//! (indices into a batch of entities), sequences and fixed-arity tuples.
//!
//! ```
//! use graph_entities::cast::{cast_node, cast_relationship, Castable};
//! use graph_entities::{Node, PropertyMap, Value};
//!
//! let bob = cast_node(PropertyMap::from([("name", "Bob")]).into()).unwrap();
//! assert_eq!(bob.get("name"), Some(Value::from("Bob")));
//!
//! let alice = Node::new();
//! let knows = cast_relationship((&alice, "KNOWS", &bob).into(), None).unwrap();
//! assert_eq!(knows.rel_type().as_deref(), Some("KNOWS"));
//! ```

use crate::model::{Entity, Node, Path, PropertyMap, Relationship};
use crate::{Error, Result};

/// A value that may be cast to an entity.
#[derive(Debug, Clone)]
pub enum Castable {
    Entity(Entity),
    Map(PropertyMap),
    /// A node label, or a relationship type in a tuple's type slot.
    Label(String),
    /// An index into a batch of entities.
    Integer(i64),
    Sequence(Vec<Castable>),
    Tuple(Vec<Castable>),
}

impl Castable {
    fn shape(&self) -> String {
        match self {
            Castable::Entity(e) => e.kind().to_owned(),
            Castable::Map(_) => "map".into(),
            Castable::Label(_) => "string".into(),
            Castable::Integer(_) => "integer".into(),
            Castable::Sequence(_) => "sequence".into(),
            Castable::Tuple(items) => format!("{}-tuple", items.len()),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Entity> for Castable {
    fn from(e: Entity) -> Self { Castable::Entity(e) }
}
impl From<Node> for Castable {
    fn from(n: Node) -> Self { Castable::Entity(Entity::Node(n)) }
}
impl From<&Node> for Castable {
    fn from(n: &Node) -> Self { Castable::Entity(Entity::Node(n.clone())) }
}
impl From<Relationship> for Castable {
    fn from(r: Relationship) -> Self { Castable::Entity(Entity::Relationship(r)) }
}
impl From<&Relationship> for Castable {
    fn from(r: &Relationship) -> Self { Castable::Entity(Entity::Relationship(r.clone())) }
}
impl From<Path> for Castable {
    fn from(p: Path) -> Self { Castable::Entity(Entity::Path(p)) }
}
impl From<PropertyMap> for Castable {
    fn from(m: PropertyMap) -> Self { Castable::Map(m) }
}
impl From<&str> for Castable {
    fn from(s: &str) -> Self { Castable::Label(s.to_owned()) }
}
impl From<String> for Castable {
    fn from(s: String) -> Self { Castable::Label(s) }
}
impl From<i64> for Castable {
    fn from(i: i64) -> Self { Castable::Integer(i) }
}
impl From<i32> for Castable {
    fn from(i: i32) -> Self { Castable::Integer(i64::from(i)) }
}
impl<T: Into<Castable>> From<Vec<T>> for Castable {
    fn from(items: Vec<T>) -> Self {
        Castable::Sequence(items.into_iter().map(Into::into).collect())
    }
}
impl<A: Into<Castable>, B: Into<Castable>> From<(A, B)> for Castable {
    fn from((a, b): (A, B)) -> Self {
        Castable::Tuple(vec![a.into(), b.into()])
    }
}
impl<A: Into<Castable>, B: Into<Castable>, C: Into<Castable>> From<(A, B, C)> for Castable {
    fn from((a, b, c): (A, B, C)) -> Self {
        Castable::Tuple(vec![a.into(), b.into(), c.into()])
    }
}
impl<A, B, C, D> From<(A, B, C, D)> for Castable
where
    A: Into<Castable>,
    B: Into<Castable>,
    C: Into<Castable>,
    D: Into<Castable>,
{
    fn from((a, b, c, d): (A, B, C, D)) -> Self {
        Castable::Tuple(vec![a.into(), b.into(), c.into(), d.into()])
    }
}

fn cannot_cast(expected: &str, value: &Castable) -> Error {
    Error::TypeCastError { expected: expected.into(), got: value.shape() }
}

// ============================================================================
// Casting
// ============================================================================

/// Cast any value to an entity. Entities pass through, maps become nodes
/// and 2- to 4-tuples become relationships.
pub fn cast(value: Castable) -> Result<Entity> {
    match value {
        Castable::Entity(e) => Ok(e),
        map @ Castable::Map(_) => cast_node(map).map(Entity::Node),
        Castable::Tuple(items) if (2..=4).contains(&items.len()) => {
            cast_relationship(Castable::Tuple(items), None).map(Entity::Relationship)
        }
        other => Err(cannot_cast("entity", &other)),
    }
}

/// Cast a value to a node. An existing node is returned unchanged;
/// anything else builds a fresh node where maps contribute properties,
/// strings contribute labels and sequences contribute each element.
pub fn cast_node(value: Castable) -> Result<Node> {
    if let Castable::Entity(Entity::Node(n)) = value {
        return Ok(n);
    }
    let node = Node::new();
    apply_to_node(&node, &value, &value)?;
    Ok(node)
}

fn apply_to_node(node: &Node, part: &Castable, whole: &Castable) -> Result<()> {
    match part {
        Castable::Map(props) => node.update(props.clone()),
        Castable::Label(label) => node.add_label(label.clone()),
        Castable::Sequence(items) | Castable::Tuple(items) => {
            for item in items {
                apply_to_node(node, item, whole)?;
            }
        }
        _ => return Err(cannot_cast("node", whole)),
    }
    Ok(())
}

/// Cast a value to a relationship.
///
/// Accepts `(start, type, end)` or `(start, type, end, properties)`. The
/// type slot may be a string, a `(string, map)` pair or an existing
/// relationship, whose type and properties are borrowed. Explicit
/// properties win over properties carried by the type slot.
///
/// With `entities`, integer endpoints index into that batch; negative
/// indices count from the end.
pub fn cast_relationship(value: Castable, entities: Option<&[Entity]>) -> Result<Relationship> {
    let items = match value {
        Castable::Entity(Entity::Relationship(r)) => return Ok(r),
        Castable::Tuple(items) if matches!(items.len(), 3 | 4) => items,
        other => return Err(cannot_cast("relationship tuple", &other)),
    };
    let mut items = items.into_iter();
    let (Some(start), Some(type_slot), Some(end)) = (items.next(), items.next(), items.next())
    else {
        return Err(Error::TypeCastError {
            expected: "relationship tuple".into(),
            got: "short tuple".into(),
        });
    };

    let (rel_type, mut properties) = type_and_properties(&type_slot)?;
    match items.next() {
        Some(Castable::Map(explicit)) => properties.update(explicit),
        Some(other) => return Err(cannot_cast("properties map", &other)),
        None => {}
    }

    let start = resolve_endpoint(start, entities)?;
    let end = resolve_endpoint(end, entities)?;
    Ok(Relationship::with_properties(&start, rel_type, &end, properties))
}

fn type_and_properties(slot: &Castable) -> Result<(String, PropertyMap)> {
    match slot {
        Castable::Label(t) => Ok((t.clone(), PropertyMap::new())),
        Castable::Tuple(pair) => match pair.as_slice() {
            [Castable::Label(t), Castable::Map(props)] => Ok((t.clone(), props.clone())),
            _ => Err(cannot_cast("relationship type", slot)),
        },
        Castable::Entity(Entity::Relationship(r)) => {
            let t = r.rel_type().ok_or_else(|| cannot_cast("relationship type", slot))?;
            Ok((t, r.properties()))
        }
        _ => Err(cannot_cast("relationship type", slot)),
    }
}

fn resolve_endpoint(value: Castable, entities: Option<&[Entity]>) -> Result<Node> {
    let Castable::Integer(index) = value else {
        return cast_node(value);
    };
    let entities = entities.ok_or_else(|| cannot_cast("node", &value))?;
    let len = entities.len() as i64;
    let position = if index < 0 { index + len } else { index };
    let entity = usize::try_from(position)
        .ok()
        .and_then(|i| entities.get(i))
        .ok_or_else(|| Error::TypeCastError {
            expected: format!("index into {len} entities"),
            got: index.to_string(),
        })?;
    entity.as_node().cloned().ok_or_else(|| Error::TypeCastError {
        expected: "node".into(),
        got: entity.kind().into(),
    })
}
