#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};

use tessel_core::{
    Arguments, BindError, Bound, DiscriminatorPlacement, FromBound, HasSchema, Introspected,
    PropertySlot, PropertyType, PropertyValue, SchemaRegistry, SubtypeInfo, ToProperty, TypeKey,
    TypeSchema, downcast_ref,
};
use tessel_format::{
    Codec, Decoder, Encoder, Mapper, Result, ScalarValue, SerdeConfig, SerdeErrorKind, Token,
    TokenBuffer, Value,
};

pub const PERSON: TypeKey = TypeKey("Person");
pub const POINT: TypeKey = TypeKey("Point");
pub const LINE: TypeKey = TypeKey("Line");
pub const SHAPE: TypeKey = TypeKey("Shape");
pub const WRAPPED_SHAPE: TypeKey = TypeKey("WrappedShape");
pub const EXTERNAL_SHAPE: TypeKey = TypeKey("ExternalShape");
pub const CIRCLE: TypeKey = TypeKey("Circle");
pub const SQUARE: TypeKey = TypeKey("Square");
pub const ROUNDED_SQUARE: TypeKey = TypeKey("RoundedSquare");
pub const CANVAS: TypeKey = TypeKey("Canvas");
pub const DRAWING: TypeKey = TypeKey("Drawing");
pub const EVENT: TypeKey = TypeKey("Event");
pub const CLICK: TypeKey = TypeKey("Click");
pub const NODE: TypeKey = TypeKey("Node");
pub const LEAF: TypeKey = TypeKey("Leaf");
pub const GROUP: TypeKey = TypeKey("Group");
pub const GRID: TypeKey = TypeKey("Grid");
pub const ACCOUNT: TypeKey = TypeKey("Account");
pub const USER: TypeKey = TypeKey("User");
pub const ADDRESS: TypeKey = TypeKey("Address");
pub const CONTACT: TypeKey = TypeKey("Contact");
pub const EMAIL: TypeKey = TypeKey("Email");
pub const RECORD: TypeKey = TypeKey("Record");
pub const PROFILE: TypeKey = TypeKey("Profile");

// Person

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub preferred_name: Option<String>,
}

impl Introspected for Person {
    fn type_key(&self) -> TypeKey {
        PERSON
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.name.to_property(),
            1 => self.preferred_name.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Person {
    const TYPE_KEY: TypeKey = PERSON;
}

fn new_person(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Person {
        name: args.take(0)?,
        preferred_name: args.take(1)?,
    }))
}

pub fn person_schema() -> TypeSchema {
    TypeSchema::object(PERSON, "Person")
        .slot(PropertySlot::new("name", PropertyType::Str))
        .slot(
            PropertySlot::new("preferred_name", PropertyType::Str)
                .wire_name("preferredName")
                .nullable(),
        )
        .instantiate(new_person)
}

/// Write `name` only when there is no preferred name, and `preferredName`
/// only when there is one.
pub fn prefer_short_name(
    bean: &dyn Introspected,
    slot: &PropertySlot,
    _value: &PropertyValue<'_>,
) -> bool {
    let Some(person) = downcast_ref::<Person>(bean) else {
        return true;
    };
    match slot.name {
        "name" => person.preferred_name.is_none(),
        "preferred_name" => person.preferred_name.is_some(),
        _ => true,
    }
}

// Point and Line, with codecs

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Introspected for Point {
    fn type_key(&self) -> TypeKey {
        POINT
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.x.to_property(),
            1 => self.y.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Point {
    const TYPE_KEY: TypeKey = POINT;
}

fn new_point(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Point {
        x: args.take(0)?,
        y: args.take(1)?,
    }))
}

pub fn point_schema() -> TypeSchema {
    TypeSchema::object(POINT, "Point")
        .slot(PropertySlot::new("x", PropertyType::I64))
        .slot(PropertySlot::new("y", PropertyType::I64))
        .codec("reversed")
        .instantiate(new_point)
}

fn point_of<'a>(
    value: &'a PropertyValue<'_>,
    name: &'static str,
    enc: &Encoder<'_>,
) -> Result<&'a Point> {
    match value {
        PropertyValue::Object(obj) => downcast_ref::<Point>(*obj),
        _ => None,
    }
    .ok_or_else(|| {
        enc.error(SerdeErrorKind::Codec {
            name,
            message: format!("expected a Point, got {}", value.kind_name()),
        })
    })
}

/// Writes a point as `[y, x]`.
pub struct ReversedPoint;

impl Codec for ReversedPoint {
    fn encode(&self, value: &PropertyValue<'_>, enc: &mut Encoder<'_>) -> Result<()> {
        let point = *point_of(value, "reversed", enc)?;
        enc.begin_array()?;
        enc.encode_i64(point.y)?;
        enc.encode_i64(point.x)?;
        enc.end_array()
    }

    fn decode(&self, dec: &mut Decoder<'_, '_>) -> Result<Bound> {
        dec.begin_array()?;
        let mut coords = Vec::new();
        while dec.has_next_element()? {
            coords.push(dec.decode_i64()?);
        }
        dec.finish_structure()?;
        match coords[..] {
            [y, x] => Ok(Bound::Object(Box::new(Point { x, y }))),
            _ => Err(dec.error(SerdeErrorKind::Codec {
                name: "reversed",
                message: format!("expected two coordinates, got {}", coords.len()),
            })),
        }
    }
}

/// Writes a point as the string `"x,y"`.
pub struct PointText;

impl Codec for PointText {
    fn encode(&self, value: &PropertyValue<'_>, enc: &mut Encoder<'_>) -> Result<()> {
        let point = *point_of(value, "text", enc)?;
        enc.encode_str(&format!("{},{}", point.x, point.y))
    }

    fn decode(&self, dec: &mut Decoder<'_, '_>) -> Result<Bound> {
        let text = dec.decode_string()?;
        let parsed = text
            .split_once(',')
            .and_then(|(x, y)| Some((x.parse().ok()?, y.parse().ok()?)));
        match parsed {
            Some((x, y)) => Ok(Bound::Object(Box::new(Point { x, y }))),
            None => Err(dec.error(SerdeErrorKind::Codec {
                name: "text",
                message: format!("cannot read a point from {text:?}"),
            })),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Introspected for Line {
    fn type_key(&self) -> TypeKey {
        LINE
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => PropertyValue::Object(&self.start),
            1 => PropertyValue::Object(&self.end),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Line {
    const TYPE_KEY: TypeKey = LINE;
}

fn new_line(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Line {
        start: args.take_object(0)?,
        end: args.take_object(1)?,
    }))
}

pub fn line_schema() -> TypeSchema {
    TypeSchema::object(LINE, "Line")
        .slot(PropertySlot::new("start", PropertyType::Object(POINT)))
        .slot(PropertySlot::new("end", PropertyType::Object(POINT)).codec("text"))
        .instantiate(new_line)
}

// Shapes

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Introspected for Circle {
    fn type_key(&self) -> TypeKey {
        CIRCLE
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.radius.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

fn new_circle(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Circle {
        radius: args.take(0)?,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Square {
    pub side: f64,
}

impl Introspected for Square {
    fn type_key(&self) -> TypeKey {
        SQUARE
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.side.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

fn new_square(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Square {
        side: args.take(0)?,
    }))
}

/// Not a registered member of any family; written as its supertype `Square`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundedSquare {
    pub side: f64,
    pub corner: f64,
}

impl Introspected for RoundedSquare {
    fn type_key(&self) -> TypeKey {
        ROUNDED_SQUARE
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.side.to_property(),
            1 => self.corner.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

fn new_rounded_square(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(RoundedSquare {
        side: args.take(0)?,
        corner: args.take(1)?,
    }))
}

fn shape_subtypes() -> SubtypeInfo {
    SubtypeInfo::new()
        .subtype(CIRCLE, &["circle", "round"])
        .subtype(SQUARE, &["square"])
}

#[derive(Debug)]
pub struct Canvas {
    pub shapes: Vec<Box<dyn Introspected>>,
}

impl Introspected for Canvas {
    fn type_key(&self) -> TypeKey {
        CANVAS
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.shapes.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Canvas {
    const TYPE_KEY: TypeKey = CANVAS;
}

fn new_canvas(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Canvas {
        shapes: args.take(0)?,
    }))
}

#[derive(Debug)]
pub struct Drawing {
    pub title: String,
    pub shape: Box<dyn Introspected>,
}

impl Introspected for Drawing {
    fn type_key(&self) -> TypeKey {
        DRAWING
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.title.to_property(),
            1 => self.shape.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Drawing {
    const TYPE_KEY: TypeKey = DRAWING;
}

fn new_drawing(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Drawing {
        title: args.take(0)?,
        shape: args.take(1)?,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Click {
    pub kind: String,
    pub x: i64,
}

impl Introspected for Click {
    fn type_key(&self) -> TypeKey {
        CLICK
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.kind.to_property(),
            1 => self.x.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

fn new_click(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Click {
        kind: args.take(0)?,
        x: args.take(1)?,
    }))
}

pub fn shape_schemas() -> Vec<TypeSchema> {
    vec![
        TypeSchema::abstract_type(SHAPE, "Shape", shape_subtypes()),
        TypeSchema::abstract_type(
            WRAPPED_SHAPE,
            "WrappedShape",
            shape_subtypes().placement(DiscriminatorPlacement::WrapperObject),
        ),
        TypeSchema::abstract_type(
            EXTERNAL_SHAPE,
            "ExternalShape",
            shape_subtypes()
                .discriminator("kind")
                .placement(DiscriminatorPlacement::External),
        ),
        TypeSchema::object(CIRCLE, "Circle")
            .slot(PropertySlot::new("radius", PropertyType::F64))
            .instantiate(new_circle),
        TypeSchema::object(SQUARE, "Square")
            .slot(PropertySlot::new("side", PropertyType::F64))
            .instantiate(new_square),
        TypeSchema::object(ROUNDED_SQUARE, "RoundedSquare")
            .slot(PropertySlot::new("side", PropertyType::F64))
            .slot(PropertySlot::new("corner", PropertyType::F64))
            .extends(SQUARE)
            .instantiate(new_rounded_square),
        TypeSchema::object(CANVAS, "Canvas")
            .slot(PropertySlot::new(
                "shapes",
                PropertyType::Seq(Box::new(PropertyType::Object(SHAPE))),
            ))
            .instantiate(new_canvas),
        TypeSchema::object(DRAWING, "Drawing")
            .slot(PropertySlot::new("title", PropertyType::Str))
            .slot(PropertySlot::new("shape", PropertyType::Object(EXTERNAL_SHAPE)))
            .instantiate(new_drawing),
        TypeSchema::abstract_type(
            EVENT,
            "Event",
            SubtypeInfo::new()
                .discriminator("type")
                .visible()
                .subtype(CLICK, &["click"]),
        ),
        TypeSchema::object(CLICK, "Click")
            .slot(PropertySlot::new("kind", PropertyType::Str).wire_name("type"))
            .slot(PropertySlot::new("x", PropertyType::I64))
            .instantiate(new_click),
    ]
}

// Shared and cyclic graphs

pub struct Node {
    pub name: String,
    pub next: Mutex<Option<Arc<Node>>>,
}

impl Node {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            next: Mutex::new(None),
        })
    }

    pub fn point_to(&self, next: &Arc<Node>) {
        *self.next.lock().unwrap() = Some(next.clone());
    }

    pub fn next(&self) -> Option<Arc<Node>> {
        self.next.lock().unwrap().clone()
    }

    /// Break the cycle so the test does not leak.
    pub fn unlink(&self) {
        self.next.lock().unwrap().take();
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Introspected for Node {
    fn type_key(&self) -> TypeKey {
        NODE
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.name.to_property(),
            1 => match self.next.lock().ok().and_then(|next| next.clone()) {
                Some(next) => PropertyValue::Shared(next),
                None => PropertyValue::Null,
            },
            _ => PropertyValue::Absent,
        }
    }

    fn set_property(&mut self, index: usize, value: Bound) -> Result<(), BindError> {
        match index {
            1 => {
                let next = Option::<Arc<Node>>::from_bound(value)?;
                *self
                    .next
                    .get_mut()
                    .map_err(|_| BindError::Custom("poisoned".into()))? = next;
                Ok(())
            }
            _ => Err(BindError::NoSetter {
                type_key: NODE,
                index,
            }),
        }
    }

    fn link(&self, index: usize, target: Arc<dyn Introspected>) -> Result<(), BindError> {
        let next = Arc::<Node>::from_bound(Bound::Shared(target))?;
        match index {
            1 => {
                *self
                    .next
                    .lock()
                    .map_err(|_| BindError::Custom("poisoned".into()))? = Some(next);
                Ok(())
            }
            _ => Err(BindError::NoSetter {
                type_key: NODE,
                index,
            }),
        }
    }
}

impl HasSchema for Node {
    const TYPE_KEY: TypeKey = NODE;
}

fn new_node(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Node {
        name: args.take(0)?,
        next: Mutex::new(None),
    }))
}

#[derive(Debug, PartialEq)]
pub struct Leaf {
    pub value: i64,
}

impl Introspected for Leaf {
    fn type_key(&self) -> TypeKey {
        LEAF
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.value.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Leaf {
    const TYPE_KEY: TypeKey = LEAF;
}

fn new_leaf(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Leaf {
        value: args.take(0)?,
    }))
}

#[derive(Debug)]
pub struct Group {
    pub items: Vec<Arc<Leaf>>,
}

impl Introspected for Group {
    fn type_key(&self) -> TypeKey {
        GROUP
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.items.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Group {
    const TYPE_KEY: TypeKey = GROUP;
}

fn new_group(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Group {
        items: args.take(0)?,
    }))
}

#[derive(Debug)]
pub struct Grid {
    pub rows: Vec<Vec<Arc<Leaf>>>,
}

impl Introspected for Grid {
    fn type_key(&self) -> TypeKey {
        GRID
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.rows.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Grid {
    const TYPE_KEY: TypeKey = GRID;
}

fn new_grid(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Grid {
        rows: args.take(0)?,
    }))
}

pub fn graph_schemas() -> Vec<TypeSchema> {
    vec![
        TypeSchema::object(NODE, "Node")
            .slot(PropertySlot::new("name", PropertyType::Str))
            .slot(
                PropertySlot::new("next", PropertyType::Shared(NODE))
                    .nullable()
                    .setter(),
            )
            .instantiate(new_node),
        TypeSchema::object(LEAF, "Leaf")
            .slot(PropertySlot::new("value", PropertyType::I64))
            .instantiate(new_leaf),
        TypeSchema::object(GROUP, "Group")
            .slot(PropertySlot::new(
                "items",
                PropertyType::Seq(Box::new(PropertyType::Shared(LEAF))),
            ))
            .instantiate(new_group),
        TypeSchema::object(GRID, "Grid")
            .slot(PropertySlot::new(
                "rows",
                PropertyType::Seq(Box::new(PropertyType::Seq(Box::new(PropertyType::Shared(
                    LEAF,
                ))))),
            ))
            .instantiate(new_grid),
    ]
}

// Validation

#[derive(Debug, PartialEq)]
pub struct Account {
    pub owner: String,
    pub balance: i64,
}

impl Introspected for Account {
    fn type_key(&self) -> TypeKey {
        ACCOUNT
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.owner.to_property(),
            1 => self.balance.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Account {
    const TYPE_KEY: TypeKey = ACCOUNT;
}

fn new_account(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Account {
        owner: args.take(0)?,
        balance: args.take(1)?,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Introspected for Address {
    fn type_key(&self) -> TypeKey {
        ADDRESS
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.street.to_property(),
            1 => self.city.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

fn new_address(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Address {
        street: args.take(0)?,
        city: args.take(1)?,
    }))
}

#[derive(Debug, PartialEq)]
pub struct User {
    pub name: String,
    pub address: Address,
}

impl Introspected for User {
    fn type_key(&self) -> TypeKey {
        USER
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.name.to_property(),
            1 => PropertyValue::Object(&self.address),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for User {
    const TYPE_KEY: TypeKey = USER;
}

fn new_user(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(User {
        name: args.take(0)?,
        address: args.take_object(1)?,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email(pub String);

impl Introspected for Email {
    fn type_key(&self) -> TypeKey {
        EMAIL
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.0.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

fn new_email(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Email(args.take(0)?)))
}

#[derive(Debug, PartialEq)]
pub struct Contact {
    pub email: Email,
}

impl Introspected for Contact {
    fn type_key(&self) -> TypeKey {
        CONTACT
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => PropertyValue::Object(&self.email),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Contact {
    const TYPE_KEY: TypeKey = CONTACT;
}

fn new_contact(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Contact {
        email: args.take_object(0)?,
    }))
}

pub fn model_schemas() -> Vec<TypeSchema> {
    vec![
        TypeSchema::object(ACCOUNT, "Account")
            .slot(PropertySlot::new("owner", PropertyType::Str))
            .slot(PropertySlot::new("balance", PropertyType::I64))
            .instantiate(new_account),
        TypeSchema::object(ADDRESS, "Address")
            .slot(PropertySlot::new("street", PropertyType::Str))
            .slot(PropertySlot::new("city", PropertyType::Str))
            .instantiate(new_address),
        TypeSchema::object(USER, "User")
            .slot(PropertySlot::new("name", PropertyType::Str))
            .slot(PropertySlot::new("address", PropertyType::Object(ADDRESS)).unwrapped())
            .instantiate(new_user),
        TypeSchema::value(EMAIL, "Email", PropertySlot::new("address", PropertyType::Str))
            .instantiate(new_email),
        TypeSchema::object(CONTACT, "Contact")
            .slot(PropertySlot::new("email", PropertyType::Object(EMAIL)))
            .instantiate(new_contact),
    ]
}

// Naming and inclusion

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub login_count: u32,
    pub tags: Vec<String>,
}

impl Introspected for Record {
    fn type_key(&self) -> TypeKey {
        RECORD
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.first_name.to_property(),
            1 => self.middle_name.to_property(),
            2 => self.login_count.to_property(),
            3 => self.tags.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Record {
    const TYPE_KEY: TypeKey = RECORD;
}

fn new_record(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Record {
        first_name: args.take(0)?,
        middle_name: args.take(1)?,
        login_count: args.take(2)?,
        tags: args.take_or_default(3)?,
    }))
}

pub fn record_schema() -> TypeSchema {
    TypeSchema::object(RECORD, "Record")
        .slot(PropertySlot::new("first_name", PropertyType::Str))
        .slot(PropertySlot::new("middle_name", PropertyType::Str).nullable())
        .slot(PropertySlot::new("login_count", PropertyType::U32))
        .slot(
            PropertySlot::new("tags", PropertyType::Seq(Box::new(PropertyType::Str)))
                .default_value(),
        )
        .instantiate(new_record)
}

// Profile, collecting unknown properties

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub extra: BTreeMap<String, String>,
}

impl Introspected for Profile {
    fn type_key(&self) -> TypeKey {
        PROFILE
    }

    fn property(&self, index: usize) -> PropertyValue<'_> {
        match index {
            0 => self.name.to_property(),
            1 => self.extra.to_property(),
            _ => PropertyValue::Absent,
        }
    }
}

impl HasSchema for Profile {
    const TYPE_KEY: TypeKey = PROFILE;
}

fn new_profile(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Profile {
        name: args.take(0)?,
        extra: args.take_or_default(1)?,
    }))
}

pub fn profile_schema() -> TypeSchema {
    TypeSchema::object(PROFILE, "Profile")
        .slot(PropertySlot::new("name", PropertyType::Str))
        .slot(
            PropertySlot::new("extra", PropertyType::Map(Box::new(PropertyType::Str)))
                .any_properties()
                .default_value(),
        )
        .instantiate(new_profile)
}

// Helpers

/// Every fixture schema in one registry.
pub fn registry() -> Arc<SchemaRegistry> {
    let mut builder = SchemaRegistry::builder()
        .register(person_schema())
        .register(point_schema())
        .register(line_schema())
        .register(record_schema())
        .register(profile_schema());
    for schema in shape_schemas()
        .into_iter()
        .chain(graph_schemas())
        .chain(model_schemas())
    {
        builder.add(schema);
    }
    Arc::new(builder.build().unwrap())
}

pub fn mapper(config: SerdeConfig) -> Mapper {
    Mapper::new(registry(), config)
        .unwrap()
        .with_codec("reversed", ReversedPoint)
        .with_codec("text", PointText)
}

/// Render tokens as compact JSON-like text, for readable assertions.
pub fn render(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut first = vec![true];
    let mut after_key = false;
    for token in tokens {
        let closes = matches!(token, Token::EndObject | Token::EndArray | Token::End);
        if !closes && !after_key {
            if let Some(first) = first.last_mut() {
                if !*first {
                    out.push(',');
                }
                *first = false;
            }
        }
        after_key = false;
        match token {
            Token::BeginObject => {
                out.push('{');
                first.push(true);
            }
            Token::EndObject => {
                first.pop();
                out.push('}');
            }
            Token::BeginArray => {
                out.push('[');
                first.push(true);
            }
            Token::EndArray => {
                first.pop();
                out.push(']');
            }
            Token::Key(key) => {
                write!(out, "{key:?}:").unwrap();
                after_key = true;
            }
            Token::Scalar(ScalarValue::Str(s)) => write!(out, "{s:?}").unwrap(),
            Token::Scalar(ScalarValue::Bool(b)) => write!(out, "{b}").unwrap(),
            Token::Scalar(ScalarValue::I64(n)) => write!(out, "{n}").unwrap(),
            Token::Scalar(ScalarValue::U64(n)) => write!(out, "{n}").unwrap(),
            Token::Scalar(ScalarValue::F64(n)) => write!(out, "{n}").unwrap(),
            Token::Scalar(ScalarValue::Decimal(d)) => write!(out, "{d}").unwrap(),
            Token::Null => out.push_str("null"),
            Token::End => {}
        }
    }
    out
}

/// Serialize `value` and render the tokens.
pub fn encode(mapper: &Mapper, value: &dyn Introspected) -> String {
    let mut buffer = TokenBuffer::new();
    mapper.serialize(value, &mut buffer).unwrap();
    render(&buffer.tokens())
}

/// Serialize `value` as a member of `family` and render the tokens.
pub fn encode_as(mapper: &Mapper, value: &dyn Introspected, family: TypeKey) -> String {
    let mut buffer = TokenBuffer::new();
    mapper.serialize_as(value, family, &mut buffer).unwrap();
    render(&buffer.tokens())
}

/// Tokens for a [`Value`] tree, to feed a decoder.
pub fn input(value: &Value) -> TokenBuffer {
    let mut buffer = TokenBuffer::new();
    let mut enc = Encoder::new(&mut buffer, &SerdeConfig::default());
    enc.encode_value(value).unwrap();
    enc.finish().unwrap();
    buffer
}

pub fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

pub fn array<const N: usize>(items: [Value; N]) -> Value {
    Value::Array(items.into())
}

pub fn string(s: &str) -> Value {
    Value::Str(s.into())
}
