use std::sync::{Arc, Mutex};

use insta::assert_snapshot;
use tessel_core::{
    Arguments, BindError, Bound, FromBound, HasSchema, Introspected, PropertySlot, PropertyType,
    PropertyValue, SchemaRegistry, SubtypeInfo, ToProperty, TypeKey, TypeSchema, downcast_ref,
};
use tessel_format::{
    Codec, CycleMode, Decoder, Encoder, Mapper, SerdeConfig, SerdeErrorKind, Value,
};
use tessel_json::{
    from_str, from_str_dyn, from_str_shared, to_string, to_string_as, to_string_pretty,
    value_from_str, value_to_string,
};
use tessel_testhelpers::test;

const POINT: TypeKey = TypeKey("Point");
const PERSON: TypeKey = TypeKey("Person");
const SHAPE: TypeKey = TypeKey("Shape");
const CIRCLE: TypeKey = TypeKey("Circle");
const SQUARE: TypeKey = TypeKey("Square");
const NODE: TypeKey = TypeKey("Node");

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: i64,
    y: i64,
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

/// Writes a point as `[y, x]`.
struct Reversed;

impl Codec for Reversed {
    fn encode(&self, value: &PropertyValue<'_>, enc: &mut Encoder<'_>) -> tessel_format::Result<()> {
        let PropertyValue::Object(obj) = value else {
            return Err(enc.error(SerdeErrorKind::Codec {
                name: "reversed",
                message: "expected an object".into(),
            }));
        };
        let Some(point) = downcast_ref::<Point>(*obj) else {
            return Err(enc.error(SerdeErrorKind::Codec {
                name: "reversed",
                message: "expected a Point".into(),
            }));
        };
        enc.begin_array()?;
        enc.encode_i64(point.y)?;
        enc.encode_i64(point.x)?;
        enc.end_array()
    }

    fn decode(&self, dec: &mut Decoder<'_, '_>) -> tessel_format::Result<Bound> {
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

#[derive(Debug, PartialEq)]
struct Person {
    name: String,
    preferred_name: Option<String>,
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

#[derive(Debug, PartialEq)]
struct Circle {
    radius: f64,
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

#[derive(Debug, PartialEq)]
struct Square {
    side: f64,
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

struct Node {
    name: String,
    next: Mutex<Option<Arc<Node>>>,
}

impl Node {
    fn next(&self) -> Option<Arc<Node>> {
        self.next.lock().unwrap().clone()
    }

    fn unlink(&self) {
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

fn new_point(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Point {
        x: args.take(0)?,
        y: args.take(1)?,
    }))
}

fn new_person(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Person {
        name: args.take(0)?,
        preferred_name: args.take(1)?,
    }))
}

fn new_circle(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Circle {
        radius: args.take(0)?,
    }))
}

fn new_square(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Square {
        side: args.take(0)?,
    }))
}

fn new_node(args: &mut Arguments) -> Result<Box<dyn Introspected>, BindError> {
    Ok(Box::new(Node {
        name: args.take(0)?,
        next: Mutex::new(None),
    }))
}

fn mapper(config: SerdeConfig) -> Mapper {
    let registry = SchemaRegistry::builder()
        .register(
            TypeSchema::object(POINT, "Point")
                .slot(PropertySlot::new("x", PropertyType::I64))
                .slot(PropertySlot::new("y", PropertyType::I64))
                .codec("reversed")
                .instantiate(new_point),
        )
        .register(
            TypeSchema::object(PERSON, "Person")
                .slot(PropertySlot::new("name", PropertyType::Str))
                .slot(
                    PropertySlot::new("preferred_name", PropertyType::Str)
                        .wire_name("preferredName")
                        .nullable(),
                )
                .instantiate(new_person),
        )
        .register(TypeSchema::abstract_type(
            SHAPE,
            "Shape",
            SubtypeInfo::new()
                .subtype(CIRCLE, &["circle"])
                .subtype(SQUARE, &["square"]),
        ))
        .register(
            TypeSchema::object(CIRCLE, "Circle")
                .slot(PropertySlot::new("radius", PropertyType::F64))
                .instantiate(new_circle),
        )
        .register(
            TypeSchema::object(SQUARE, "Square")
                .slot(PropertySlot::new("side", PropertyType::F64))
                .instantiate(new_square),
        )
        .register(
            TypeSchema::object(NODE, "Node")
                .slot(PropertySlot::new("name", PropertyType::Str))
                .slot(
                    PropertySlot::new("next", PropertyType::Shared(NODE))
                        .nullable()
                        .setter(),
                )
                .instantiate(new_node),
        )
        .build()
        .unwrap();
    Mapper::new(Arc::new(registry), config)
        .unwrap()
        .with_codec("reversed", Reversed)
}

fn default_mapper() -> Mapper {
    mapper(SerdeConfig::default())
}

#[test]
fn reversed_codec_writes_y_first() {
    let mapper = default_mapper();
    assert_eq!(
        to_string(&mapper, &Point { x: 50, y: 100 }).unwrap(),
        "[100,50]"
    );
    let point: Point = from_str(&mapper, " [ 100 , 50 ] ").unwrap();
    assert_eq!(point, Point { x: 50, y: 100 });
}

#[test]
fn filter_chooses_between_names() {
    let mapper = default_mapper().with_filter(
        |bean: &dyn Introspected, slot: &PropertySlot, _: &PropertyValue<'_>| {
            let Some(person) = downcast_ref::<Person>(bean) else {
                return true;
            };
            match slot.name {
                "name" => person.preferred_name.is_none(),
                _ => person.preferred_name.is_some(),
            }
        },
    );
    let adam = Person {
        name: "Adam".into(),
        preferred_name: None,
    };
    assert_eq!(to_string(&mapper, &adam).unwrap(), r#"{"name":"Adam"}"#);
    let ad = Person {
        name: "Adam".into(),
        preferred_name: Some("Ad".into()),
    };
    assert_eq!(to_string(&mapper, &ad).unwrap(), r#"{"preferredName":"Ad"}"#);
}

#[test]
fn escaped_strings_round_trip() {
    let mapper = default_mapper();
    let person = Person {
        name: "Zoë \"Z\"\n\u{1F600}".into(),
        preferred_name: None,
    };
    let json = to_string(&mapper, &person).unwrap();
    assert_eq!(
        json,
        "{\"name\":\"Zoë \\\"Z\\\"\\n\u{1F600}\",\"preferredName\":null}"
    );
    let back: Person = from_str(&mapper, &json).unwrap();
    assert_eq!(back, person);

    let escaped: Person = from_str(&mapper, r#"{"name":"\u0041\ud83d\ude00"}"#).unwrap();
    assert_eq!(escaped.name, "A\u{1F600}");
}

#[test]
fn pretty_output_is_indented() {
    let mapper = default_mapper();
    let person = Person {
        name: "Adam".into(),
        preferred_name: Some("Ad".into()),
    };
    assert_snapshot!(to_string_pretty(&mapper, &person).unwrap(), @r#"
    {
      "name": "Adam",
      "preferredName": "Ad"
    }
    "#);
}

#[test]
fn polymorphic_shapes() {
    let mapper = default_mapper();
    assert_eq!(
        to_string_as(&mapper, &Circle { radius: 1.5 }, SHAPE).unwrap(),
        r#"{"@type":"circle","radius":1.5}"#
    );
    let shape = from_str_dyn(&mapper, SHAPE, r#"{"side": 2.0, "@type": "square"}"#).unwrap();
    assert_eq!(downcast_ref::<Square>(&*shape), Some(&Square { side: 2.0 }));
}

#[test]
fn cyclic_graph_round_trips() {
    let mapper = mapper(SerdeConfig::default().with_cycles(CycleMode::BackReference));
    let json = r#"{"name":"a","next":{"name":"b","next":{"@ref":"root"}}}"#;
    let a = from_str_shared::<Node>(&mapper, json).unwrap();
    let b = a.next().unwrap();
    assert_eq!(b.name, "b");
    assert!(Arc::ptr_eq(&b.next().unwrap(), &a));

    assert_eq!(to_string(&mapper, &*a).unwrap(), json);
    b.unlink();
}

#[test]
fn values_keep_order_and_width() {
    let mapper = default_mapper();
    let json = r#"{"z":18446744073709551615,"a":[true,null,-3,0.25],"s":"x"}"#;
    let value = value_from_str(&mapper, json).unwrap();
    let Value::Object(entries) = &value else {
        panic!("expected an object, got {value:?}");
    };
    assert_eq!(
        entries.keys().map(String::as_str).collect::<Vec<_>>(),
        ["z", "a", "s"]
    );
    assert_eq!(value_to_string(&mapper, &value).unwrap(), json);
}

#[test]
fn points_survive_a_text_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mapper = default_mapper();
    let point: Point = from_str(&mapper, "[4, 3]")?;
    assert_eq!(point, Point { x: 3, y: 4 });
    assert_eq!(to_string(&mapper, &point)?, "[4,3]");
    Ok(())
}

#[test]
fn syntax_errors_report_the_offset() {
    let mapper = default_mapper();
    let err = from_str::<Person>(&mapper, r#"{"name": "Adam" "preferredName": null}"#).unwrap_err();
    assert_eq!(
        err.kind,
        SerdeErrorKind::MalformedInput {
            message: "expected `,` or `}`, found `\"` at byte 16".into()
        }
    );
}

#[test]
fn unpaired_surrogate_is_malformed() {
    let mapper = default_mapper();
    let err = from_str::<Person>(&mapper, r#"{"name":"\udc00"}"#).unwrap_err();
    assert!(
        matches!(&err.kind, SerdeErrorKind::MalformedInput { message } if message.starts_with("unpaired surrogate")),
        "{err}"
    );
}

#[test]
fn trailing_garbage_is_rejected() {
    let mapper = default_mapper();
    let err = from_str::<Point>(&mapper, "[1,2] x").unwrap_err();
    assert!(
        matches!(err.kind, SerdeErrorKind::MalformedInput { .. }),
        "{err}"
    );
}

#[test]
fn non_finite_float_fails_to_write() {
    let mapper = default_mapper();
    let err = to_string(&mapper, &Circle { radius: f64::INFINITY }).unwrap_err();
    assert!(matches!(err.kind, SerdeErrorKind::Sink(_)), "{err}");
}
