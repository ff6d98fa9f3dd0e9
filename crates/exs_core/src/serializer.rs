use core::any::{Any, type_name};
use std::sync::Arc;

use exs_document::{DocumentWriter, Element, TreeWriter};
use log::trace;

use crate::config::Configuration;
use crate::context::{Reading, Writing};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Serializer

/// Serializes object graphs with one [`Configuration`].
///
/// Cheap to clone. Calls keep their state (identity tables, the type stack)
/// on their own stack frame, so a serializer can be used from many threads
/// at once.
#[derive(Clone)]
pub struct Serializer {
    config: Arc<Configuration>,
}

impl Serializer {
    #[inline]
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Writes `value` as a document.
    pub fn serialize<T: Any>(&self, value: &T) -> Result<String> {
        let root = self.serialize_element(value)?;
        Ok(exs_document::to_string(&root, self.config.options())?)
    }

    /// Writes `value` as an element tree.
    pub fn serialize_element<T: Any>(&self, value: &T) -> Result<Element> {
        let mut out = TreeWriter::new();
        self.serialize_into(value, &mut out)?;
        Ok(out.finish()?)
    }

    /// Writes `value` through `out`.
    pub fn serialize_into<T: Any>(&self, value: &T, out: &mut dyn DocumentWriter) -> Result<()> {
        let declared = self.config.registry().describe_type::<T>()?.type_id();
        trace!("serializing `{}`", type_name::<T>());
        let mut cx = Writing::new(&self.config, out);
        cx.write_root(declared, value).inspect_err(|e| cx.log_failure(e))
    }

    /// Reads a value of type `T` from a document.
    pub fn deserialize<T: Any>(&self, text: &str) -> Result<T> {
        let root = exs_document::parse(text)?;
        self.deserialize_element(&root)
    }

    /// Reads a value of type `T` from an element tree.
    pub fn deserialize_element<T: Any>(&self, root: &Element) -> Result<T> {
        let declared = self.config.registry().describe_type::<T>()?.type_id();
        trace!("deserializing `{}`", type_name::<T>());
        let mut cx = Reading::new(&self.config);
        let value = cx
            .read_root(root, declared)
            .inspect_err(|e| cx.log_failure(e))?;
        downcast(value)
    }
}

fn downcast<T: Any>(value: Box<dyn Any>) -> Result<T> {
    match value.downcast::<T>() {
        Ok(value) => Ok(*value),
        Err(_) => Err(Error::contract(format!(
            "the document was read into another type than `{}`",
            type_name::<T>()
        ))),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::Any;
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
    use std::rc::Rc;
    use std::sync::Arc;

    use exs_document::{AttributeValue, Element, QName, SYSTEM_NAMESPACE, TypeRef, reserved};
    use indexmap::IndexMap;

    use super::Serializer;
    use crate::config::ConfigurationBuilder;
    use crate::content::{ContentSerializer, TextConverter};
    use crate::context::{Reading, Writing};
    use crate::error::{Error, Result};
    use crate::extension::{Composition, Extension, Predicate, Target};
    use crate::{Describe, MemberDescriptor, Reflect, Shared, TypeDescriptor, shared};

    const NS: &str = "urn:test";

    fn serializer(builder: ConfigurationBuilder) -> Serializer {
        Serializer::new(Arc::new(builder.build().unwrap()))
    }

    // ----------------------------------------------------------------
    // Model

    #[derive(Default, Debug, PartialEq)]
    struct Subject {
        message: String,
    }

    impl Describe for Subject {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<Self, String>(
                "Message",
                |s| &s.message,
                |s| &mut s.message,
            )])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    fn hello() -> Subject {
        Subject {
            message: "Hello World!".into(),
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Person {
        full_name: String,
        age: u32,
    }

    impl Describe for Person {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, String>(
                    "FullName",
                    |p| &p.full_name,
                    |p| &mut p.full_name,
                ),
                MemberDescriptor::new::<Self, u32>("Age", |p| &p.age, |p| &mut p.age),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Default)]
    enum Color {
        #[default]
        Red,
        Green,
    }

    impl Describe for Color {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::enumeration(vec![("Red", Color::Red), ("Green", Color::Green)])
                .with_namespace(NS)
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Paint {
        color: Color,
        coats: Option<u8>,
    }

    impl Describe for Paint {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, Color>("Color", |p| &p.color, |p| &mut p.color),
                MemberDescriptor::new::<Self, Option<u8>>("Coats", |p| &p.coats, |p| &mut p.coats),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Inventory {
        queue: VecDeque<String>,
        tags: BTreeSet<String>,
        seen: HashSet<i64>,
        counts: BTreeMap<String, u32>,
        ordered: IndexMap<String, i64>,
        lookup: HashMap<u8, bool>,
        maybe: Vec<Option<i32>>,
        nested: Vec<Vec<char>>,
    }

    impl Describe for Inventory {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, VecDeque<String>>(
                    "Queue",
                    |i| &i.queue,
                    |i| &mut i.queue,
                ),
                MemberDescriptor::new::<Self, BTreeSet<String>>("Tags", |i| &i.tags, |i| &mut i.tags),
                MemberDescriptor::new::<Self, HashSet<i64>>("Seen", |i| &i.seen, |i| &mut i.seen),
                MemberDescriptor::new::<Self, BTreeMap<String, u32>>(
                    "Counts",
                    |i| &i.counts,
                    |i| &mut i.counts,
                ),
                MemberDescriptor::new::<Self, IndexMap<String, i64>>(
                    "Ordered",
                    |i| &i.ordered,
                    |i| &mut i.ordered,
                ),
                MemberDescriptor::new::<Self, HashMap<u8, bool>>(
                    "Lookup",
                    |i| &i.lookup,
                    |i| &mut i.lookup,
                ),
                MemberDescriptor::new::<Self, Vec<Option<i32>>>(
                    "Maybe",
                    |i| &i.maybe,
                    |i| &mut i.maybe,
                ),
                MemberDescriptor::new::<Self, Vec<Vec<char>>>(
                    "Nested",
                    |i| &i.nested,
                    |i| &mut i.nested,
                ),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Wrapper<T> {
        value: T,
    }

    impl<T: Describe + Default> Describe for Wrapper<T> {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<Self, T>(
                "Value",
                |w| &w.value,
                |w| &mut w.value,
            )])
            .with_namespace(NS)
            .with_argument::<T>()
            .with_default::<Self>()
        }
    }

    trait Shape: Reflect {
        fn area(&self) -> f64;
    }

    #[derive(Default, Debug, PartialEq)]
    struct Circle {
        radius: f64,
    }

    impl Shape for Circle {
        fn area(&self) -> f64 {
            3.0 * self.radius * self.radius
        }
    }

    impl Describe for Circle {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, f64>("Radius", |c| &c.radius, |c| &mut c.radius)
                    .attribute(),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Square {
        side: f64,
    }

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.side * self.side
        }
    }

    impl Describe for Square {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<Self, f64>(
                "Side",
                |s| &s.side,
                |s| &mut s.side,
            )])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    crate::describe_polymorphic!(Shape, "Shape", [Circle, Square]);

    struct Drawing {
        shapes: Vec<Box<dyn Shape>>,
        favorite: Option<Box<dyn Shape>>,
        anything: Box<dyn Reflect>,
    }

    impl Default for Drawing {
        fn default() -> Self {
            Self {
                shapes: Vec::new(),
                favorite: None,
                anything: Box::new(()),
            }
        }
    }

    impl Describe for Drawing {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, Vec<Box<dyn Shape>>>(
                    "Shapes",
                    |d| &d.shapes,
                    |d| &mut d.shapes,
                ),
                MemberDescriptor::new::<Self, Option<Box<dyn Shape>>>(
                    "Favorite",
                    |d| &d.favorite,
                    |d| &mut d.favorite,
                ),
                MemberDescriptor::new::<Self, Box<dyn Reflect>>(
                    "Anything",
                    |d| &d.anything,
                    |d| &mut d.anything,
                ),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default, Debug)]
    struct Node {
        name: String,
        next: Option<Shared<Node>>,
    }

    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, String>("Name", |n| &n.name, |n| &mut n.name),
                MemberDescriptor::new::<Self, Option<Shared<Node>>>(
                    "Next",
                    |n| &n.next,
                    |n| &mut n.next,
                ),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default)]
    struct Holder {
        list: Option<Shared<Vec<Holder>>>,
    }

    impl Describe for Holder {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<
                Self,
                Option<Shared<Vec<Holder>>>,
            >("List", |h| &h.list, |h| &mut h.list)])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default)]
    struct Folder {
        children: Option<Shared<BTreeMap<u8, Folder>>>,
    }

    impl Describe for Folder {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<
                Self,
                Option<Shared<BTreeMap<u8, Folder>>>,
            >("Children", |f| &f.children, |f| &mut f.children)])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default)]
    struct Graph {
        first: Shared<Node>,
        second: Shared<Node>,
    }

    impl Describe for Graph {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, Shared<Node>>("First", |g| &g.first, |g| &mut g.first),
                MemberDescriptor::new::<Self, Shared<Node>>(
                    "Second",
                    |g| &g.second,
                    |g| &mut g.second,
                ),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Account {
        id: String,
        owner: String,
    }

    impl Describe for Account {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, String>("Id", |a| &a.id, |a| &mut a.id),
                MemberDescriptor::new::<Self, String>("Owner", |a| &a.owner, |a| &mut a.owner),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Default)]
    struct Ledger {
        from: Shared<Account>,
        to: Shared<Account>,
    }

    impl Describe for Ledger {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, Shared<Account>>("From", |l| &l.from, |l| &mut l.from),
                MemberDescriptor::new::<Self, Shared<Account>>("To", |l| &l.to, |l| &mut l.to),
            ])
            .with_namespace(NS)
            .with_default::<Self>()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Describe for Point {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Self>(vec![
                MemberDescriptor::new::<Self, i32>("X", |p| &p.x, |p| &mut p.x),
                MemberDescriptor::new::<Self, i32>("Y", |p| &p.y, |p| &mut p.y),
            ])
            .with_namespace(NS)
        }
    }

    struct Unregistered;

    // ----------------------------------------------------------------
    // Serializers and extensions

    struct PointText;

    impl ContentSerializer for PointText {
        fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
            let point = value.downcast_ref::<Point>().unwrap();
            cx.write_text(&format!("{},{}", point.x, point.y))
        }

        fn read(&self, _cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
            let text = element.text();
            let (x, y) = text.split_once(',').unwrap();
            Ok(Box::new(Point {
                x: x.parse().unwrap(),
                y: y.parse().unwrap(),
            }))
        }
    }

    struct WrongType;

    impl ContentSerializer for WrongType {
        fn write(&self, cx: &mut Writing<'_>, _value: &dyn Any) -> Result<()> {
            cx.write_text("0")
        }

        fn read(&self, _cx: &mut Reading<'_>, _element: &Element) -> Result<Box<dyn Any>> {
            Ok(Box::new(0_u8))
        }
    }

    /// Appends its marker to the text of the serializer it wraps.
    struct Marker(&'static str);

    struct Marked {
        inner: Arc<dyn ContentSerializer>,
        marker: &'static str,
    }

    impl Extension for Marker {
        fn kind(&self) -> &'static str {
            self.0
        }

        fn compose(
            &self,
            _cx: &Composition<'_>,
            _target: &Target<'_>,
            inner: Arc<dyn ContentSerializer>,
        ) -> Result<Arc<dyn ContentSerializer>> {
            if inner.text().is_none() {
                return Ok(inner);
            }
            Ok(Arc::new(Marked {
                inner,
                marker: self.0,
            }))
        }
    }

    impl TextConverter for Marked {
        fn format(&self, value: &dyn Any) -> Result<String> {
            let text = self.inner.text().unwrap().format(value)?;
            Ok(format!("{text}{}", self.marker))
        }

        fn parse(&self, text: &str) -> Result<Box<dyn Any>> {
            let text = text.strip_suffix(self.marker).unwrap();
            self.inner.text().unwrap().parse(text)
        }
    }

    impl ContentSerializer for Marked {
        fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
            let text = self.format(value)?;
            cx.write_text(&text)
        }

        fn read(&self, _cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
            self.parse(&element.text())
        }

        fn text(&self) -> Option<&dyn TextConverter> {
            Some(self)
        }
    }

    // ----------------------------------------------------------------
    // Members

    #[test]
    fn member_as_content_and_as_attribute() {
        let content = serializer(ConfigurationBuilder::new().register::<Subject>());
        let text = content.serialize(&hello()).unwrap();
        assert_eq!(
            text,
            r#"<Subject xmlns="urn:test"><Message>Hello World!</Message></Subject>"#
        );
        assert_eq!(content.deserialize::<Subject>(&text).unwrap(), hello());

        let attribute = serializer(ConfigurationBuilder::new().configure::<Subject>(|t| {
            t.member("Message").attribute();
        }));
        let text = attribute.serialize(&hello()).unwrap();
        assert_eq!(text, r#"<Subject xmlns="urn:test" Message="Hello World!"/>"#);
        assert_eq!(attribute.deserialize::<Subject>(&text).unwrap(), hello());
    }

    #[test]
    fn member_names_and_order() {
        let serializer = serializer(ConfigurationBuilder::new().configure::<Person>(|t| {
            t.name("Human");
            t.member("Age").name("Years").order(-1);
        }));
        let ada = Person {
            full_name: "Ada".into(),
            age: 36,
        };
        let text = serializer.serialize(&ada).unwrap();
        assert_eq!(
            text,
            r#"<Human xmlns="urn:test"><Years>36</Years><FullName>Ada</FullName></Human>"#
        );
        assert_eq!(serializer.deserialize::<Person>(&text).unwrap(), ada);
    }

    #[test]
    fn unknown_children_are_skipped() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Person>());
        let text = r#"<Person xmlns="urn:test"><Nickname>A</Nickname><Age>36</Age></Person>"#;
        let person = serializer.deserialize::<Person>(text).unwrap();
        assert_eq!(person.age, 36);
        assert_eq!(person.full_name, "");
    }

    #[test]
    fn enums_and_auto_attributes() {
        let paint = Paint {
            color: Color::Green,
            coats: Some(2),
        };

        let plain = serializer(ConfigurationBuilder::new().register::<Paint>());
        let text = plain.serialize(&paint).unwrap();
        assert_eq!(
            text,
            r#"<Paint xmlns="urn:test"><Color>Green</Color><Coats>2</Coats></Paint>"#
        );
        assert_eq!(plain.deserialize::<Paint>(&text).unwrap(), paint);

        let auto = serializer(
            ConfigurationBuilder::new()
                .register::<Paint>()
                .use_auto_attributes(),
        );
        let text = auto.serialize(&paint).unwrap();
        assert_eq!(text, r#"<Paint xmlns="urn:test" Color="Green" Coats="2"/>"#);
        assert_eq!(auto.deserialize::<Paint>(&text).unwrap(), paint);

        let unknown = r#"<Paint xmlns="urn:test" Color="Blue"/>"#;
        assert!(matches!(
            auto.deserialize::<Paint>(unknown),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn long_text_stays_content() {
        let serializer = serializer(
            ConfigurationBuilder::new()
                .register::<Person>()
                .use_auto_attributes_with(5),
        );
        let short = Person {
            full_name: "Ada".into(),
            age: 36,
        };
        let text = serializer.serialize(&short).unwrap();
        assert_eq!(text, r#"<Person xmlns="urn:test" FullName="Ada" Age="36"/>"#);
        assert_eq!(serializer.deserialize::<Person>(&text).unwrap(), short);

        let long = Person {
            full_name: "Ada Lovelace".into(),
            age: 36,
        };
        let text = serializer.serialize(&long).unwrap();
        assert_eq!(
            text,
            r#"<Person xmlns="urn:test" Age="36"><FullName>Ada Lovelace</FullName></Person>"#
        );
        assert_eq!(serializer.deserialize::<Person>(&text).unwrap(), long);

        let default = self::serializer(
            ConfigurationBuilder::new()
                .register::<Person>()
                .use_auto_attributes(),
        );
        let text = default.serialize(&long).unwrap();
        assert_eq!(text, r#"<Person xmlns="urn:test" FullName="Ada Lovelace" Age="36"/>"#);
    }

    #[test]
    fn absent_options_are_omitted() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Paint>());
        let paint = Paint {
            color: Color::Red,
            coats: None,
        };
        let text = serializer.serialize(&paint).unwrap();
        assert_eq!(text, r#"<Paint xmlns="urn:test"><Color>Red</Color></Paint>"#);
        assert_eq!(serializer.deserialize::<Paint>(&text).unwrap(), paint);
    }

    #[test]
    fn invalid_text_is_a_format_error() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Person>());
        let text = r#"<Person xmlns="urn:test"><Age>old</Age></Person>"#;
        assert!(matches!(
            serializer.deserialize::<Person>(text),
            Err(Error::Format { .. })
        ));
    }

    // ----------------------------------------------------------------
    // Collections

    #[test]
    fn arrays_carry_their_item_type() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Vec<i32>>());
        let root = serializer.serialize_element(&vec![1, 2, 3]).unwrap();

        assert_eq!(*root.name(), QName::qualified(SYSTEM_NAMESPACE, "Array"));
        assert_eq!(
            root.reserved(reserved::ITEM),
            Some(&AttributeValue::Types(vec![TypeRef::new(
                Some(SYSTEM_NAMESPACE),
                "int"
            )]))
        );
        let items: Vec<_> = root.elements().collect();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|e| e.name().matches(Some(SYSTEM_NAMESPACE), "int")));
        assert_eq!(items[2].text(), "3");

        let text = serializer.serialize(&vec![1, 2, 3]).unwrap();
        assert_eq!(serializer.deserialize::<Vec<i32>>(&text).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn collections_round_trip() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Inventory>());
        let mut inventory = Inventory::default();
        inventory.queue.extend(["b".to_owned(), "a".to_owned()]);
        inventory.tags.extend(["x".to_owned(), "y".to_owned()]);
        inventory.seen.extend([-1, 7]);
        inventory.counts.insert("apples".into(), 3);
        inventory.ordered.insert("z".into(), 1);
        inventory.ordered.insert("a".into(), 2);
        inventory.lookup.insert(1, true);
        inventory.maybe = vec![Some(1), None, Some(3)];
        inventory.nested = vec![vec!['a', 'b'], Vec::new()];

        let text = serializer.serialize(&inventory).unwrap();
        let read = serializer.deserialize::<Inventory>(&text).unwrap();
        assert_eq!(read, inventory);
        assert_eq!(read.ordered.keys().collect::<Vec<_>>(), ["z", "a"]);
    }

    #[test]
    fn dictionary_entries() {
        let serializer = serializer(ConfigurationBuilder::new().register::<BTreeMap<String, u32>>());
        let map = BTreeMap::from([("one".to_owned(), 1_u32)]);
        let root = serializer.serialize_element(&map).unwrap();

        assert!(root.name().matches(Some(SYSTEM_NAMESPACE), "SortedDictionary"));
        let entry = root.elements().next().unwrap();
        assert!(entry.name().matches(Some(SYSTEM_NAMESPACE), "Item"));
        let key = entry.element(&QName::qualified(SYSTEM_NAMESPACE, "Key")).unwrap();
        let value = entry.element(&QName::qualified(SYSTEM_NAMESPACE, "Value")).unwrap();
        assert_eq!((key.text().as_str(), value.text().as_str()), ("one", "1"));

        let text = serializer.serialize(&map).unwrap();
        assert_eq!(serializer.deserialize::<BTreeMap<String, u32>>(&text).unwrap(), map);
    }

    #[test]
    fn nullable_roots() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Option<i32>>());

        let text = serializer.serialize(&None::<i32>).unwrap();
        assert!(text.contains(r#"exs:null="true""#));
        assert_eq!(serializer.deserialize::<Option<i32>>(&text).unwrap(), None);

        let text = serializer.serialize(&Some(5)).unwrap();
        assert_eq!(text, r#"<int xmlns="urn:exs:system">5</int>"#);
        assert_eq!(serializer.deserialize::<Option<i32>>(&text).unwrap(), Some(5));
    }

    #[test]
    fn floats_keep_special_values() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Vec<f64>>());
        let values = vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0, 1e-300, 0.1];
        let text = serializer.serialize(&values).unwrap();
        let read = serializer.deserialize::<Vec<f64>>(&text).unwrap();

        let bits = |values: &[f64]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert!(read[0].is_nan());
        assert_eq!(bits(&read[1..]), bits(&values[1..]));
    }

    // ----------------------------------------------------------------
    // Generics and polymorphism

    #[test]
    fn generic_types_carry_their_arguments() {
        let serializer = serializer(
            ConfigurationBuilder::new()
                .register::<Wrapper<i32>>()
                .register::<Wrapper<String>>()
                .register::<Box<dyn Reflect>>(),
        );
        let wrapper = Wrapper { value: 5 };
        let root = serializer.serialize_element(&wrapper).unwrap();
        assert_eq!(
            root.reserved(reserved::ARGUMENTS),
            Some(&AttributeValue::Types(vec![TypeRef::new(
                Some(SYSTEM_NAMESPACE),
                "int"
            )]))
        );

        let text = serializer.serialize(&wrapper).unwrap();
        assert_eq!(serializer.deserialize::<Wrapper<i32>>(&text).unwrap(), wrapper);

        // Resolved from the name and arguments alone.
        let any = serializer.deserialize::<Box<dyn Reflect>>(&text).unwrap();
        assert_eq!((*any).as_any().downcast_ref::<Wrapper<i32>>(), Some(&wrapper));

        let other = serializer.serialize(&Wrapper { value: String::from("5") }).unwrap();
        let any = serializer.deserialize::<Box<dyn Reflect>>(&other).unwrap();
        assert!((*any).as_any().is::<Wrapper<String>>());
    }

    #[test]
    fn polymorphic_members_round_trip() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Drawing>());
        let drawing = Drawing {
            shapes: vec![Box::new(Circle { radius: 1.0 }), Box::new(Square { side: 2.0 })],
            favorite: Some(Box::new(Square { side: 3.0 })),
            anything: Box::new(42_i32),
        };

        let text = serializer.serialize(&drawing).unwrap();
        assert!(text.contains(r#"exs:type="Circle" Radius="1.0"/>"#));

        let read = serializer.deserialize::<Drawing>(&text).unwrap();
        let areas: Vec<f64> = read.shapes.iter().map(|s| s.area()).collect();
        assert_eq!(areas, [3.0, 4.0]);
        assert!((*read.shapes[0]).as_any().is::<Circle>());
        let favorite = read.favorite.as_deref().unwrap();
        assert_eq!(favorite.as_any().downcast_ref::<Square>(), Some(&Square { side: 3.0 }));
        assert_eq!((*read.anything).as_any().downcast_ref::<i32>(), Some(&42));
    }

    #[test]
    fn unlisted_implementor_is_rejected() {
        struct Triangle;
        impl Shape for Triangle {
            fn area(&self) -> f64 {
                0.0
            }
        }
        impl Describe for Triangle {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::object::<Self>(Vec::new()).with_namespace(NS)
            }
        }

        let serializer = serializer(
            ConfigurationBuilder::new()
                .register::<Drawing>()
                .register::<Triangle>(),
        );
        let drawing = Drawing {
            shapes: vec![Box::new(Triangle)],
            ..Drawing::default()
        };
        assert!(matches!(
            serializer.serialize(&drawing),
            Err(Error::ContractViolation(_))
        ));

        let text = r#"<Drawing xmlns="urn:test" xmlns:exs="urn:exs:v2"><Shapes><Triangle exs:type="Triangle"/></Shapes></Drawing>"#;
        assert!(matches!(
            serializer.deserialize::<Drawing>(text),
            Err(Error::TypeResolution { .. })
        ));
    }

    #[test]
    fn unregistered_runtime_type_is_rejected() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Drawing>());
        let drawing = Drawing {
            anything: Box::new(Unregistered),
            ..Drawing::default()
        };
        assert!(matches!(serializer.serialize(&drawing), Err(Error::Unregistered(_))));
        assert!(matches!(
            serializer.serialize(&Unregistered),
            Err(Error::Unregistered(_))
        ));
    }

    // ----------------------------------------------------------------
    // References

    #[test]
    fn shared_instances_keep_their_identity() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Graph>());
        let node = shared(Node {
            name: "a".into(),
            next: None,
        });
        let graph = Graph {
            first: node.clone(),
            second: node,
        };

        let text = serializer.serialize(&graph).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"<Graph xmlns="urn:test">"#,
                r#"<First xmlns:exs="urn:exs:v2" exs:identity="1"><Name>a</Name></First>"#,
                r#"<Second xmlns:exs="urn:exs:v2" exs:reference="1"/>"#,
                "</Graph>"
            )
        );

        let read = serializer.deserialize::<Graph>(&text).unwrap();
        assert!(Rc::ptr_eq(&read.first, &read.second));
        assert_eq!(read.first.borrow().name, "a");
    }

    #[test]
    fn cycles_are_restored() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Shared<Node>>());
        let root = shared(Node {
            name: "loop".into(),
            next: None,
        });
        root.borrow_mut().next = Some(root.clone());

        let text = serializer.serialize(&root).unwrap();
        root.borrow_mut().next = None;

        let read = serializer.deserialize::<Shared<Node>>(&text).unwrap();
        let next = read.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&read, &next));
        assert_eq!(next.borrow().name, "loop");
        read.borrow_mut().next = None;
    }

    #[test]
    fn cycles_through_shared_collections_are_restored() {
        let serializer = serializer(
            ConfigurationBuilder::new()
                .register::<Shared<Vec<Holder>>>()
                .register::<Shared<BTreeMap<u8, Folder>>>(),
        );

        let list = shared(Vec::new());
        list.borrow_mut().push(Holder {
            list: Some(list.clone()),
        });
        let text = serializer.serialize(&list).unwrap();
        list.borrow_mut().clear();
        assert!(text.contains(r#"exs:reference="1""#));

        let read = serializer.deserialize::<Shared<Vec<Holder>>>(&text).unwrap();
        assert_eq!(read.borrow().len(), 1);
        let inner = read.borrow()[0].list.clone().unwrap();
        assert!(Rc::ptr_eq(&read, &inner));
        read.borrow_mut().clear();

        let folders = shared(BTreeMap::new());
        folders.borrow_mut().insert(
            7,
            Folder {
                children: Some(folders.clone()),
            },
        );
        let text = serializer.serialize(&folders).unwrap();
        folders.borrow_mut().clear();

        let read = serializer.deserialize::<Shared<BTreeMap<u8, Folder>>>(&text).unwrap();
        let inner = read.borrow()[&7].children.clone().unwrap();
        assert!(Rc::ptr_eq(&read, &inner));
        read.borrow_mut().clear();
    }

    #[test]
    fn identity_members_name_the_tokens() {
        let serializer = serializer(
            ConfigurationBuilder::new()
                .configure::<Account>(|t| {
                    t.member("Id").identity();
                })
                .register::<Ledger>(),
        );
        let account = shared(Account {
            id: "A-1".into(),
            owner: "Ada".into(),
        });
        let ledger = Ledger {
            from: account.clone(),
            to: account,
        };

        let text = serializer.serialize(&ledger).unwrap();
        assert!(text.contains(r#"exs:identity="A-1" Id="A-1"><Owner>Ada</Owner></From>"#));
        assert!(text.contains(r#"exs:reference="A-1"/>"#));

        let read = serializer.deserialize::<Ledger>(&text).unwrap();
        assert!(Rc::ptr_eq(&read.from, &read.to));
        assert_eq!(read.to.borrow().owner, "Ada");
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Graph>());
        let text = r#"<Graph xmlns="urn:test" xmlns:exs="urn:exs:v2"><First exs:identity="1"><Name>a</Name></First><Second exs:reference="9"/></Graph>"#;
        assert!(matches!(
            serializer.deserialize::<Graph>(text),
            Err(Error::UnresolvedReference(token)) if token == "9"
        ));

        let duplicate = r#"<Graph xmlns="urn:test" xmlns:exs="urn:exs:v2"><First exs:identity="1"/><Second exs:identity="1"/></Graph>"#;
        assert!(matches!(
            serializer.deserialize::<Graph>(duplicate),
            Err(Error::ContractViolation(_))
        ));
    }

    // ----------------------------------------------------------------
    // Migrations

    fn migrating() -> Serializer {
        let name = |local: &str| QName::qualified(NS, local);
        serializer(ConfigurationBuilder::new().configure::<Person>(move |t| {
            t.migration(move |element| -> Result<(), String> {
                let old = element.element_mut(&name("Name")).ok_or("missing Name")?;
                old.set_name(name("FullName"));
                Ok(())
            });
            t.migration(move |element| -> Result<(), String> {
                if let Some(old) = element.element_mut(&name("Years")) {
                    old.set_name(name("Age"));
                }
                Ok(())
            });
        }))
    }

    #[test]
    fn older_documents_are_migrated() {
        let serializer = migrating();
        let ada = Person {
            full_name: "Ada".into(),
            age: 36,
        };

        let v0 = r#"<Person xmlns="urn:test"><Name>Ada</Name><Years>36</Years></Person>"#;
        let v1 = r#"<Person xmlns="urn:test" xmlns:exs="urn:exs:v2" exs:version="1"><FullName>Ada</FullName><Years>36</Years></Person>"#;
        assert_eq!(serializer.deserialize::<Person>(v0).unwrap(), ada);
        assert_eq!(serializer.deserialize::<Person>(v1).unwrap(), ada);

        let text = serializer.serialize(&ada).unwrap();
        assert!(text.contains(r#"exs:version="2""#));
        assert_eq!(serializer.deserialize::<Person>(&text).unwrap(), ada);
    }

    #[test]
    fn migration_failures_are_reported() {
        let serializer = migrating();

        let newer = r#"<Person xmlns="urn:test" xmlns:exs="urn:exs:v2" exs:version="3"/>"#;
        assert!(matches!(
            serializer.deserialize::<Person>(newer),
            Err(Error::Migration { version: 3, .. })
        ));

        let broken = r#"<Person xmlns="urn:test"><Years>36</Years></Person>"#;
        assert!(matches!(
            serializer.deserialize::<Person>(broken),
            Err(Error::Migration { version: 0, message, .. }) if message == "missing Name"
        ));
    }

    // ----------------------------------------------------------------
    // Extensions

    #[test]
    fn extensions_compose_in_registration_order() {
        let target = || Predicate::member::<Subject>("Message");
        let serializer = serializer(
            ConfigurationBuilder::new()
                .register::<Subject>()
                .extend(target(), Marker("1"))
                .extend(target(), Marker("2")),
        );
        let text = serializer.serialize(&hello()).unwrap();
        assert_eq!(
            text,
            r#"<Subject xmlns="urn:test"><Message>Hello World!12</Message></Subject>"#
        );
        assert_eq!(serializer.deserialize::<Subject>(&text).unwrap(), hello());
    }

    #[test]
    fn always_true_predicates_apply_once() {
        for predicate in [Predicate::Always, Predicate::custom(|_| true)] {
            let serializer = serializer(
                ConfigurationBuilder::new()
                    .register::<Subject>()
                    .extend(predicate, Marker("#")),
            );
            let text = serializer.serialize(&hello()).unwrap();
            assert_eq!(
                text,
                r#"<Subject xmlns="urn:test"><Message>Hello World!#</Message></Subject>"#
            );
            assert_eq!(serializer.deserialize::<Subject>(&text).unwrap(), hello());

            let text = serializer.serialize(&String::from("Hi")).unwrap();
            assert!(text.contains(">Hi#<"));
            assert_eq!(serializer.deserialize::<String>(&text).unwrap(), "Hi");
        }
    }

    #[test]
    fn encrypted_members() {
        let serializer = serializer(ConfigurationBuilder::new().configure::<Subject>(|t| {
            t.member("Message").encrypt();
        }));
        let text = serializer.serialize(&hello()).unwrap();
        assert_eq!(
            text,
            r#"<Subject xmlns="urn:test"><Message>SGVsbG8gV29ybGQh</Message></Subject>"#
        );
        assert_eq!(serializer.deserialize::<Subject>(&text).unwrap(), hello());
    }

    #[test]
    fn custom_serializers() {
        let serializer = serializer(ConfigurationBuilder::new().configure::<Point>(|t| {
            t.serializer(PointText);
        }));
        let point = Point { x: 1, y: 2 };
        let text = serializer.serialize(&point).unwrap();
        assert_eq!(text, r#"<Point xmlns="urn:test">1,2</Point>"#);
        assert_eq!(serializer.deserialize::<Point>(&text).unwrap(), point);
    }

    #[test]
    fn serializer_returning_another_type_breaks_the_contract() {
        let serializer = serializer(ConfigurationBuilder::new().configure::<Subject>(|t| {
            t.member("Message").serializer(WrongType);
        }));
        let text = r#"<Subject xmlns="urn:test"><Message>x</Message></Subject>"#;
        assert!(matches!(
            serializer.deserialize::<Subject>(text),
            Err(Error::ContractViolation(_))
        ));
    }

    // ----------------------------------------------------------------
    // Configuration

    #[test]
    fn custom_activators() {
        // `Point` has no default constructor.
        let text = r#"<Point xmlns="urn:test"><X>1</X></Point>"#;

        let missing = serializer(ConfigurationBuilder::new().register::<Point>());
        assert!(matches!(
            missing.deserialize::<Point>(text),
            Err(Error::Activation(_))
        ));

        let configured = serializer(ConfigurationBuilder::new().configure::<Point>(|t| {
            t.activator(|| Box::new(Point { x: 0, y: -1 }));
        }));
        assert_eq!(
            configured.deserialize::<Point>(text).unwrap(),
            Point { x: 1, y: -1 }
        );
    }

    #[test]
    fn invalid_configurations_fail_to_build() {
        let unknown = ConfigurationBuilder::new().configure::<Subject>(|t| {
            t.member("Body").attribute();
        });
        assert!(matches!(unknown.build(), Err(Error::ContractViolation(_))));

        let two_identities = ConfigurationBuilder::new().configure::<Account>(|t| {
            t.member("Id").identity();
            t.member("Owner").identity();
        });
        assert!(matches!(two_identities.build(), Err(Error::ContractViolation(_))));

        let not_text = ConfigurationBuilder::new().configure::<Drawing>(|t| {
            t.member("Shapes").attribute();
        });
        assert!(matches!(not_text.build(), Err(Error::ContractViolation(_))));

        let clash = ConfigurationBuilder::new().configure::<Person>(|t| {
            t.member("Age").name("FullName");
        });
        assert!(matches!(clash.build(), Err(Error::ContractViolation(_))));
    }

    #[test]
    fn unknown_root_is_a_resolution_error() {
        let serializer = serializer(ConfigurationBuilder::new().register::<Subject>());
        assert!(matches!(
            serializer.deserialize::<Subject>(r#"<Unknown xmlns="urn:test"/>"#),
            Err(Error::TypeResolution { .. })
        ));
        assert!(matches!(
            serializer.deserialize::<Subject>("<Subject"),
            Err(Error::Document(_))
        ));
    }

    // ----------------------------------------------------------------
    // Namespaces

    fn namespaces(element: &Element, found: &mut Vec<String>) {
        let mut add = |namespace: Option<&str>| {
            if let Some(namespace) = namespace
                && !found.iter().any(|n| n == namespace)
            {
                found.push(namespace.to_owned());
            }
        };
        add(element.name().namespace());
        for attribute in element.attributes() {
            add(attribute.name.namespace());
            if let AttributeValue::Types(types) = &attribute.value {
                for type_ref in types {
                    type_ref.visit(&mut |t| add(t.namespace.as_deref()));
                }
            }
        }
        for child in element.elements() {
            namespaces(child, found);
        }
    }

    #[test]
    fn optimized_namespaces_are_declared_once() {
        let serializer = serializer(
            ConfigurationBuilder::new()
                .register::<Drawing>()
                .register::<Vec<u8>>()
                .configure::<Square>(|t| {
                    t.namespace("urn:other");
                })
                .use_optimized_namespaces(),
        );
        let drawing = Drawing {
            shapes: vec![Box::new(Circle { radius: 1.0 }), Box::new(Square { side: 2.0 })],
            favorite: Some(Box::new(Square { side: 3.0 })),
            anything: Box::new(vec![1_u8]),
        };
        let root = serializer.serialize_element(&drawing).unwrap();
        let mut used = Vec::new();
        namespaces(&root, &mut used);

        let text = serializer.serialize(&drawing).unwrap();
        assert_eq!(text.matches("xmlns").count(), used.len());
        assert!(text.starts_with(r#"<Drawing xmlns="urn:test""#));
        assert_eq!(serializer.serialize(&drawing).unwrap(), text);

        let read = serializer.deserialize::<Drawing>(&text).unwrap();
        assert_eq!(read.shapes.len(), 2);
    }

    // ----------------------------------------------------------------
    // Threads

    #[test]
    fn serializers_are_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Serializer>();

        let serializer = serializer(ConfigurationBuilder::new().register::<Person>());
        let serializer = &serializer;
        std::thread::scope(|s| {
            for age in 0..4_u32 {
                s.spawn(move || {
                    let person = Person {
                        full_name: format!("P{age}"),
                        age,
                    };
                    let text = serializer.serialize(&person).unwrap();
                    assert_eq!(serializer.deserialize::<Person>(&text).unwrap(), person);
                });
            }
        });
    }
}
