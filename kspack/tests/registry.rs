use std::sync::Arc;
use std::thread;

use kspack::codecs::{JSON, KSPACK};
use kspack::erased_serde;
use kspack::{
    has_registered, plugin_instance, register, Codec, CodecRegistry, DecodeVisitor, KspackError,
    Result, Tag, Value,
};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    customer: String,
    lines: Vec<Line>,
    note: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Line {
    sku: String,
    qty: u32,
}

fn sample_order() -> Order {
    Order {
        id: 77,
        customer: "Ada".to_string(),
        lines: vec![
            Line {
                sku: "A-1".to_string(),
                qty: 2,
            },
            Line {
                sku: "B-9".to_string(),
                qty: 1,
            },
        ],
        note: None,
    }
}

struct Reverse;

impl Codec for Reverse {
    fn name(&self) -> &str {
        "reverse"
    }

    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        let mut bytes = kspack::marshal(value)?;
        bytes.reverse();
        Ok(bytes)
    }

    fn unmarshal_with(&self, input: &[u8], visit: &mut DecodeVisitor<'_>) -> Result<()> {
        let mut bytes = input.to_vec();
        bytes.reverse();
        let mut de = kspack::Deserializer::from_slice(&bytes)?;
        visit(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
            .map_err(KspackError::custom)?;
        de.end()
    }
}

fn reverse() -> Box<dyn Codec> {
    Box::new(Reverse)
}

#[test]
fn test_builtin_codecs_preregistered() {
    assert!(has_registered(KSPACK));
    assert!(has_registered(JSON));
    assert_eq!(plugin_instance(KSPACK).unwrap().name(), KSPACK);
    assert_eq!(plugin_instance(JSON).unwrap().name(), JSON);
}

#[test]
fn test_unknown_codec_is_none() {
    assert!(plugin_instance("no-such-codec").is_none());
    assert!(!has_registered("no-such-codec"));
}

#[test]
#[should_panic(expected = "already registered")]
fn test_duplicate_global_registration_panics() {
    register(KSPACK, Some(reverse));
}

#[test]
#[should_panic(expected = "missing")]
fn test_missing_constructor_panics() {
    register("missing-constructor", None);
}

#[test]
fn test_global_registration() {
    register("reverse-global", Some(reverse));
    assert!(has_registered("reverse-global"));

    let codec = plugin_instance("reverse-global").unwrap();
    let bytes = codec.marshal(&sample_order()).unwrap();
    assert_eq!(codec.unmarshal_into::<Order>(&bytes).unwrap(), sample_order());
}

#[test]
fn test_typed_roundtrip_through_every_builtin() {
    let registry = CodecRegistry::with_builtin();
    for name in registry.names() {
        let codec = registry.instance(&name).unwrap();
        let bytes = codec.marshal(&sample_order()).unwrap();
        let back: Order = codec.unmarshal_into(&bytes).unwrap();
        assert_eq!(back, sample_order(), "codec {}", name);
    }
}

#[test]
fn test_registry_bytes_match_direct_encoding() {
    #[derive(Serialize)]
    #[allow(non_snake_case)]
    struct Sample {
        Name: &'static str,
        N: i32,
    }
    #[derive(Serialize)]
    struct Reading {
        celsius: f32,
        count: u16,
    }

    let codec = plugin_instance(KSPACK).unwrap();
    let sample = Sample { Name: "a", N: 100 };
    let direct = kspack::marshal(&sample).unwrap();
    assert_eq!(codec.marshal(&sample).unwrap(), direct);
    assert_eq!(direct[2], 0x16);
    assert_eq!(Tag::from_u8(direct[20]).unwrap(), Tag::Int32);

    let reading = Reading {
        celsius: 21.5,
        count: 3,
    };
    assert_eq!(
        codec.marshal(&reading).unwrap(),
        kspack::marshal(&reading).unwrap()
    );
    assert_eq!(
        codec.marshal(&sample_order()).unwrap(),
        kspack::marshal(&sample_order()).unwrap()
    );
}

#[test]
fn test_codecs_interoperate_through_value() {
    let registry = CodecRegistry::with_builtin();
    let kspack = registry.instance(KSPACK).unwrap();
    let json = registry.instance(JSON).unwrap();

    let binary = kspack.marshal(&sample_order()).unwrap();
    let tree: Value = kspack.unmarshal(&binary).unwrap();
    let text = json.marshal(&tree).unwrap();
    let order: Order = json.unmarshal_into(&text).unwrap();
    assert_eq!(order, sample_order());
}

#[test]
fn test_kspack_codec_rejects_malformed_input() {
    let codec = plugin_instance(KSPACK).unwrap();
    let mut bytes = codec.marshal(&sample_order()).unwrap();
    bytes.pop();
    assert!(matches!(
        codec.unmarshal(&bytes),
        Err(KspackError::UnexpectedEnd)
    ));
}

#[test]
fn test_concurrent_registration() {
    let registry = Arc::new(CodecRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let name = format!("reverse-{}", i);
                registry.try_register(&name, Some(reverse)).unwrap();
                // every thread also races on one shared name
                registry.try_register("shared", Some(reverse)).is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(registry.names().len(), 9);
    assert!(registry.instance("shared").is_some());
}

mod properties {
    use super::{CodecRegistry, Line, Order, JSON, KSPACK};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn builtin_codecs_agree(
            id in any::<u64>(),
            customer in "\\PC{0,40}",
            qtys in proptest::collection::vec(any::<u32>(), 0..8),
            note in proptest::option::of("[a-z ]{0,20}"),
        ) {
            let order = Order {
                id,
                customer,
                lines: qtys
                    .into_iter()
                    .enumerate()
                    .map(|(i, qty)| Line { sku: format!("S-{}", i), qty })
                    .collect(),
                note,
            };
            let registry = CodecRegistry::with_builtin();
            for name in [KSPACK, JSON] {
                let codec = registry.instance(name).unwrap();
                let bytes = codec.marshal(&order).unwrap();
                let back: Order = codec.unmarshal_into(&bytes).unwrap();
                prop_assert_eq!(&back, &order);
            }
        }
    }
}
