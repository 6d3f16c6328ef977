//! Property tests: scalar and container values survive weave → unweave

use std::collections::BTreeMap;

use proptest::prelude::*;
use weaver_core::{Bytes, Dict, Set, Tuple, Value};
use weaver_engine::{Registry, Weaver, from_json_str, to_json_string};
use weaver_storage::InMemoryArtefactStore;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "[a-z0-9 ]{0,12}".prop_map(Value::Str),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(|b| Value::object(Bytes(b))),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            proptest::collection::btree_map("[a-z]{1,6}", inner.clone(), 0..6).prop_map(Value::Map),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(|items| Value::object(Tuple(items))),
            proptest::collection::vec(any::<i64>(), 0..6)
                .prop_map(|items| Value::object(items.into_iter().map(Value::Int).collect::<Set>())),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|entries: BTreeMap<String, Value>| Value::object(Dict(entries))),
        ]
    })
}

proptest! {
    #[test]
    fn prop_round_trip(value in value()) {
        let registry = Registry::defaults();
        let store = InMemoryArtefactStore::new();
        let weaver = Weaver::new(&registry, &store);

        let woven = weaver.weave(&value).unwrap();
        let back = weaver.unweave(&woven).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn prop_document_round_trip(value in value()) {
        let registry = Registry::defaults();
        let store = InMemoryArtefactStore::new();
        let weaver = Weaver::new(&registry, &store);

        let woven = weaver.weave(&value).unwrap();
        let parsed = from_json_str(&to_json_string(&woven).unwrap()).unwrap();
        prop_assert_eq!(&parsed, &woven);
        prop_assert_eq!(weaver.unweave(&parsed).unwrap(), value);
    }
}
