//! Structured records with heap-stored and nested members.

use std::collections::HashSet;
use std::sync::Arc;

use array_io::{
    ByteOrder, DataType, MemberData, MemberValue, PrimitiveArray, StructureDataStorage,
    StructureLayout,
};
use test_utils::{assert_approx_eq, location_layout, observation_layout};

fn location(lat: f32, lon: f32, tag: &str) -> StructureDataStorage {
    let mut storage = StructureDataStorage::new(location_layout(), 1);
    storage
        .set_member_data(0, "lat", MemberData::Array(PrimitiveArray::Float(vec![lat])))
        .unwrap();
    storage
        .set_member_data(0, "lon", MemberData::Array(PrimitiveArray::Float(vec![lon])))
        .unwrap();
    storage
        .set_member_data(0, "tag", MemberData::Strings(vec![tag.to_string()]))
        .unwrap();
    storage
}

fn observations(layout: Arc<StructureLayout>) -> StructureDataStorage {
    let mut storage = StructureDataStorage::new(layout, 3);
    for rec in 0..3usize {
        let r = rec as i16;
        storage
            .set_member_data(rec, "id", MemberData::Array(PrimitiveArray::Int(vec![rec as i32 + 1])))
            .unwrap();
        storage
            .set_member_data(
                rec,
                "names",
                MemberData::Strings(vec![format!("first{rec}"), format!("second{rec}")]),
            )
            .unwrap();
        storage
            .set_member_data(
                rec,
                "values",
                MemberData::Array(PrimitiveArray::Short(vec![r, r * 2, r * 3])),
            )
            .unwrap();
        storage
            .set_member_data(
                rec,
                "location",
                MemberData::Records(location(rec as f32 + 0.5, -(rec as f32), &format!("loc{rec}"))),
            )
            .unwrap();
    }
    storage
}

fn check_record(storage: &StructureDataStorage, rec: usize) {
    let record = storage.record(rec).unwrap();

    let id = record.member_data("id").unwrap();
    assert_eq!(id.as_array().unwrap().as_ints(), Some(&[rec as i32 + 1][..]));

    let names = record.member_data("names").unwrap();
    assert_eq!(
        names.as_strings().unwrap(),
        &[format!("first{rec}"), format!("second{rec}")]
    );

    let r = rec as i16;
    let values = record.member_data("values").unwrap();
    assert_eq!(values.as_array().unwrap().as_shorts(), Some(&[r, r * 2, r * 3][..]));

    let location = match record.member_data("location").unwrap() {
        MemberValue::Structure(view) => view.record(0).unwrap(),
        MemberValue::Records(records) => records.record(0).unwrap(),
        other => panic!("unexpected location value {other:?}"),
    };
    let lat = location.member_data("lat").unwrap();
    assert_approx_eq!(lat.as_array().unwrap().get_f64(0).unwrap(), rec as f64 + 0.5, 1e-6);
    let tag = location.member_data("tag").unwrap();
    assert_eq!(tag.as_strings().unwrap(), &[format!("loc{rec}")]);
}

#[test]
fn test_records_read_back_in_any_order() {
    let storage = observations(observation_layout());
    for rec in [2, 0, 1, 1, 2] {
        check_record(&storage, rec);
    }
    // names and the nested tag of every record
    assert_eq!(storage.heap_len(), 6);
}

#[test]
fn test_heap_indices_are_distinct() {
    let storage = observations(observation_layout());
    let member = storage.layout().find_member("names").unwrap();
    let size = storage.structure_size();

    let indices: HashSet<u32> = (0..storage.len())
        .map(|rec| {
            let pos = rec * size + member.byte_offset();
            let slot: [u8; 4] = storage.buffer()[pos..pos + 4].try_into().unwrap();
            u32::from_be_bytes(slot)
        })
        .collect();
    assert_eq!(indices.len(), 3);
    assert!(indices.iter().all(|&i| storage.heap_value(i).is_some()));
}

#[test]
fn test_nested_structure_is_a_view_of_the_parent_buffer() {
    let storage = observations(observation_layout());
    let MemberValue::Structure(view) = storage.member_data(1, "location").unwrap() else {
        panic!("expected inline structure");
    };
    assert_eq!(view.len(), 1);
    assert_eq!(view.layout().name(), "location");

    let lat_offset = storage.layout().find_member("location").unwrap().byte_offset();
    let pos = storage.structure_size() + lat_offset;
    let raw: [u8; 4] = storage.buffer()[pos..pos + 4].try_into().unwrap();
    assert_eq!(f32::from_be_bytes(raw), 1.5);
}

#[test]
fn test_structures_on_heap() {
    let layout = StructureLayout::builder("observation")
        .structures_on_heap(true)
        .add_member("id", DataType::Int, &[])
        .add_member("names", DataType::String, &[2])
        .add_member("values", DataType::Short, &[3])
        .add_structure_member("location", &[], location_layout())
        .build()
        .unwrap();
    assert_eq!(layout.storage_size_bytes(), 4 + 4 + 6 + 4);

    let storage = observations(layout);
    for rec in [1, 2, 0] {
        check_record(&storage, rec);
    }
    assert!(matches!(
        storage.member_data(0, "location").unwrap(),
        MemberValue::Records(_)
    ));
}

#[test]
fn test_little_endian_members() {
    let layout = StructureLayout::builder("le")
        .byte_order(ByteOrder::LittleEndian)
        .add_member("v", DataType::Int, &[])
        .build()
        .unwrap();
    let mut storage = StructureDataStorage::new(layout, 1);
    storage
        .set_member_data(0, "v", MemberData::Array(PrimitiveArray::Int(vec![1])))
        .unwrap();
    assert_eq!(storage.buffer(), &[1, 0, 0, 0]);
}

#[test]
fn test_copy_record_between_storages() {
    let source = observations(observation_layout());
    let mut target = StructureDataStorage::new(observation_layout(), 1);

    let record = source.record(2).unwrap();
    for member in record.layout().members() {
        let data = record.member_value(member).unwrap().to_owned_data().unwrap();
        target.set_member(0, member, data).unwrap();
    }

    let names = target.member_data(0, "names").unwrap();
    assert_eq!(names.as_strings().unwrap(), &["first2".to_string(), "second2".to_string()]);
    let MemberValue::Structure(view) = target.member_data(0, "location").unwrap() else {
        panic!("expected inline structure");
    };
    let tag = view.record(0).unwrap().member_data("tag").unwrap();
    assert_eq!(tag.as_strings().unwrap(), &["loc2".to_string()]);
}

#[test]
fn test_opaque_and_sequence_members() {
    let item = StructureLayout::builder("item")
        .add_member("n", DataType::Long, &[])
        .build()
        .unwrap();
    let layout = StructureLayout::builder("blob")
        .add_member("payload", DataType::Opaque, &[])
        .add_sequence_member("items", item.clone())
        .build()
        .unwrap();

    let mut items = StructureDataStorage::new(item, 4);
    for i in 0..4 {
        items
            .set_member_data(i, "n", MemberData::Array(PrimitiveArray::Long(vec![i as i64 * 7])))
            .unwrap();
    }

    let mut storage = StructureDataStorage::new(layout, 1);
    let payload = PrimitiveArray::Opaque {
        data: vec![1, 2, 3],
        elem_size: 3,
    };
    storage
        .set_member_data(0, "payload", MemberData::Array(payload.clone()))
        .unwrap();
    storage.set_member_data(0, "items", MemberData::Records(items)).unwrap();

    assert_eq!(storage.member_data(0, "payload").unwrap().as_array(), Some(&payload));
    let MemberValue::Records(seq) = storage.member_data(0, "items").unwrap() else {
        panic!("expected sequence records");
    };
    let last = seq.member_data(3, "n").unwrap();
    assert_eq!(last.as_array().unwrap().as_longs(), Some(&[21][..]));
}

#[test]
fn test_concurrent_readers() {
    let storage = observations(observation_layout());
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for rec in (0..storage.len()).rev() {
                    check_record(&storage, rec);
                }
            });
        }
    });
}
