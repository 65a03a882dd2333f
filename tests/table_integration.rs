//! Integration tests for the clustered product table.

use bptree_index::{Error, Key, KeyType, Product, ProductCodec, RecordStore, Table, TreeConfig};
use tempfile::tempdir;

fn config() -> TreeConfig {
    TreeConfig::new(KeyType::Int).with_order(4)
}

#[test]
fn test_cardinality_after_inserts_and_deletes() {
    let dir = tempdir().unwrap();
    let idx = dir.path().join("products.idx");
    let dat = dir.path().join("products.dat");
    let mut table = Table::create(&idx, &dat, ProductCodec, config()).unwrap();

    for id in 0..50 {
        let product = Product::new(id, format!("product-{}", id), id as f32 * 1.5);
        table.insert(&product).unwrap();
    }
    for id in (0..50).filter(|id| id % 5 == 0) {
        assert!(table.delete(&Key::Int(id)).unwrap());
    }

    assert_eq!(table.len(), 40);
    assert_eq!(table.index_mut().len().unwrap(), 40);
    assert_eq!(table.records().len(), 40);
    table.index_mut().verify().unwrap();
}

#[test]
fn test_reopen_table() {
    let dir = tempdir().unwrap();
    let idx = dir.path().join("products.idx");
    let dat = dir.path().join("products.dat");

    {
        let mut table = Table::create(&idx, &dat, ProductCodec, config()).unwrap();
        table.insert(&Product::new(7, "chair", 45.0)).unwrap();
        table.insert(&Product::new(3, "table", 150.0)).unwrap();
        table.insert(&Product::new(9, "shelf", 80.25)).unwrap();
        assert!(table.delete(&Key::Int(3)).unwrap());
        table.sync().unwrap();
    }

    let mut table = Table::open(&idx, &dat, ProductCodec, config()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(&Key::Int(3)).unwrap(), None);
    assert_eq!(
        table.get(&Key::Int(9)).unwrap(),
        Some(Product::new(9, "shelf", 80.25))
    );

    let names: Vec<String> = table
        .range(&Key::Int(0), &Key::Int(100))
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["chair", "shelf"]);
}

#[test]
fn test_duplicate_id_rejected() {
    let dir = tempdir().unwrap();
    let mut table = Table::open_or_create(
        dir.path().join("p.idx"),
        dir.path().join("p.dat"),
        ProductCodec,
        config(),
    )
    .unwrap();

    table.insert(&Product::new(1, "lamp", 10.0)).unwrap();
    assert!(matches!(
        table.insert(&Product::new(1, "lamp again", 12.0)),
        Err(Error::DuplicateKey(_))
    ));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get_all(&Key::Int(1)).unwrap()[0].name, "lamp");
}

#[test]
fn test_long_names_are_truncated() {
    let dir = tempdir().unwrap();
    let mut table = Table::create(
        dir.path().join("p.idx"),
        dir.path().join("p.dat"),
        ProductCodec,
        config(),
    )
    .unwrap();

    let long = "x".repeat(ProductCodec::NAME_WIDTH + 10);
    table.insert(&Product::new(1, long, 1.0)).unwrap();
    let stored = table.get(&Key::Int(1)).unwrap().unwrap();
    assert_eq!(stored.name.len(), ProductCodec::NAME_WIDTH);
}

#[test]
fn test_wrong_key_type_is_format_error() {
    let dir = tempdir().unwrap();
    let mut table = Table::create(
        dir.path().join("p.idx"),
        dir.path().join("p.dat"),
        ProductCodec,
        config(),
    )
    .unwrap();

    assert!(matches!(table.get(&Key::from("1")), Err(Error::Format(_))));
}
