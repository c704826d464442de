use seedsmith_core::{
    Column, ColumnType, Constraint, DatabaseSchema, FkAction, ForeignKey, Schema, Table, TableKind,
};

#[test]
fn serializes_schema_deterministically() {
    let schema = DatabaseSchema {
        schema_version: "0.1".to_string(),
        engine: "mysql".to_string(),
        database: Some("shop".to_string()),
        schemas: vec![Schema {
            name: "shop".to_string(),
            tables: Vec::new(),
        }],
    };

    let json = serde_json::to_string_pretty(&schema).expect("serialize schema");
    let expected = r#"{
  "schema_version": "0.1",
  "engine": "mysql",
  "database": "shop",
  "schemas": [
    {
      "name": "shop",
      "tables": []
    }
  ]
}"#;
    assert_eq!(json, expected);
}

#[test]
fn constraints_are_tagged_by_kind() {
    let table = Table {
        name: "orders".to_string(),
        kind: TableKind::Table,
        comment: None,
        columns: vec![Column {
            ordinal_position: 1,
            name: "customer_id".to_string(),
            column_type: ColumnType::from_label("int(11)"),
            is_nullable: false,
            default: None,
            auto_increment: false,
            comment: None,
        }],
        constraints: vec![Constraint::ForeignKey(ForeignKey {
            name: Some("fk_orders_customer".to_string()),
            columns: vec!["customer_id".to_string()],
            referenced_schema: "shop".to_string(),
            referenced_table: "customers".to_string(),
            referenced_columns: vec!["id".to_string()],
            on_delete: FkAction::SetNull,
        })],
    };

    let value = serde_json::to_value(&table).expect("serialize table");
    assert_eq!(value["kind"], "table");
    assert_eq!(value["columns"][0]["column_type"]["udt_name"], "int");
    assert_eq!(value["constraints"][0]["kind"], "foreign_key");
    assert_eq!(value["constraints"][0]["on_delete"], "set_null");

    let decoded: Table = serde_json::from_value(value).expect("deserialize table");
    let fk = decoded
        .foreign_key_for("customer_id")
        .expect("foreign key survives decoding");
    assert_eq!(fk.referenced_table, "customers");
}
