#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use lineage_lens::model::{DependencyKind, EntityRef, InputError, LineageEdge, SemanticMetadata};
    use lineage_lens::SemanticExtractor;

    const MODEL_JSON: &str = r#"{
        "Tables": [
            {"ID": 1, "Name": "Sales"},
            {"ID": 2, "Name": "Customer"},
            {"ID": 3, "Name": "Orders"}
        ],
        "Columns": [
            {"ID": 10, "TableID": 1, "Name": "Amount"},
            {"ID": 11, "TableID": 1, "Name": "Segment", "Expression": "RELATED(Customer[Segment])"},
            {"ID": 12, "TableID": 1, "Name": "Plain", "Expression": ""},
            {"ID": 13, "TableID": 42, "Name": "Orphan", "Expression": "Sales[Amount]"}
        ],
        "Measures": [
            {"ID": 20, "TableID": 1, "Name": "NetSales", "Expression": "SUM(Sales[Amount]) - [TotalDiscount]"},
            {"ID": 21, "TableID": 1, "Name": "TotalDiscount", "Expression": "SUM(Sales[Discount])"}
        ],
        "Partitions": [
            {"ID": 30, "TableID": 3,
             "Expression": "let Source = Sql.Database(\"srv\", \"dw\"), Q = Value.NativeQuery(Source, \"SELECT * FROM dbo.Orders\") in Q"},
            {"ID": 31, "TableName": "Customer", "Expression": null,
             "QueryDefinition": "Source{[Schema=\"dim\",Item=\"Customer\"]}[Data]"}
        ],
        "Relationships": [
            {"ID": 40, "FromTableID": 1, "ToTableID": 2},
            {"ID": 41, "FromTableID": 3, "ToTableID": 2}
        ]
    }"#;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "lineage_lens_{}_{}.json",
            std::process::id(),
            name
        ));
        fs::write(&path, content).unwrap();
        path
    }

    fn has_edge(edges: &[LineageEdge], source: &str, target: &str, kind: DependencyKind) -> bool {
        edges.iter().any(|e| {
            e.source == EntityRef::new(source)
                && e.target == EntityRef::new(target)
                && e.dependency_type == kind
        })
    }

    #[test]
    fn test_load_metadata_file() {
        let path = write_temp("model", MODEL_JSON);
        let metadata = SemanticMetadata::from_json_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(metadata.tables.len(), 3);
        assert_eq!(metadata.columns.len(), 4);
        assert_eq!(metadata.columns[0].expression, None);
        assert_eq!(metadata.partitions[1].table_name.as_deref(), Some("Customer"));
        assert_eq!(metadata.partitions[1].table_id, 0);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let path = std::env::temp_dir().join("lineage_lens_does_not_exist.json");
        let err = SemanticMetadata::from_json_file(&path).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
        assert!(err.to_string().contains("lineage_lens_does_not_exist.json"));
    }

    #[test]
    fn test_malformed_file_is_json_error() {
        let path = write_temp("malformed", "{\"Tables\": [");
        let err = SemanticMetadata::from_json_file(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, InputError::Json { .. }));
    }

    #[test]
    fn test_model_edges() {
        let metadata: SemanticMetadata = serde_json::from_str(MODEL_JSON).unwrap();
        let edges = SemanticExtractor::new().extract(&metadata, true);

        assert!(has_edge(
            &edges,
            "Sales.Amount",
            "Sales.NetSales",
            DependencyKind::ColumnReference
        ));
        assert!(has_edge(
            &edges,
            "Sales.TotalDiscount",
            "Sales.NetSales",
            DependencyKind::MeasureReference
        ));
        assert!(has_edge(
            &edges,
            "Sales.Discount",
            "Sales.TotalDiscount",
            DependencyKind::ColumnReference
        ));
        assert!(has_edge(
            &edges,
            "Customer.Segment",
            "Sales.Segment",
            DependencyKind::RelatedRelationship
        ));
        assert!(has_edge(&edges, "Sales", "Customer", DependencyKind::ModelRelationship));
        assert!(has_edge(&edges, "Orders", "Customer", DependencyKind::ModelRelationship));
        assert!(has_edge(&edges, "SQL.dbo.Orders", "Orders", DependencyKind::SourceMapping));
        assert!(has_edge(&edges, "SQL.dim.Customer", "Customer", DependencyKind::SourceMapping));

        // Empty expressions and unknown tables contribute nothing
        assert!(!edges.iter().any(|e| e.target == EntityRef::new("Sales.Plain")));
        assert!(!edges.iter().any(|e| e.target.as_str().ends_with(".ORPHAN")));
        assert_eq!(edges.len(), 8);
    }

    #[test]
    fn test_custom_labels() {
        let metadata: SemanticMetadata = serde_json::from_str(MODEL_JSON).unwrap();
        let extractor = SemanticExtractor {
            source_prefix: "EDW".to_string(),
            source_label: "M".to_string(),
            relationship_label: "rel".to_string(),
        };
        let edges = extractor.extract(&metadata, false);

        let sources: Vec<&LineageEdge> = edges
            .iter()
            .filter(|e| e.dependency_type == DependencyKind::SourceMapping)
            .collect();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|e| e.transformation == "M"));
        assert!(sources.iter().all(|e| e.source.as_str().starts_with("EDW.")));
        assert!(edges
            .iter()
            .filter(|e| e.dependency_type == DependencyKind::ModelRelationship)
            .all(|e| e.transformation == "rel"));
    }

    #[test]
    fn test_empty_metadata() {
        let metadata: SemanticMetadata = serde_json::from_str("{}").unwrap();
        assert!(SemanticExtractor::new().extract(&metadata, true).is_empty());
    }
}
