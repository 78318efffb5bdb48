#[cfg(test)]
mod tests {
    use lineage_lens::lineage::SerializedLineage;
    use lineage_lens::model::{
        ColumnRow, DependencyKind, EntityRef, MeasureRow, ObjectKind, PartitionRow,
        SemanticMetadata, SqlObject, TableRow,
    };
    use lineage_lens::{build_lineage, BuildOptions, LineageGraph, LineageInputs};

    fn sql_objects() -> Vec<SqlObject> {
        vec![
            SqlObject::new(
                "etl",
                "usp_load_sales",
                ObjectKind::StoredProcedure,
                "CREATE PROCEDURE etl.usp_load_sales AS\n\
                 BEGIN\n\
                     INSERT INTO ODS.SALES (SaleId, Amount)\n\
                     SELECT r.Id, r.Qty * r.Price FROM RAW.SALES r;\n\
                 END",
            ),
            SqlObject::new(
                "ODS",
                "VW_SALES",
                ObjectKind::View,
                "CREATE VIEW ODS.VW_SALES AS SELECT s.SaleId, s.Amount FROM ODS.SALES s",
            ),
            SqlObject::new("dbo", "broken", ObjectKind::View, "CREATE VIEW dbo.broken AS SELEC 1"),
        ]
    }

    fn metadata() -> SemanticMetadata {
        SemanticMetadata {
            tables: vec![TableRow {
                id: 1,
                name: "Sales".to_string(),
            }],
            columns: vec![ColumnRow {
                id: 10,
                table_id: 1,
                name: "Amount".to_string(),
                expression: None,
            }],
            measures: vec![MeasureRow {
                id: 20,
                table_id: 1,
                name: "NetSales".to_string(),
                expression: Some("SUM(Sales[Amount])".to_string()),
            }],
            partitions: vec![PartitionRow {
                id: 30,
                table_id: 1,
                table_name: None,
                expression: Some(
                    r#"let S = Sql.Database("srv", "dw"), T = S{[Schema="ODS",Item="VW_SALES"]}[Data] in T"#
                        .to_string(),
                ),
                query_definition: None,
            }],
            relationships: Vec::new(),
        }
    }

    fn inputs() -> LineageInputs {
        LineageInputs {
            sql_objects: sql_objects(),
            metadata: Some(metadata()),
        }
    }

    #[test]
    fn test_sql_and_semantic_edges_share_one_graph() {
        let build = build_lineage(&inputs(), &BuildOptions::default());

        assert_eq!(build.processed, 2);
        assert_eq!(build.skipped.len(), 1);
        assert_eq!(build.skipped[0].object, "dbo.broken");

        let graph = &build.graph;
        for key in [
            "RAW.SALES.QTY",
            "ODS.SALES.AMOUNT",
            "ODS.VW_SALES.AMOUNT",
            "SQL.ODS.VW_SALES",
            "SALES",
            "SALES.AMOUNT",
            "SALES.NETSALES",
        ] {
            assert!(graph.contains(&EntityRef::new(key)), "missing {key}");
        }

        let upstream = graph.ancestors(&EntityRef::new("ODS.VW_SALES.Amount")).unwrap();
        let upstream: Vec<&str> = upstream.iter().map(EntityRef::as_str).collect();
        assert_eq!(upstream, vec!["ODS.SALES.AMOUNT", "RAW.SALES.PRICE", "RAW.SALES.QTY"]);

        let kinds: Vec<DependencyKind> = graph.edges().iter().map(|e| e.dependency_type).collect();
        assert!(kinds.contains(&DependencyKind::SourceMapping));
        assert!(kinds.contains(&DependencyKind::ColumnReference));
    }

    #[test]
    fn test_build_is_order_independent() {
        let forward = build_lineage(&inputs(), &BuildOptions::default());

        let mut reversed = inputs();
        reversed.sql_objects.reverse();
        let options = BuildOptions {
            parallel: false,
            ..BuildOptions::default()
        };
        let backward = build_lineage(&reversed, &options);

        assert_eq!(forward.graph.edges(), backward.graph.edges());
        assert_eq!(forward.graph.nodes(), backward.graph.nodes());
    }

    #[test]
    fn test_rebuild_collapses_duplicates() {
        let mut doubled = inputs();
        doubled.sql_objects.extend(sql_objects());
        let once = build_lineage(&inputs(), &BuildOptions::default());
        let twice = build_lineage(&doubled, &BuildOptions::default());

        assert_eq!(once.graph.edge_count(), twice.graph.edge_count());
        assert_eq!(twice.sql_rows.len(), 2 * once.sql_rows.len());
    }

    #[test]
    fn test_sql_rows_filter() {
        let build = build_lineage(&inputs(), &BuildOptions::default());
        let rows = build.sql_rows_for_column("amount");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.object_type == ObjectKind::StoredProcedure));
        assert!(rows.iter().any(|r| r.object_type == ObjectKind::View));
    }

    #[test]
    fn test_graph_survives_serialization() {
        let build = build_lineage(&inputs(), &BuildOptions::default());
        let json = serde_json::to_string(&build.graph.to_serializable()).unwrap();
        let restored: SerializedLineage = serde_json::from_str(&json).unwrap();
        let graph = LineageGraph::from_serializable(restored);
        assert_eq!(graph.edges(), build.graph.edges());
    }
}
