#[cfg(test)]
mod tests {
    use lineage_lens::model::{ObjectKind, SqlObject};
    use lineage_lens::sql::{find_column_usage, insert_target, ColumnUsageRow, SqlLineageExtractor};

    fn catalog() -> Vec<SqlObject> {
        vec![
            SqlObject::new(
                "rpt",
                "vw_sales",
                ObjectKind::View,
                "CREATE VIEW rpt.vw_sales AS \
                 SELECT s.SaleId, s.Qty * s.Price AS Revenue, s.Region AS SalesRegion \
                 FROM ODS.SALES s",
            ),
            SqlObject::new(
                "etl",
                "usp_load_fact",
                ObjectKind::StoredProcedure,
                "CREATE PROCEDURE etl.usp_load_fact AS BEGIN \
                 INSERT INTO [DW].[FACT_SALES] (SaleKey, Amount) \
                 SELECT SaleId, Qty * Price AS Amount FROM ODS.SALES; \
                 END",
            ),
            SqlObject::new(
                "rpt",
                "vw_customers",
                ObjectKind::View,
                "CREATE VIEW rpt.vw_customers AS SELECT c.Name FROM ODS.CUSTOMER c",
            ),
        ]
    }

    fn usage(rows: &[ColumnUsageRow]) -> Vec<(&str, ObjectKind, &str, &str)> {
        rows.iter()
            .map(|r| {
                (
                    r.object_name.as_str(),
                    r.object_type,
                    r.object_column.as_str(),
                    r.transformation.as_str(),
                )
            })
            .collect()
    }

    #[test]
    fn test_usage_in_views_and_procedures() {
        let extractor = SqlLineageExtractor::default();
        let rows = find_column_usage(&extractor, &catalog(), "ODS.SALES", "Qty");

        assert_eq!(
            usage(&rows),
            vec![
                ("rpt.vw_sales", ObjectKind::View, "Revenue", "s.Qty * s.Price"),
                (
                    "etl.usp_load_fact",
                    ObjectKind::StoredProcedure,
                    "Amount",
                    "Qty * Price"
                ),
                ("DW.FACT_SALES", ObjectKind::Table, "Amount", "Qty * Price"),
            ]
        );
        assert!(rows.iter().all(|r| r.source_table == "ODS.SALES"));
        assert!(rows.iter().all(|r| r.source_column == "QTY"));
    }

    #[test]
    fn test_bare_column_usage() {
        let extractor = SqlLineageExtractor::default();
        let rows = find_column_usage(&extractor, &catalog(), "ods.sales", "saleid");

        let objects: Vec<_> = usage(&rows)
            .into_iter()
            .map(|(name, kind, column, _)| (name, kind, column))
            .collect();
        assert_eq!(
            objects,
            vec![
                ("rpt.vw_sales", ObjectKind::View, "SaleId"),
                ("etl.usp_load_fact", ObjectKind::StoredProcedure, "SaleId"),
                ("DW.FACT_SALES", ObjectKind::Table, "SaleId"),
            ]
        );
    }

    #[test]
    fn test_objects_not_mentioning_table_are_skipped() {
        let extractor = SqlLineageExtractor::default();
        let rows = find_column_usage(&extractor, &catalog(), "ODS.CUSTOMER", "Qty");
        assert!(rows.is_empty());

        let rows = find_column_usage(&extractor, &catalog(), "ODS.CUSTOMER", "Name");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].object_name, "rpt.vw_customers");
    }

    #[test]
    fn test_usage_rows_are_unique() {
        let mut objects = catalog();
        objects.push(objects[0].clone());
        let extractor = SqlLineageExtractor::default();
        let rows = find_column_usage(&extractor, &objects, "ODS.SALES", "Region");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].object_column, "SalesRegion");
    }

    #[test]
    fn test_insert_target_regex() {
        assert_eq!(
            insert_target("insert into [stg].[Load] (a) select 1").as_deref(),
            Some("stg.Load")
        );
        assert_eq!(insert_target("INSERT INTO #temp SELECT 1"), None);
    }
}
