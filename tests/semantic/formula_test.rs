#[cfg(test)]
mod tests {
    use lineage_lens::model::{DependencyKind, EntityRef, LineageEdge};
    use lineage_lens::semantic::{extract_references, Formula, FormulaReference, MeasureIndex};

    fn pairs(edges: &[LineageEdge]) -> Vec<(String, String, DependencyKind)> {
        edges
            .iter()
            .map(|e| (e.source.to_string(), e.target.to_string(), e.dependency_type))
            .collect()
    }

    #[test]
    fn test_net_sales_measure() {
        let index = MeasureIndex::build([("NetSales", "Sales"), ("TotalDiscount", "Sales")]);
        let expression = "SUM(Sales[Amount]) - [TotalDiscount]";
        let edges = Formula::measure("Sales", "NetSales", expression).edges(&index);

        assert_eq!(
            pairs(&edges),
            vec![
                (
                    "SALES.AMOUNT".to_string(),
                    "SALES.NETSALES".to_string(),
                    DependencyKind::ColumnReference
                ),
                (
                    "SALES.TOTALDISCOUNT".to_string(),
                    "SALES.NETSALES".to_string(),
                    DependencyKind::MeasureReference
                ),
            ]
        );
        assert!(edges.iter().all(|e| e.transformation == expression));
    }

    #[test]
    fn test_measure_owned_by_another_table() {
        let index = MeasureIndex::build([("Budget", "Plan")]);
        let edges = Formula::measure("Sales", "Variance", "[Revenue] - [Budget]").edges(&index);

        let sources: Vec<&EntityRef> = edges.iter().map(|e| &e.source).collect();
        // Unknown measures fall back to the formula's own table
        assert_eq!(
            sources,
            vec![&EntityRef::new("Sales.Revenue"), &EntityRef::new("Plan.Budget")]
        );
    }

    #[test]
    fn test_related_column_uses_relationship_kind() {
        let index = MeasureIndex::default();
        let edges = Formula::calculated_column(
            "Sales",
            "CustomerRegion",
            "RELATED('Dim Customer'[Region])",
        )
        .edges(&index);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, EntityRef::new("DIM CUSTOMER.REGION"));
        assert_eq!(edges[0].target, EntityRef::new("SALES.CUSTOMERREGION"));
        assert_eq!(edges[0].dependency_type, DependencyKind::RelatedRelationship);
    }

    #[test]
    fn test_related_text_in_measure_stays_column_reference() {
        let index = MeasureIndex::default();
        let edges =
            Formula::measure("Sales", "Rows", "COUNTROWS(RELATEDTABLE(Orders)) + Sales[Qty]")
                .edges(&index);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].dependency_type, DependencyKind::ColumnReference);
    }

    #[test]
    fn test_quoted_table_with_escaped_quote() {
        let refs = extract_references("SUM('Owner''s Sales'[Net Amount])");
        assert_eq!(
            refs,
            vec![FormulaReference::Column {
                table: "Owner's Sales".to_string(),
                column: "Net Amount".to_string(),
            }]
        );
    }

    #[test]
    fn test_self_reference_is_kept() {
        let index = MeasureIndex::build([("Running", "Sales")]);
        let edges = Formula::measure("Sales", "Running", "[Running] + 1").edges(&index);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, edges[0].target);
    }

    #[test]
    fn test_no_references() {
        let index = MeasureIndex::default();
        assert!(Formula::measure("Sales", "One", "1 + 1").edges(&index).is_empty());
        assert!(extract_references("").is_empty());
    }
}
