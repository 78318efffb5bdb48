#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use lineage_lens::lineage::format_flow_rows;
    use lineage_lens::model::{DependencyKind, EntityRef, LineageEdge};
    use lineage_lens::{LineageError, LineageGraph};

    fn edge(source: &str, target: &str, kind: DependencyKind, transformation: &str) -> LineageEdge {
        LineageEdge::new(EntityRef::new(source), EntityRef::new(target), kind, transformation)
    }

    fn sales_model() -> LineageGraph {
        use DependencyKind::*;
        let net_sales = "SUM(Sales[Amount]) - [TotalDiscount]";
        let margin_pct = "DIVIDE([Margin],\n    [NetSales])";
        LineageGraph::from_edges([
            edge("SQL.ODS.SALES", "Sales", SourceMapping, "Power Query Source"),
            edge("Sales.Discount", "Sales.TotalDiscount", ColumnReference, "SUM(Sales[Discount])"),
            edge("Sales.Amount", "Sales.NetSales", ColumnReference, net_sales),
            edge("Sales.TotalDiscount", "Sales.NetSales", MeasureReference, net_sales),
            edge("Sales.NetSales", "Sales.Margin", MeasureReference, "[NetSales] - [Cost]"),
            edge("Sales.Margin", "Sales.MarginPct", MeasureReference, margin_pct),
            edge("Sales.NetSales", "Sales.MarginPct", MeasureReference, margin_pct),
        ])
    }

    fn keys(entities: &std::collections::BTreeSet<EntityRef>) -> Vec<&str> {
        entities.iter().map(EntityRef::as_str).collect()
    }

    #[test]
    fn test_net_sales_impact() {
        let graph = sales_model();
        let analysis = graph.impact(&EntityRef::new("Sales.NetSales")).unwrap();

        assert_eq!(
            keys(&analysis.upstream),
            vec!["SALES.AMOUNT", "SALES.DISCOUNT", "SALES.TOTALDISCOUNT"]
        );
        assert_eq!(keys(&analysis.downstream), vec!["SALES.MARGIN", "SALES.MARGINPCT"]);

        let summary = analysis.summary();
        assert_eq!(summary.upstream, 3);
        assert_eq!(summary.downstream, 2);
        assert_eq!(summary.total_impact, 6);
        assert_eq!(summary.total_dependencies, 6);
    }

    #[test]
    fn test_net_sales_flow_table() {
        let graph = sales_model();
        let analysis = graph.impact(&EntityRef::new("Sales.NetSales")).unwrap();

        assert_snapshot!(format_flow_rows(&analysis.flow).trim_end(), @"Level\tSource\tTarget\tDependencyType\tTransformation\n\
-2\tSALES.DISCOUNT\tSALES.TOTALDISCOUNT\tColumn Reference\tSUM(Sales[Discount])\n\
-1\tSALES.AMOUNT\tSALES.NETSALES\tColumn Reference\tSUM(Sales[Amount]) - [TotalDiscount]\n\
-1\tSALES.TOTALDISCOUNT\tSALES.NETSALES\tMeasure Reference\tSUM(Sales[Amount]) - [TotalDiscount]\n\
0\tSALES.NETSALES\tSALES.MARGIN\tMeasure Reference\t[NetSales] - [Cost]\n\
0\tSALES.NETSALES\tSALES.MARGINPCT\tMeasure Reference\tDIVIDE([Margin], [NetSales])\n\
1\tSALES.MARGIN\tSALES.MARGINPCT\tMeasure Reference\tDIVIDE([Margin], [NetSales])");
    }

    #[test]
    fn test_subgraph_is_induced_and_detached() {
        let graph = sales_model();
        let analysis = graph.impact(&EntityRef::new("Sales.Margin")).unwrap();

        let nodes: Vec<&str> = analysis
            .subgraph
            .nodes()
            .into_iter()
            .map(EntityRef::as_str)
            .collect();
        assert_eq!(
            nodes,
            vec![
                "SALES.AMOUNT",
                "SALES.DISCOUNT",
                "SALES.MARGIN",
                "SALES.MARGINPCT",
                "SALES.NETSALES",
                "SALES.TOTALDISCOUNT",
            ]
        );
        // Every edge between kept nodes survives, including the NetSales shortcut
        assert_eq!(analysis.subgraph.edge_count(), 6);
        assert!(!analysis.subgraph.contains(&EntityRef::new("SQL.ODS.SALES")));

        let mut detached = analysis.subgraph.clone();
        detached.add_edge(edge("a", "b", DependencyKind::ColumnReference, ""));
        assert_eq!(graph.edge_count(), 7);
    }

    #[test]
    fn test_roots_have_no_ancestors() {
        let graph = sales_model();
        for root in graph.roots() {
            assert!(graph.ancestors(root).unwrap().is_empty(), "{root}");
        }
    }

    #[test]
    fn test_flow_levels_follow_edges() {
        let graph = sales_model();
        let analysis = graph.impact(&EntityRef::new("Sales.NetSales")).unwrap();

        for row in &analysis.flow {
            if analysis.upstream.contains(&row.source) {
                assert!(row.level < 0, "{row:?}");
            } else {
                assert!(row.level >= 0, "{row:?}");
            }
        }
        let levels: Vec<i64> = analysis.flow.iter().map(|r| r.level).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);
    }

    #[test]
    fn test_cycle_excludes_selected_node() {
        let graph = LineageGraph::from_edges([
            edge("A", "B", DependencyKind::MeasureReference, "[A]"),
            edge("B", "C", DependencyKind::MeasureReference, "[B]"),
            edge("C", "A", DependencyKind::MeasureReference, "[C]"),
        ]);
        let node = EntityRef::new("A");

        let upstream = graph.ancestors(&node).unwrap();
        let downstream = graph.descendants(&node).unwrap();
        assert!(!upstream.contains(&node));
        assert!(!downstream.contains(&node));
        assert_eq!(keys(&upstream), vec!["B", "C"]);
        assert_eq!(keys(&downstream), vec!["B", "C"]);

        let analysis = graph.impact(&node).unwrap();
        assert_eq!(analysis.summary().total_impact, 3);
        assert_eq!(analysis.flow.len(), 3);
        assert_eq!(graph.cycles().len(), 1);
    }

    #[test]
    fn test_isolated_node_impact() {
        let graph = sales_model();
        let analysis = graph.impact(&EntityRef::new("SQL.ODS.SALES")).unwrap();
        assert!(analysis.upstream.is_empty());
        assert_eq!(keys(&analysis.downstream), vec!["SALES"]);
        assert_eq!(analysis.flow.len(), 1);
        assert_eq!(analysis.flow[0].level, 0);
    }

    #[test]
    fn test_unknown_node() {
        let graph = sales_model();
        let err = graph.impact(&EntityRef::new("Sales.Nope")).unwrap_err();
        assert!(matches!(err, LineageError::NodeNotFound(ref key) if key == "SALES.NOPE"));
        assert!(graph.ancestors(&EntityRef::new("")).is_err());
    }
}
