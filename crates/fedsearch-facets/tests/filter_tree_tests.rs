use std::collections::HashMap;

use fedsearch_core::types::FacetBucket;
use fedsearch_facets::{
    applied_search_filters, build_and_apply_text_filters, build_filter_tree, build_sheet_filters, load_toc, FilterNode, TocEntry,
};

fn toc() -> Vec<TocEntry> {
    vec![
        TocEntry::category("Tanakh", "תנ״ך", vec![
            TocEntry::category("Torah", "תורה", vec![
                TocEntry::text("Genesis", "בראשית"),
                TocEntry::text("Exodus", "שמות"),
            ]),
            TocEntry::category("Prophets", "נביאים", vec![TocEntry::text("Joshua", "יהושע")]),
        ]),
        TocEntry::category("Mishnah", "משנה", vec![
            TocEntry::category("Seder Zeraim", "סדר זרעים", vec![TocEntry::text("Mishnah Berakhot", "משנה ברכות")]),
        ]),
        TocEntry::category("Talmud", "תלמוד", vec![TocEntry::text("Berakhot", "ברכות")]),
    ]
}

fn buckets() -> Vec<FacetBucket> {
    vec![
        FacetBucket::new("Tanakh/Torah/Genesis", 3),
        FacetBucket::new("Tanakh/Torah/Exodus", 2),
        FacetBucket::new("Mishnah/Seder Zeraim/Mishnah Berakhot", 5),
        FacetBucket::new("Commentary/Tanakh", 4),
        FacetBucket::new("Commentary2/Tanakh/Rashi", 1),
    ]
}

fn assert_sums(node: &FilterNode) {
    if node.has_children() {
        let sum: u64 = node.children.iter().map(|c| c.doc_count).sum();
        assert_eq!(node.doc_count, sum, "node {} should sum its children", node.agg_key);
        node.children.iter().for_each(assert_sums);
    }
}

#[test]
fn tree_follows_toc_order_and_drops_empty_branches() {
    let tree = build_filter_tree(&buckets(), &[], &toc());
    let keys: Vec<&str> = tree.available.iter().map(|n| n.agg_key.as_str()).collect();
    assert_eq!(keys, vec!["Tanakh", "Commentary/Tanakh", "Mishnah"], "Talmud has no results");

    let tanakh = &tree.available[0];
    assert_eq!(tanakh.doc_count, 5);
    assert_eq!(tanakh.he_title, "תנ״ך");
    assert_eq!(tanakh.children.len(), 1, "Prophets has no results");
    let torah = &tanakh.children[0];
    assert_eq!(torah.agg_key, "Tanakh/Torah");
    assert_eq!(torah.children.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(), vec!["Genesis", "Exodus"]);
    tree.available.iter().filter(|n| n.agg_key != "Commentary/Tanakh").for_each(assert_sums);
}

#[test]
fn commentary_sibling_sums_both_variants() {
    let tree = build_filter_tree(&buckets(), &[], &toc());
    let commentary = tree.get("Commentary/Tanakh").expect("commentary node");
    assert_eq!(commentary.title, "Tanakh Commentary");
    assert_eq!(commentary.he_title, "מפרשי תנ״ך");
    assert_eq!(commentary.doc_count, 5);
}

#[test]
fn registry_reaches_nested_nodes() {
    let tree = build_filter_tree(&buckets(), &[], &toc());
    assert!(tree.contains("Tanakh/Torah/Exodus"));
    assert_eq!(tree.get("Mishnah/Seder Zeraim").map(|n| n.doc_count), Some(5));
    assert!(tree.get("Talmud").is_none());
    assert_eq!(tree.keys().count(), 8);
}

#[test]
fn applied_filters_select_nodes_and_report_orphans() {
    // Talmud/Shabbat is not in the table of contents, so no node can carry it
    let applied = vec!["Tanakh/Torah".to_string(), "Talmud/Shabbat".to_string()];
    let out = build_and_apply_text_filters(&buckets(), &applied, &toc());
    assert_eq!(out.orphans, vec!["Talmud/Shabbat".to_string()]);

    let torah = out.tree.get("Tanakh/Torah").unwrap();
    assert!(torah.selected);
    assert!(torah.children.iter().all(|c| c.selected), "selection cascades to children");
    assert!(out.tree.available[0].is_partially_selected());

    let extracted = applied_search_filters(&out.tree.available);
    assert_eq!(extracted.filters, vec!["Tanakh/Torah".to_string()]);
    assert_eq!(extracted.agg_types, vec!["path".to_string()]);
}

#[test]
fn applied_filter_without_results_still_gets_a_node() {
    // Talmud/Berakhot has no bucket, but applying it inserts the path at zero
    let applied = vec!["Talmud/Berakhot".to_string()];
    let tree = build_filter_tree(&buckets(), &applied, &toc());
    let talmud = tree.get("Talmud").expect("applied path is kept");
    assert_eq!(talmud.doc_count, 0);
    assert!(tree.contains("Talmud/Berakhot"));
}

#[test]
fn sheet_filters_are_flat_and_script_aware() {
    let buckets = vec![FacetBucket::new("Shabbat", 7), FacetBucket::new("פסח", 2), FacetBucket::new("Educators", 1)];
    let terms: HashMap<String, String> = [("Shabbat".to_string(), "שבת".to_string())].into_iter().collect();

    let topics = build_sheet_filters(&buckets[..2], &["Shabbat".into()], &["topics_en".into()], "topics_en", &terms);
    assert_eq!(topics[0].title, "Shabbat");
    assert_eq!(topics[0].he_title, "שבת");
    assert!(topics[0].selected);
    assert_eq!(topics[1].title, "");
    assert_eq!(topics[1].agg_key, "פסח");
    assert!(!topics[1].selected);

    let groups = build_sheet_filters(&buckets[2..], &["Educators".into()], &["topics_en".into()], "group", &terms);
    assert_eq!(groups[0].he_title, "");
    assert!(!groups[0].selected, "same key applied under another dimension");
    assert!(groups.iter().all(|n| !n.has_children()));
}

#[test]
fn toc_file_loads_both_entry_shapes() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("toc.json");
    std::fs::write(
        &path,
        r#"[{"category":"Tanakh","heCategory":"תנ״ך","contents":[{"title":"Genesis","heTitle":"בראשית"}]}]"#,
    )
    .unwrap();
    let toc = load_toc(&path).expect("toc");
    assert_eq!(toc[0].names(), ("Tanakh", "תנ״ך"));
    assert_eq!(toc[0].contents()[0], TocEntry::text("Genesis", "בראשית"));
    assert!(load_toc(&tmp.path().join("missing.json")).is_err());
}
