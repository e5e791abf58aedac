use model::record::{CategoryAssociation, CategoryNode};
use std::collections::HashMap;
use tracing::warn;

/// Keyword fallback: assigns a category trail straight from the product
/// name when the source has no category association at all.
const KEYWORD_TRAILS: &[(&str, &[&str])] = &[
    ("pressure cooker", &["Kitchen Appliances", "Pressure Cookers"]),
    ("kettle", &["Kitchen Appliances", "Kettles"]),
    ("blender", &["Kitchen Appliances", "Blenders"]),
    ("toaster", &["Kitchen Appliances", "Toasters"]),
    ("cookware", &["Kitchen", "Cookware"]),
    ("pan", &["Kitchen", "Cookware"]),
    ("knife", &["Kitchen", "Cutlery"]),
    ("vacuum", &["Home Appliances", "Vacuum Cleaners"]),
    ("iron", &["Home Appliances", "Irons"]),
];

/// Picks the primary category: an explicit main flag wins; otherwise the
/// shallowest association, tie-broken by lowest sort order then lowest id.
pub fn primary_category(associations: &[CategoryAssociation]) -> Option<&CategoryAssociation> {
    if let Some(main) = associations.iter().find(|a| a.is_main) {
        return Some(main);
    }
    associations.iter().min_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then(a.sort_order.cmp(&b.sort_order))
            .then(a.category_id.cmp(&b.category_id))
    })
}

/// Resolves the full root-to-leaf name path for a category. Broken parent
/// links and cycles terminate the walk instead of looping.
pub fn category_path(tree: &HashMap<u64, CategoryNode>, category_id: u64) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = Some(category_id);
    let mut hops = 0;

    while let Some(id) = current {
        hops += 1;
        if hops > 64 {
            warn!(category_id, "Category parent chain too deep, possible cycle");
            break;
        }
        match tree.get(&id) {
            Some(node) => {
                path.push(node.name.clone());
                current = node.parent_id;
            }
            None => {
                if id != category_id {
                    warn!(category_id, missing = id, "Broken category parent link");
                }
                break;
            }
        }
    }

    path.reverse();
    path
}

/// Fallback trail from name keywords; None when nothing matches.
pub fn keyword_trail(product_name: &str) -> Option<Vec<String>> {
    let lowered = product_name.to_lowercase();
    KEYWORD_TRAILS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, trail)| trail.iter().map(|s| s.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assoc(id: u64, depth: u32, sort: u32, main: bool) -> CategoryAssociation {
        CategoryAssociation {
            category_id: id,
            depth,
            sort_order: sort,
            is_main: main,
        }
    }

    fn node(id: u64, name: &str, parent: Option<u64>, depth: u32) -> (u64, CategoryNode) {
        (
            id,
            CategoryNode {
                id,
                name: name.to_string(),
                parent_id: parent,
                depth,
                sort_order: 0,
            },
        )
    }

    #[test]
    fn main_flag_wins_regardless_of_depth() {
        let assocs = vec![assoc(1, 1, 0, false), assoc(2, 3, 0, true)];
        assert_eq!(primary_category(&assocs).unwrap().category_id, 2);
    }

    #[test]
    fn shallowest_then_sort_then_id() {
        let assocs = vec![
            assoc(9, 2, 5, false),
            assoc(4, 2, 1, false),
            assoc(7, 3, 0, false),
        ];
        assert_eq!(primary_category(&assocs).unwrap().category_id, 4);

        let tied = vec![assoc(9, 2, 1, false), assoc(4, 2, 1, false)];
        assert_eq!(primary_category(&tied).unwrap().category_id, 4);
    }

    #[test]
    fn path_resolves_root_to_leaf() {
        let tree: HashMap<_, _> = [
            node(1, "Kitchen", None, 0),
            node(2, "Appliances", Some(1), 1),
            node(3, "Kettles", Some(2), 2),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            category_path(&tree, 3),
            vec!["Kitchen", "Appliances", "Kettles"]
        );
    }

    #[test]
    fn cycle_terminates() {
        let tree: HashMap<_, _> = [node(1, "A", Some(2), 0), node(2, "B", Some(1), 1)]
            .into_iter()
            .collect();
        let path = category_path(&tree, 1);
        assert!(!path.is_empty());
    }

    #[test]
    fn keyword_fallback() {
        assert_eq!(
            keyword_trail("Rapid Pressure Cooker 6L"),
            Some(vec![
                "Kitchen Appliances".to_string(),
                "Pressure Cookers".to_string()
            ])
        );
        assert_eq!(keyword_trail("Mystery Gadget"), None);
    }
}
