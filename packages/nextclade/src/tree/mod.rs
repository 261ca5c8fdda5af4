use crate::alphabet::letter::Letter;
use crate::alphabet::nuc::Nuc;
use crate::analyze::mutations::NucleotideSubstitution;
use crate::utils::range::Range;
use eyre::{Report, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arena index into [`Tree`]'s node vector.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, Default)]
pub struct TreeNode {
  pub id: NodeId,
  pub name: String,
  pub parent: Option<NodeId>,
  pub children: Vec<NodeId>,
  pub clade: Option<String>,
  pub depth: usize,
  /// Mutations on the branch leading to this node from its parent: `position -> letter`.
  pub branch_mutations: BTreeMap<usize, Nuc>,
  /// Cumulative `position -> letter` genotype relative to the reference, populated by [`Tree::preprocess`].
  /// A position absent from this map means the node carries the reference letter there.
  pub mutations: BTreeMap<usize, Nuc>,
}

impl Default for NodeId {
  fn default() -> Self {
    Self(0)
  }
}

/// An n-ary phylogenetic tree stored as a flat arena, indexed by [`NodeId`].
#[derive(Clone, Debug, Default)]
pub struct Tree {
  nodes: Vec<TreeNode>,
  root: NodeId,
}

impl Tree {
  #[must_use]
  pub fn node(&self, id: NodeId) -> &TreeNode {
    &self.nodes[id.0 as usize]
  }

  #[must_use]
  pub fn root(&self) -> NodeId {
    self.root
  }

  #[must_use]
  pub fn nodes(&self) -> &[TreeNode] {
    &self.nodes
  }

  /// Depth-first from the root, accumulating each node's cumulative `position -> letter` genotype map from
  /// its parent's map plus its own branch mutations. Called once, right after construction.
  pub fn preprocess(&mut self) {
    fn visit(nodes: &mut [TreeNode], id: NodeId, parent_mutations: &BTreeMap<usize, Nuc>, depth: usize) {
      let mut mutations = parent_mutations.clone();
      for (&pos, &letter) in &nodes[id.0 as usize].branch_mutations {
        mutations.insert(pos, letter);
      }
      nodes[id.0 as usize].mutations = mutations.clone();
      nodes[id.0 as usize].depth = depth;
      let children = nodes[id.0 as usize].children.clone();
      for child in children {
        visit(nodes, child, &mutations, depth + 1);
      }
    }
    let root = self.root;
    visit(&mut self.nodes, root, &BTreeMap::new(), 0);
  }

  /// Builds the arena from an Auspice-JSON-shaped tree: a possibly-wrapped `{ "tree": { name, node_attrs:
  /// { clade_membership: { value } }, branch_attrs: { mutations: { nuc: [...] } }, children } }` nested
  /// structure.
  pub fn from_auspice_json(value: &serde_json::Value) -> Result<Self, Report> {
    let root_value = value.get("tree").unwrap_or(value);
    let root_json: AuspiceNodeJson = serde_json::from_value(root_value.clone()).wrap_err("When parsing Auspice tree JSON")?;

    let mut nodes = Vec::new();
    fn build(nodes: &mut Vec<TreeNode>, parent: Option<NodeId>, json: AuspiceNodeJson) -> NodeId {
      let id = NodeId(nodes.len() as u32);
      let branch_mutations = json
        .branch_attrs
        .mutations
        .nuc
        .iter()
        .filter_map(|m| parse_nuc_mutation(m))
        .collect();
      nodes.push(TreeNode {
        id,
        name: json.name,
        parent,
        children: Vec::new(),
        clade: json.node_attrs.clade_membership.and_then(|c| c.value),
        depth: 0,
        branch_mutations,
        mutations: BTreeMap::new(),
      });
      let child_ids: Vec<NodeId> = json.children.into_iter().map(|c| build(nodes, Some(id), c)).collect();
      nodes[id.0 as usize].children = child_ids;
      id
    }
    let root = build(&mut nodes, None, root_json);

    let mut tree = Self { nodes, root };
    tree.preprocess();
    Ok(tree)
  }
}

/// Appends a `"attachedQueries"` node attribute (Auspice's `{ "value": ... }` convention) to every node of
/// an Auspice tree JSON whose `name` is a key of `attachments`, passing everything else through unchanged.
/// Matches nodes by name rather than by re-walking in [`Tree::from_auspice_json`]'s construction order,
/// since Auspice node names are expected to be unique and this way the JSON structure never has to agree
/// with the arena's internal `NodeId` numbering.
pub fn annotate_auspice_json(value: &mut serde_json::Value, attachments: &std::collections::BTreeMap<String, Vec<String>>) {
  fn visit(node: &mut serde_json::Value, attachments: &std::collections::BTreeMap<String, Vec<String>>) {
    let name = node.get("name").and_then(|n| n.as_str()).map(str::to_owned);
    if let Some(queries) = name.as_deref().and_then(|name| attachments.get(name)) {
      let node_attrs = node
        .as_object_mut()
        .map(|obj| obj.entry("node_attrs").or_insert_with(|| serde_json::json!({})));
      if let Some(node_attrs) = node_attrs {
        if let Some(obj) = node_attrs.as_object_mut() {
          obj.insert("attachedQueries".to_owned(), serde_json::json!({ "value": queries }));
        }
      }
    }
    if let Some(children) = node.get_mut("children").and_then(|c| c.as_array_mut()) {
      for child in children {
        visit(child, attachments);
      }
    }
  }

  if let Some(root) = value.get_mut("tree") {
    visit(root, attachments);
  } else {
    visit(value, attachments);
  }
}

#[derive(Deserialize)]
struct AuspiceNodeJson {
  name: String,
  #[serde(default)]
  node_attrs: AuspiceNodeAttrs,
  #[serde(default)]
  branch_attrs: AuspiceBranchAttrs,
  #[serde(default)]
  children: Vec<AuspiceNodeJson>,
}

#[derive(Deserialize, Default)]
struct AuspiceNodeAttrs {
  clade_membership: Option<AuspiceCladeMembership>,
}

#[derive(Deserialize, Default)]
struct AuspiceCladeMembership {
  value: Option<String>,
}

#[derive(Deserialize, Default)]
struct AuspiceBranchAttrs {
  #[serde(default)]
  mutations: AuspiceMutations,
}

#[derive(Deserialize, Default)]
struct AuspiceMutations {
  #[serde(default)]
  nuc: Vec<String>,
}

/// Parses one Auspice-style nucleotide mutation label, e.g. `"A23403G"` (ref letter, 1-based position, alt
/// letter), into a 0-based `(position, letter)` pair.
fn parse_nuc_mutation(label: &str) -> Option<(usize, Nuc)> {
  let bytes = label.as_bytes();
  if bytes.len() < 3 {
    return None;
  }
  let alt = *bytes.last()?;
  let pos_1based: usize = label[1..label.len() - 1].parse().ok()?;
  if pos_1based == 0 {
    return None;
  }
  Some((pos_1based - 1, Nuc::from_char(alt as char)))
}

/// The outcome of matching one query against the preprocessed tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CladeAssignment {
  pub nearest_node_id: NodeId,
  pub clade: Option<String>,
  pub private_mutations: Vec<NucleotideSubstitution>,
}

fn is_missing_at(pos: usize, missing_ranges: &[Range]) -> bool {
  missing_ranges.iter().any(|r| r.contains(pos))
}

/// Symmetric-difference distance between a node's cumulative genotype and the query's observed genotype,
/// skipping positions the query hasn't observed.
fn distance(node_mutations: &BTreeMap<usize, Nuc>, query_mutations: &BTreeMap<usize, Nuc>, missing_ranges: &[Range]) -> usize {
  let mut positions: Vec<usize> = node_mutations.keys().chain(query_mutations.keys()).copied().collect();
  positions.sort_unstable();
  positions.dedup();

  positions
    .into_iter()
    .filter(|&pos| !is_missing_at(pos, missing_ranges))
    .filter(|pos| node_mutations.get(pos) != query_mutations.get(pos))
    .count()
}

/// Attaches a query (given as its substitutions and missing ranges relative to the reference) to the
/// nearest node of the preprocessed tree. Ties broken by: minimum distance, then deepest node, then
/// smallest node id.
#[must_use]
pub fn assign_clade(tree: &Tree, substitutions: &[NucleotideSubstitution], missing_ranges: &[Range]) -> CladeAssignment {
  let query_mutations: BTreeMap<usize, Nuc> = substitutions.iter().map(|s| (s.pos, s.qry)).collect();

  let mut best: Option<(usize, usize, NodeId)> = None; // (distance, depth, id) -- depth compared inverted below
  for node in tree.nodes() {
    let d = distance(&node.mutations, &query_mutations, missing_ranges);
    let candidate = (d, node.depth, node.id);
    best = Some(match best {
      None => candidate,
      Some((best_d, best_depth, best_id)) => {
        if d < best_d
          || (d == best_d && node.depth > best_depth)
          || (d == best_d && node.depth == best_depth && node.id.0 < best_id.0)
        {
          candidate
        } else {
          (best_d, best_depth, best_id)
        }
      },
    });
  }

  let (_, _, nearest_node_id) = best.unwrap_or((0, 0, tree.root()));
  let nearest_node = tree.node(nearest_node_id);

  let private_mutations = substitutions
    .iter()
    .filter(|s| nearest_node.mutations.get(&s.pos) != Some(&s.qry))
    .cloned()
    .collect();

  CladeAssignment {
    nearest_node_id,
    clade: nearest_node.clade.clone(),
    private_mutations,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::nuc::Nuc;

  fn make_substitution(pos: usize, reff: Nuc, qry: Nuc) -> NucleotideSubstitution {
    NucleotideSubstitution { pos, reff, qry }
  }

  fn test_tree() -> Tree {
    // root (clade "A") -- child1 (clade "A.1", mutation pos5:T) -- grandchild (clade "A.1.1", mutation pos9:C)
    //                   -- child2 (clade "B", mutation pos5:G)
        let json = serde_json::json!({
      "name": "root",
      "node_attrs": { "clade_membership": { "value": "A" } },
      "branch_attrs": { "mutations": { "nuc": [] } },
      "children": [
        {
          "name": "child1",
          "node_attrs": { "clade_membership": { "value": "A.1" } },
          "branch_attrs": { "mutations": { "nuc": ["A6T"] } },
          "children": [
            {
              "name": "grandchild",
              "node_attrs": { "clade_membership": { "value": "A.1.1" } },
              "branch_attrs": { "mutations": { "nuc": ["A10C"] } },
              "children": []
            }
          ]
        },
        {
          "name": "child2",
          "node_attrs": { "clade_membership": { "value": "B" } },
          "branch_attrs": { "mutations": { "nuc": ["A6G"] } },
          "children": []
        }
      ]
    });
    Tree::from_auspice_json(&json).unwrap()
  }

  #[test]
  fn preprocess_accumulates_mutations_down_the_tree() {
    let tree = test_tree();
    let grandchild = tree.nodes().iter().find(|n| n.name == "grandchild").unwrap();
    assert_eq!(grandchild.mutations.get(&5), Some(&Nuc::T));
    assert_eq!(grandchild.mutations.get(&9), Some(&Nuc::C));
  }

  #[test]
  fn assigns_to_exact_matching_node() {
    let tree = test_tree();
    // Query matches child2's genotype exactly (position 5 -> G, 1-based label "A6G" -> pos 5 0-based).
    let subs = vec![make_substitution(5, Nuc::A, Nuc::G)];
    let assignment = assign_clade(&tree, &subs, &[]);
    assert_eq!(assignment.clade.as_deref(), Some("B"));
    assert!(assignment.private_mutations.is_empty());
  }

  #[test]
  fn private_mutations_are_not_on_the_matched_path() {
    let tree = test_tree();
    let subs = vec![make_substitution(5, Nuc::A, Nuc::G), make_substitution(20, Nuc::A, Nuc::T)];
    let assignment = assign_clade(&tree, &subs, &[]);
    assert_eq!(assignment.clade.as_deref(), Some("B"));
    assert_eq!(assignment.private_mutations, vec![make_substitution(20, Nuc::A, Nuc::T)]);
  }

  #[test]
  fn missing_positions_are_excluded_from_distance() {
    let tree = test_tree();
    // The query would match "A.1.1" except position 9 is masked as missing, so it should not count against
    // the root/child1 path which lacks that mutation.
    let subs = vec![make_substitution(5, Nuc::A, Nuc::T)];
    let missing = vec![Range::new(9, 11)];
    let assignment = assign_clade(&tree, &subs, &missing);
    assert_eq!(assignment.clade.as_deref(), Some("A.1.1"));
  }
}
