use crate::id::{LinkId, NodeId, ObjectKey};
use indexmap::IndexSet;
use slint::{Model, VecModel};

/// Anything that can be selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selectable<K> {
    Node(NodeId<K>),
    Link(LinkId<K>),
}

/// Set of selected nodes and links, in selection order.
///
/// Every mutation that actually changes the set raises a change flag that
/// [`has_selection_changed`](Self::has_selection_changed) reports exactly once.
pub struct SelectionManager<K> {
    selected: IndexSet<Selectable<K>>,
    changed: bool,
    revision: u64,
}

impl<K> Default for SelectionManager<K> {
    fn default() -> Self {
        Self {
            selected: IndexSet::new(),
            changed: false,
            revision: 0,
        }
    }
}

impl<K: ObjectKey> SelectionManager<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.changed = true;
        self.revision += 1;
    }

    /// Select `item`. Without `append` the previous selection is dropped first.
    pub fn select(&mut self, item: Selectable<K>, append: bool) {
        if !append {
            if self.selected.len() == 1 && self.selected.contains(&item) {
                return;
            }
            self.selected.clear();
            self.selected.insert(item);
            self.touch();
        } else if self.selected.insert(item) {
            self.touch();
        }
    }

    /// Handle a click on an item based on interaction modifiers: a plain click
    /// makes it the only selected item, an additive click toggles it.
    pub fn handle_interaction(&mut self, item: Selectable<K>, additive: bool) {
        if additive {
            if !self.selected.shift_remove(&item) {
                self.selected.insert(item);
            }
            self.touch();
        } else {
            self.select(item, false);
        }
    }

    pub fn deselect(&mut self, item: &Selectable<K>) -> bool {
        let removed = self.selected.shift_remove(item);
        if removed {
            self.touch();
        }
        removed
    }

    /// Clear the current selection
    pub fn clear(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.touch();
        }
    }

    /// Replace the current selection with a new set of items
    ///
    /// Used when a rubber band selection completes.
    pub fn replace_selection<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Selectable<K>>,
    {
        let next: IndexSet<Selectable<K>> = items.into_iter().collect();
        if next != self.selected {
            self.selected = next;
            self.touch();
        }
    }

    /// Add all `items` to the selection.
    pub fn extend<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Selectable<K>>,
    {
        let before = self.selected.len();
        self.selected.extend(items);
        if self.selected.len() != before {
            self.touch();
        }
    }

    /// Drop every item for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&Selectable<K>) -> bool) {
        let before = self.selected.len();
        self.selected.retain(|item| keep(item));
        if self.selected.len() != before {
            self.touch();
        }
    }

    /// Check if an item is selected
    pub fn contains(&self, item: &Selectable<K>) -> bool {
        self.selected.contains(item)
    }

    pub fn contains_node(&self, id: &NodeId<K>) -> bool {
        self.selected.contains(&Selectable::Node(id.clone()))
    }

    pub fn contains_link(&self, id: &LinkId<K>) -> bool {
        self.selected.contains(&Selectable::Link(id.clone()))
    }

    /// Iterate over the selection in selection order.
    pub fn iter(&self) -> impl Iterator<Item = &Selectable<K>> + '_ {
        self.selected.iter()
    }

    pub fn selected_nodes(&self) -> Vec<NodeId<K>> {
        self.selected
            .iter()
            .filter_map(|item| match item {
                Selectable::Node(id) => Some(id.clone()),
                Selectable::Link(_) => None,
            })
            .collect()
    }

    pub fn selected_links(&self) -> Vec<LinkId<K>> {
        self.selected
            .iter()
            .filter_map(|item| match item {
                Selectable::Link(id) => Some(id.clone()),
                Selectable::Node(_) => None,
            })
            .collect()
    }

    /// Edge-triggered: true once after each change, false until the next one.
    pub fn has_selection_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Monotonic counter bumped by every change; used for save coalescing.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mirror the selected node ids into a Slint `VecModel`.
    pub fn sync_nodes_to_model(&self, model: &VecModel<NodeId<K>>) {
        // Clear and repopulate to ensure exact match
        while model.row_count() > 0 {
            model.remove(0);
        }
        for id in self.selected_nodes() {
            model.push(id);
        }
    }

    /// Get the number of selected items
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Check if the selection is empty
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
