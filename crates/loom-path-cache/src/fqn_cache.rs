use std::collections::{BTreeMap, VecDeque};

/// One segment of a qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FqnNode<T> {
    name: String,
    fqn: String,
    value: Option<T>,
    children: BTreeMap<String, FqnNode<T>>,
}

impl<T> FqnNode<T> {
    fn new(name: String, fqn: String) -> Self {
        Self {
            name,
            fqn,
            value: None,
            children: BTreeMap::new(),
        }
    }

    /// Simple name of this segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name up to and including this segment.
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn children(&self) -> impl Iterator<Item = &FqnNode<T>> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&FqnNode<T>> {
        self.children.get(name)
    }

    pub(crate) fn value_mut_or_default(&mut self) -> &mut T
    where
        T: Default,
    {
        self.value.get_or_insert_with(T::default)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Visits this node and its descendants depth-first, pre-order. Returning `false` from
    /// `visitor` stops the walk.
    pub fn visit_depth_first(&self, visitor: &mut impl FnMut(&FqnNode<T>) -> bool) -> bool {
        if !visitor(self) {
            return false;
        }
        for child in self.children.values() {
            if !child.visit_depth_first(&mut *visitor) {
                return false;
            }
        }
        true
    }
}

/// Trie of dotted qualified names, each name optionally carrying a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FqnCache<T> {
    root: FqnNode<T>,
}

impl<T> Default for FqnCache<T> {
    fn default() -> Self {
        Self {
            root: FqnNode::new(String::new(), String::new()),
        }
    }
}

impl<T> FqnCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &FqnNode<T> {
        &self.root
    }

    /// Stores `value` under `fqn`, creating intermediate namespace nodes. Returns the previous
    /// value.
    pub fn add(&mut self, fqn: &str, value: T) -> Option<T> {
        self.entry(fqn).value.replace(value)
    }

    /// Node for `fqn`, created with no value if missing.
    pub fn entry(&mut self, fqn: &str) -> &mut FqnNode<T> {
        let mut node = &mut self.root;
        for segment in loom_core::name::segments(fqn) {
            let child_fqn = loom_core::name::join(&node.fqn, segment);
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| FqnNode::new(segment.to_string(), child_fqn));
        }
        node
    }

    /// Removes `fqn` and every name nested below it. Namespace nodes left without values or
    /// children are pruned.
    pub fn remove(&mut self, fqn: &str) -> bool {
        let segments: Vec<&str> = loom_core::name::segments(fqn).collect();
        if segments.is_empty() {
            return false;
        }
        Self::remove_below(&mut self.root, &segments)
    }

    fn remove_below(node: &mut FqnNode<T>, segments: &[&str]) -> bool {
        let Some((first, rest)) = segments.split_first() else {
            return false;
        };
        if rest.is_empty() {
            return node.children.remove(*first).is_some();
        }
        let Some(child) = node.children.get_mut(*first) else {
            return false;
        };
        let removed = Self::remove_below(child, rest);
        if removed && child.value.is_none() && child.children.is_empty() {
            node.children.remove(*first);
        }
        removed
    }

    /// Drops the value stored under `fqn` while keeping nested names. Empty nodes are pruned.
    pub fn take(&mut self, fqn: &str) -> Option<T> {
        let segments: Vec<&str> = loom_core::name::segments(fqn).collect();
        let value = {
            let mut node = &mut self.root;
            for segment in &segments {
                node = node.children.get_mut(*segment)?;
            }
            node.value.take()
        };
        if value.is_some() && self.get_node(fqn).is_some_and(FqnNode::is_leaf) {
            self.remove(fqn);
        }
        value
    }

    pub fn get(&self, fqn: &str) -> Option<&T> {
        self.get_node(fqn)?.value.as_ref()
    }

    pub fn get_mut(&mut self, fqn: &str) -> Option<&mut T> {
        let mut node = &mut self.root;
        for segment in loom_core::name::segments(fqn) {
            node = node.children.get_mut(segment)?;
        }
        node.value.as_mut()
    }

    pub fn get_node(&self, fqn: &str) -> Option<&FqnNode<T>> {
        let mut node = &self.root;
        for segment in loom_core::name::segments(fqn) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Whether a value is stored under `fqn`.
    pub fn contains(&self, fqn: &str) -> bool {
        self.get(fqn).is_some()
    }

    /// All names carrying a value, in depth-first order.
    pub fn fqns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit_depth_first(|node| {
            if node.value.is_some() {
                out.push(node.fqn.clone());
            }
            true
        });
        out
    }

    pub fn visit_depth_first(&self, mut visitor: impl FnMut(&FqnNode<T>) -> bool) {
        self.root.visit_depth_first(&mut visitor);
    }

    pub fn visit_breadth_first(&self, mut visitor: impl FnMut(&FqnNode<T>) -> bool) {
        let mut queue = VecDeque::from([&self.root]);
        while let Some(node) = queue.pop_front() {
            if !visitor(node) {
                return;
            }
            queue.extend(node.children.values());
        }
    }

    pub fn clear(&mut self) {
        self.root.children.clear();
        self.root.value = None;
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(names: &[&str]) -> FqnCache<usize> {
        let mut cache = FqnCache::new();
        for (idx, name) in names.iter().enumerate() {
            cache.add(name, idx);
        }
        cache
    }

    #[test]
    fn removing_a_namespace_cascades() {
        let mut cache = cache(&["a.b.C", "a.b.c.D", "a.E"]);
        assert!(cache.remove("a.b"));

        assert!(!cache.contains("a.b.C"));
        assert!(cache.get_node("a.b.c").is_none());
        assert_eq!(cache.fqns(), vec!["a.E"]);
        assert!(!cache.remove("a.b"));
    }

    #[test]
    fn removing_the_last_name_prunes_empty_namespaces() {
        let mut cache = cache(&["x.y.Z"]);
        assert!(cache.remove("x.y.Z"));
        assert!(cache.is_empty());
    }

    #[test]
    fn take_keeps_nested_names() {
        let mut cache = cache(&["a.B", "a.B.Inner"]);
        assert_eq!(cache.take("a.B"), Some(0));
        assert!(!cache.contains("a.B"));
        assert!(cache.contains("a.B.Inner"));
        assert_eq!(cache.take("a.B"), None);
    }

    #[test]
    fn nodes_know_their_qualified_names() {
        let cache = cache(&["com.example.Foo"]);
        let node = cache.get_node("com.example").unwrap();
        assert_eq!(node.name(), "example");
        assert_eq!(node.fqn(), "com.example");
        assert!(!node.is_leaf());
        assert!(node.value().is_none());
        assert!(cache.get_node("com.example.Foo").unwrap().is_leaf());
    }

    #[test]
    fn traversal_orders() {
        let cache = cache(&["a.b.C", "a.D"]);
        let mut depth = Vec::new();
        cache.visit_depth_first(|node| {
            depth.push(node.fqn().to_string());
            true
        });
        assert_eq!(depth, vec!["", "a", "a.D", "a.b", "a.b.C"]);

        let mut breadth = Vec::new();
        cache.visit_breadth_first(|node| {
            breadth.push(node.fqn().to_string());
            node.fqn() != "a.D"
        });
        assert_eq!(breadth, vec!["", "a", "a.D"]);
    }
}
