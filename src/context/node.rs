//! Context tree nodes.

use crate::config::LogConfig;
use crate::logging::{BaseLevels, LevelOverrides, Logger, Profile, Sink};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// Settings shared by every node below a root.
#[derive(Debug)]
pub struct Settings {
    base: BaseLevels,
    profile: Profile,
    sink: Arc<dyn Sink>,
}

impl Settings {
    pub fn new(base: BaseLevels, profile: Profile, sink: Arc<dyn Sink>) -> Self {
        Self {
            base,
            profile,
            sink,
        }
    }

    pub fn from_config(config: &LogConfig, sink: Arc<dyn Sink>) -> Self {
        Self::new(config.base.clone(), config.profile, sink)
    }

    pub fn base(&self) -> &BaseLevels {
        &self.base
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn sink(&self) -> &dyn Sink {
        self.sink.as_ref()
    }
}

/// One label in a causal trail.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CausalEntry {
    pub label: String,
    /// Chained entries are visible on their own node but not inherited by
    /// children.
    pub chained_from: bool,
}

/// Options applied when forking a node.
#[derive(Debug, Clone, Default)]
pub struct ForkOptions {
    label: Option<String>,
    chained_from: bool,
    facility: Option<String>,
    levels: Option<LevelOverrides>,
    properties: HashMap<String, Value>,
}

impl ForkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Causal label appended to the inherited trail.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Keep this node's label out of its children's trails.
    pub fn chained(mut self) -> Self {
        self.chained_from = true;
        self
    }

    /// Facility of the logger bound to the new node.
    pub fn facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    pub fn levels(mut self, levels: LevelOverrides) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub(crate) fn overrides(&self) -> Option<&LevelOverrides> {
        self.levels.as_ref()
    }
}

struct ContextInner {
    id: Uuid,
    name: String,
    parent: Option<Context>,
    settings: Arc<Settings>,
    facility: Option<String>,
    overrides: Option<Arc<LevelOverrides>>,
    causal: Vec<CausalEntry>,
    properties: HashMap<String, Value>,
}

/// A node in the execution context tree.
///
/// Nodes are immutable once created; [`Context::fork`] builds a child without
/// touching the parent. Children keep their parent alive, so a trail is
/// always walkable back to the root. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strand::context::{Context, ForkOptions, Settings};
/// use strand::logging::{BaseLevels, MemorySink, Profile};
///
/// let settings = Settings::new(BaseLevels::default(), Profile::Development, Arc::new(MemorySink::new()));
/// let root = Context::root("service", settings);
///
/// let request = root.fork("request", ForkOptions::new().label("GET /orders").property("user", 7));
/// let query = request.fork("query", ForkOptions::new().label("load orders"));
///
/// assert_eq!(query.causal_labels(), vec!["GET /orders", "load orders"]);
/// assert_eq!(query.get("user"), Some(&serde_json::json!(7)));
/// assert!(root.get("user").is_none());
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("causal", &self.causal_labels())
            .finish()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", "  ".repeat(self.depth()), self.inner.name)
    }
}

impl Context {
    /// Create a root node. The root's name is also its logging facility.
    pub fn root(name: impl Into<String>, settings: Settings) -> Context {
        let name = name.into();
        Context {
            inner: Arc::new(ContextInner {
                id: Uuid::new_v4(),
                facility: Some(name.clone()),
                name,
                parent: None,
                settings: Arc::new(settings),
                overrides: None,
                causal: Vec::new(),
                properties: HashMap::new(),
            }),
        }
    }

    /// Build a child node. Pure: the parent is not modified and nothing is
    /// logged.
    pub fn fork(&self, name: impl Into<String>, options: ForkOptions) -> Context {
        let mut causal: Vec<CausalEntry> = self
            .inner
            .causal
            .iter()
            .filter(|entry| !entry.chained_from)
            .cloned()
            .collect();
        if let Some(label) = options.label {
            causal.push(CausalEntry {
                label,
                chained_from: options.chained_from,
            });
        }

        Context {
            inner: Arc::new(ContextInner {
                id: Uuid::new_v4(),
                name: name.into(),
                parent: Some(self.clone()),
                settings: Arc::clone(&self.inner.settings),
                facility: options.facility,
                overrides: options.levels.map(Arc::new),
                causal,
                properties: options.properties,
            }),
        }
    }

    /// Look `key` up here, then in each ancestor. First match wins.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.ancestry()
            .find_map(|node| node.inner.properties.get(key))
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Context> {
        self.inner.parent.as_ref()
    }

    /// Number of ancestors; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.ancestry().count() - 1
    }

    pub fn causal(&self) -> &[CausalEntry] {
        &self.inner.causal
    }

    pub fn causal_labels(&self) -> Vec<String> {
        self.inner.causal.iter().map(|e| e.label.clone()).collect()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Facility of the nearest node that binds one.
    pub fn facility(&self) -> &str {
        self.ancestry()
            .find_map(|node| node.inner.facility.as_deref())
            .unwrap_or(crate::logging::DEFAULT_FACILITY)
    }

    /// Logger bound to this node, for its inherited facility.
    pub fn logger(&self) -> Logger {
        Logger::bind(self.facility().to_string(), self.clone())
    }

    /// Override maps on the path from the root to this node, outermost first.
    pub fn override_layers(&self) -> Vec<Arc<LevelOverrides>> {
        let mut layers: Vec<_> = self
            .ancestry()
            .filter_map(|node| node.inner.overrides.clone())
            .collect();
        layers.reverse();
        layers
    }

    fn ancestry(&self) -> Ancestry<'_> {
        Ancestry { next: Some(self) }
    }
}

struct Ancestry<'a> {
    next: Option<&'a Context>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a Context;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.inner.parent.as_ref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemorySink};
    use serde_json::json;

    fn root() -> Context {
        Context::root(
            "root",
            Settings::new(
                BaseLevels::default(),
                Profile::Development,
                Arc::new(MemorySink::new()),
            ),
        )
    }

    #[test]
    fn fork_appends_label_once() {
        let root = root();
        let child = root.fork("a", ForkOptions::new().label("first"));
        let grandchild = child.fork("b", ForkOptions::new().label("second"));

        assert!(root.causal().is_empty());
        assert_eq!(child.causal_labels(), vec!["first"]);
        assert_eq!(grandchild.causal_labels(), vec!["first", "second"]);
    }

    #[test]
    fn fork_without_label_inherits_trail_unchanged() {
        let child = root().fork("a", ForkOptions::new().label("first"));
        let plain = child.fork("plain", ForkOptions::new());
        assert_eq!(plain.causal_labels(), vec!["first"]);
    }

    #[test]
    fn chained_labels_are_not_inherited() {
        let root = root();
        let hook = root.fork("hook", ForkOptions::new().label("onEntry").chained());
        let nested = hook.fork("nested", ForkOptions::new().label("inner"));

        assert_eq!(hook.causal_labels(), vec!["onEntry"]);
        assert_eq!(nested.causal_labels(), vec!["inner"]);
    }

    #[test]
    fn get_walks_to_nearest_definition() {
        let root = root();
        let outer = root.fork("outer", ForkOptions::new().property("k", "outer"));
        let inner = outer.fork("inner", ForkOptions::new().property("k", "inner"));
        let leaf = inner.fork("leaf", ForkOptions::new());

        assert_eq!(leaf.get("k"), Some(&json!("inner")));
        assert_eq!(outer.get("k"), Some(&json!("outer")));
        assert_eq!(leaf.get("missing"), None);
    }

    #[test]
    fn fork_does_not_mutate_parent() {
        let root = root();
        let _child = root.fork(
            "child",
            ForkOptions::new()
                .label("x")
                .facility("db")
                .property("p", 1)
                .levels(LevelOverrides::new().set("db", Level::Debug)),
        );

        assert!(root.causal().is_empty());
        assert!(root.get("p").is_none());
        assert_eq!(root.facility(), "root");
        assert!(root.override_layers().is_empty());
    }

    #[test]
    fn facility_and_layers_are_inherited() {
        let root = root();
        let outer = root.fork(
            "outer",
            ForkOptions::new()
                .facility("db")
                .levels(LevelOverrides::new().set("db", Level::Info)),
        );
        let inner = outer.fork(
            "inner",
            ForkOptions::new().levels(LevelOverrides::new().set("db", Level::Trace)),
        );

        assert_eq!(inner.facility(), "db");
        let layers = inner.override_layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].get("db"), Some(Level::Info));
        assert_eq!(layers[1].get("db"), Some(Level::Trace));
    }

    #[test]
    fn depth_counts_ancestors() {
        let root = root();
        let a = root.fork("a", ForkOptions::new());
        let b = a.fork("b", ForkOptions::new());
        assert_eq!(root.depth(), 0);
        assert_eq!(b.depth(), 2);
        assert_eq!(b.parent(), Some(&a));
    }
}
