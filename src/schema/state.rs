/// Named game state: numeric variables and boolean switches.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A key-value store the interpreter reads and writes by name.
///
/// Names resolve to an index once; reads and writes go through the index,
/// matching how host engines keep their switch and variable arrays.
pub trait Namespace<T: Copy> {
    /// Index of a registered name, or `None` if the name is unknown.
    fn lookup(&self, name: &str) -> Option<usize>;
    fn get(&self, index: usize) -> Option<T>;
    /// Returns `false` if `index` is out of range.
    fn set(&mut self, index: usize, value: T) -> bool;
}

/// In-memory namespace: a name index over a dense value array.
#[derive(Debug, Clone, Default)]
pub struct StateTable<T> {
    names: Vec<String>,
    values: Vec<T>,
    index: FxHashMap<String, usize>,
}

impl<T: Copy> StateTable<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Register a name with its initial value. Re-registering a name
    /// overwrites its value and keeps its index.
    pub fn register(&mut self, name: &str, value: T) -> usize {
        if let Some(&existing) = self.index.get(name) {
            self.values[existing] = value;
            return existing;
        }
        let idx = self.values.len();
        self.names.push(name.to_string());
        self.values.push(value);
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Convenience read by name.
    pub fn value(&self, name: &str) -> Option<T> {
        self.index.get(name).map(|&idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names and values in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, T)> + '_ {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.as_str(), *value))
    }
}

impl<T: Copy> Namespace<T> for StateTable<T> {
    fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    fn set(&mut self, index: usize, value: T) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Both namespaces, typically loaded from a RON state file.
#[derive(Debug, Clone, Default)]
pub struct StateTables {
    pub variables: StateTable<f64>,
    pub switches: StateTable<bool>,
}

// The RON shape keeps names sorted so table indexes are stable across loads.
#[derive(Debug, Default, Deserialize, Serialize)]
struct RonState {
    #[serde(default)]
    variables: BTreeMap<String, f64>,
    #[serde(default)]
    switches: BTreeMap<String, bool>,
}

impl StateTables {
    pub fn load_from_ron(path: &Path) -> Result<StateTables, crate::core::error::ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<StateTables, crate::core::error::ScriptError> {
        let raw: RonState = ron::from_str(input)?;
        let mut tables = StateTables::default();
        for (name, value) in raw.variables {
            tables.variables.register(&name, value);
        }
        for (name, value) in raw.switches {
            tables.switches.register(&name, value);
        }
        Ok(tables)
    }

    /// Serialize the current values back into the RON state shape.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        let raw = RonState {
            variables: self
                .variables
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            switches: self
                .switches
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        };
        ron::ser::to_string_pretty(&raw, ron::ser::PrettyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut table = StateTable::new();
        let gold = table.register("v_gold", 15.0);
        assert_eq!(table.lookup("v_gold"), Some(gold));
        assert_eq!(table.get(gold), Some(15.0));
        assert_eq!(table.lookup("v_missing"), None);
    }

    #[test]
    fn reregister_keeps_index() {
        let mut table = StateTable::new();
        let first = table.register("s_door", false);
        let second = table.register("s_door", true);
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value("s_door"), Some(true));
    }

    #[test]
    fn set_out_of_range_fails() {
        let mut table: StateTable<f64> = StateTable::new();
        assert!(!table.set(3, 1.0));
    }

    #[test]
    fn parse_state_ron() {
        let tables = StateTables::parse_ron(
            r#"(
                variables: { "v_gold": 15, "v_day": 1.5 },
                switches: { "s_met_king": true },
            )"#,
        )
        .unwrap();
        assert_eq!(tables.variables.value("v_gold"), Some(15.0));
        assert_eq!(tables.variables.value("v_day"), Some(1.5));
        assert_eq!(tables.switches.value("s_met_king"), Some(true));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let tables = StateTables::parse_ron("(switches: { \"s_a\": false })").unwrap();
        assert!(tables.variables.is_empty());
        assert_eq!(tables.switches.len(), 1);
    }

    #[test]
    fn to_ron_reloads() {
        let mut tables = StateTables::default();
        tables.variables.register("v_gold", 3.0);
        tables.switches.register("s_open", true);
        let text = tables.to_ron().unwrap();
        let back = StateTables::parse_ron(&text).unwrap();
        assert_eq!(back.variables.value("v_gold"), Some(3.0));
        assert_eq!(back.switches.value("s_open"), Some(true));
    }
}
