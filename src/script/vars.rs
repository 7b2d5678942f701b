//! Per-script variable store. Addresses split into a base name and an
//! index path; missing dynamic nodes appear on first touch, declared
//! static arrays bound-check their indexes.

use super::value::{VarParam, DYNAMIC_ARRAY};
use super::ScriptError;
use crate::database::entities::script_vars::{self, VarType};
use crate::database::DbResult;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;

/// Sentinel index recording a static array's declared size when saved
const ARRAY_SIZE_KEY: &str = "ARRAYSIZE";
/// Prefix marking a saved value as a serialized array blob
const ARRAY_BLOB_PREFIX: &str = "TWX_ARRAY:";

#[derive(Default)]
pub struct VarStore {
    /// Roots keyed by lowercased base name
    vars: HashMap<String, VarParam>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn root(&mut self, base: &str) -> &mut VarParam {
        self.vars
            .entry(base.to_ascii_lowercase())
            .or_insert_with(|| VarParam::new(base))
    }

    /// Reads the leaf value at the address, auto-vivifying dynamic
    /// nodes
    pub fn get(&mut self, base: &str, indexes: &[String]) -> Result<String, ScriptError> {
        let node = self.root(base).descend_mut(indexes)?;
        Ok(node.value.clone())
    }

    /// Writes the leaf value at the address
    pub fn set(&mut self, base: &str, indexes: &[String], value: &str) -> Result<(), ScriptError> {
        let node = self.root(base).descend_mut(indexes)?;
        node.value = value.to_string();
        Ok(())
    }

    /// Declares a static array, replacing any previous contents
    pub fn declare_array(&mut self, base: &str, dims: &[i64]) {
        let root = self.root(base);
        root.declare(dims);
    }

    /// Drops every element of an array keeping the variable itself
    pub fn clear_array(&mut self, base: &str, indexes: &[String]) -> Result<(), ScriptError> {
        let node = self.root(base).descend_mut(indexes)?;
        node.children.clear();
        node.array_size = DYNAMIC_ARRAY;
        node.value.clear();
        Ok(())
    }

    /// Number of elements held at the address
    pub fn element_count(&mut self, base: &str, indexes: &[String]) -> Result<usize, ScriptError> {
        let node = self.root(base).descend_mut(indexes)?;
        Ok(node.children.len())
    }

    /// The root node of every variable currently held
    pub fn roots(&self) -> impl Iterator<Item = &VarParam> {
        self.vars.values()
    }

    /// Installs a prebuilt root node, used when restoring persisted
    /// script state
    pub fn install_root(&mut self, root: VarParam) {
        self.vars.insert(root.name.to_ascii_lowercase(), root);
    }

    /// Saves the variable into the global store. Scalars write one
    /// row; arrays write one row per leaf under its full bracket path
    /// plus a blob marker row for the root.
    pub async fn save(&mut self, db: &DatabaseConnection, base: &str) -> DbResult<()> {
        let root = self.root(base).clone();
        let name = base.to_ascii_lowercase();

        script_vars::Model::delete(db, &name).await?;

        if !root.is_array() {
            let var_type = if root.value.trim().parse::<f64>().is_ok() {
                VarType::Number
            } else {
                VarType::String
            };
            script_vars::Model::set(db, name, root.value, var_type).await?;
            return Ok(());
        }

        script_vars::Model::set(
            db,
            name.clone(),
            format!("{ARRAY_BLOB_PREFIX}{}", root.children.len()),
            VarType::Array,
        )
        .await?;

        if root.array_size >= 0 {
            script_vars::Model::set(
                db,
                format!("{name}[{ARRAY_SIZE_KEY}]"),
                root.array_size.to_string(),
                VarType::Number,
            )
            .await?;
        }

        let mut stack: Vec<(String, &VarParam)> = root
            .children
            .iter()
            .map(|(index, child)| (format!("{name}[{index}]"), child))
            .collect();
        while let Some((path, node)) = stack.pop() {
            if !node.value.is_empty() {
                script_vars::Model::set(db, path.clone(), node.value.clone(), VarType::String)
                    .await?;
            }
            for (index, child) in &node.children {
                stack.push((format!("{path}[{index}]"), child));
            }
        }
        Ok(())
    }

    /// Restores a variable previously saved with [`Self::save`]
    pub async fn load(&mut self, db: &DatabaseConnection, base: &str) -> DbResult<()> {
        let name = base.to_ascii_lowercase();
        let rows = script_vars::Model::get_tree(db, &name).await?;

        let mut root = VarParam::new(base);
        for row in rows {
            if row.name == name {
                if !row.value.starts_with(ARRAY_BLOB_PREFIX) {
                    root.value = row.value;
                }
                continue;
            }
            let Some(indexes) = parse_index_path(&row.name, &name) else {
                continue;
            };
            if indexes.last().map(String::as_str) == Some(ARRAY_SIZE_KEY) {
                root.array_size = row.value.parse().unwrap_or(DYNAMIC_ARRAY);
                continue;
            }
            if let Ok(node) = root.descend_mut(&indexes) {
                node.value = row.value;
            }
        }

        self.vars.insert(name, root);
        Ok(())
    }
}

/// Splits `name[a][b]` into its index path
fn parse_index_path(full: &str, base: &str) -> Option<Vec<String>> {
    let rest = full.strip_prefix(base)?;
    let mut indexes = Vec::new();
    let mut remaining = rest;
    while !remaining.is_empty() {
        let inner = remaining.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].to_string());
        remaining = &inner[close + 1..];
    }
    Some(indexes)
}

#[cfg(test)]
mod test {
    use super::VarStore;
    use crate::database::connect_in_memory;

    #[test]
    fn test_nested_write_read() {
        let mut store = VarStore::new();
        store
            .set("a", &["1".to_string(), "2".to_string()], "deep")
            .unwrap();
        assert_eq!(
            store.get("a", &["1".to_string(), "2".to_string()]).unwrap(),
            "deep"
        );
        // Dynamic arrays hand back an empty leaf for missing indexes
        assert_eq!(
            store.get("a", &["9".to_string(), "9".to_string()]).unwrap(),
            ""
        );
    }

    #[test]
    fn test_names_case_insensitive() {
        let mut store = VarStore::new();
        store.set("Counter", &[], "5").unwrap();
        assert_eq!(store.get("COUNTER", &[]).unwrap(), "5");
    }

    #[test]
    fn test_static_array_bounds() {
        let mut store = VarStore::new();
        store.declare_array("route", &[4]);
        store.set("route", &["4".to_string()], "end").unwrap();
        assert!(store.set("route", &["5".to_string()], "x").is_err());
    }

    #[tokio::test]
    async fn test_scalar_save_load_round_trip() {
        let db = connect_in_memory().await.unwrap();
        let mut store = VarStore::new();
        store.set("credits", &[], "10000").unwrap();
        store.save(&db, "credits").await.unwrap();

        let mut fresh = VarStore::new();
        fresh.load(&db, "credits").await.unwrap();
        assert_eq!(fresh.get("credits", &[]).unwrap(), "10000");
    }

    #[tokio::test]
    async fn test_array_save_load_round_trip() {
        let db = connect_in_memory().await.unwrap();
        let mut store = VarStore::new();
        store.declare_array("grid", &[2]);
        store.set("grid", &["1".to_string()], "one").unwrap();
        store
            .set("grid", &["2".to_string(), "1".to_string()], "nested")
            .unwrap();
        store.save(&db, "grid").await.unwrap();

        let mut fresh = VarStore::new();
        fresh.load(&db, "grid").await.unwrap();
        assert_eq!(fresh.get("grid", &["1".to_string()]).unwrap(), "one");
        assert_eq!(
            fresh
                .get("grid", &["2".to_string(), "1".to_string()])
                .unwrap(),
            "nested"
        );
        // Declared size survives the round trip
        assert!(fresh.set("grid", &["3".to_string()], "x").is_err());
    }
}
