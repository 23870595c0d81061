use std::fmt;

/// Ancestor-style key. A child key shares its parent's path as a prefix, and
/// everything under one root key forms a single entity group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: String,
    pub name: String,
    pub parent: Option<Box<EntityKey>>,
}

impl EntityKey {
    pub fn root(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            parent: None,
        }
    }

    pub fn child(&self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn parent(&self) -> Option<&EntityKey> {
        self.parent.as_deref()
    }

    /// Root of the entity group this key belongs to.
    pub fn group_root(&self) -> &EntityKey {
        match &self.parent {
            Some(parent) => parent.group_root(),
            None => self,
        }
    }

    /// Full path, e.g. `Member:u1/Enrollment:picnic-2024`.
    pub fn path(&self) -> String {
        let segment = format!("{}:{}", self.kind, escape(&self.name));
        match &self.parent {
            Some(parent) => format!("{}/{}", parent.path(), segment),
            None => segment,
        }
    }

    /// Path of the parent, or the empty string for root keys.
    pub fn ancestor_path(&self) -> String {
        self.parent().map(EntityKey::path).unwrap_or_default()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// Keeps `/` and `:` inside names from colliding with path separators.
fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}
