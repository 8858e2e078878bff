use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Label {
    pub addr: u32,
    /// `false` while the label is only forward-declared.
    pub valid: bool,
    pub global: bool,
}

/// Outcome of [`Labels::define`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defined {
    New,
    /// Filled in an earlier `.globl` stub.
    Completed,
    /// The name already had an address.
    Redefined(u32),
}

/// Label table in definition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Labels {
    labels: IndexMap<String, Label>,
}

impl Labels {
    pub fn new() -> Self {
        Labels {
            labels: IndexMap::new(),
        }
    }

    /// Binds `name` to `addr`. A redefinition leaves the table untouched.
    pub fn define(&mut self, name: &str, addr: u32) -> Defined {
        match self.labels.get_mut(name) {
            Some(label) if label.valid => Defined::Redefined(label.addr),
            Some(label) => {
                label.addr = addr;
                label.valid = true;
                Defined::Completed
            }
            None => {
                self.labels.insert(
                    name.to_string(),
                    Label {
                        addr,
                        valid: true,
                        global: false,
                    },
                );
                Defined::New
            }
        }
    }

    /// `.globl`: export an existing label or leave an invalid stub.
    pub fn declare_global(&mut self, name: &str) {
        self.labels
            .entry(name.to_string())
            .and_modify(|label| label.global = true)
            .or_insert(Label {
                addr: 0,
                valid: false,
                global: true,
            });
    }

    /// `.extern`: valid and global at once.
    pub fn define_extern(&mut self, name: &str, addr: u32) -> Defined {
        let defined = self.define(name, addr);
        if let Some(label) = self.labels.get_mut(name) {
            label.global = true;
        }
        defined
    }

    /// Moves a defined label, used when data alignment shifts the value it names.
    pub fn rebind(&mut self, name: &str, addr: u32) {
        if let Some(label) = self.labels.get_mut(name) {
            label.addr = addr;
        }
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    /// Address of a defined label.
    pub fn get_val(&self, name: &str) -> Option<u32> {
        self.labels
            .get(name)
            .filter(|label| label.valid)
            .map(|label| label.addr)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Label)> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
