use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BuildError;

/// Decode capsule: one already-located JSON element in, one output value out.
pub(crate) type DecodeFn<O> = Arc<dyn Fn(&Value) -> Result<O, serde_json::Error> + Send + Sync>;

/// One registered target type: its identity plus the capsule that decodes
/// an element into it.
pub(crate) struct TypeDescriptor<O> {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) decode: DecodeFn<O>,
}

impl<O> TypeDescriptor<O> {
    pub(crate) fn new<T: 'static>(decode: DecodeFn<O>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode,
        }
    }
}

impl<O> fmt::Debug for TypeDescriptor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Discriminator value -> descriptor map. Mutable only while the builder
/// owns it; frozen once the parser takes over.
pub(crate) struct Registry<O> {
    entries: HashMap<String, TypeDescriptor<O>>,
    fold_case: bool,
}

impl<O> Registry<O> {
    pub(crate) fn new(fold_case: bool) -> Self {
        Self {
            entries: HashMap::new(),
            fold_case,
        }
    }

    fn fold(&self, value: &str) -> String {
        if self.fold_case {
            value.to_ascii_lowercase()
        } else {
            value.to_owned()
        }
    }

    pub(crate) fn insert(
        &mut self,
        value: String,
        descriptor: TypeDescriptor<O>,
    ) -> Result<(), BuildError> {
        if value.is_empty() {
            return Err(BuildError::InvalidDiscriminatorValue);
        }
        let key = self.fold(&value);
        if self.entries.contains_key(&key) {
            return Err(BuildError::DuplicateDiscriminator(value));
        }
        self.entries.insert(key, descriptor);
        Ok(())
    }

    pub(crate) fn resolve(&self, value: &str) -> Option<&TypeDescriptor<O>> {
        if self.fold_case {
            self.entries.get(&value.to_ascii_lowercase())
        } else {
            self.entries.get(value)
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<O> fmt::Debug for Registry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("values", &self.entries.keys().collect::<Vec<_>>())
            .field("fold_case", &self.fold_case)
            .finish()
    }
}
