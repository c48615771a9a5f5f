use std::{
    any::Any,
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    rc::Rc,
};

/// Named objects stored alongside a mesh,
/// e.g. flux fields looked up by interpolation schemes
/// and cached gradients.
///
/// Objects are shared as `Rc`s so lookups hand out clones
/// and never hold a borrow of the registry.
#[derive(Default)]
pub struct ObjectRegistry {
    objects: RefCell<HashMap<String, Rc<dyn Any>>>,
    cached: RefCell<HashSet<String>>,
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.objects.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("ObjectRegistry")
            .field("objects", &names)
            .field("cached", &self.cached.borrow())
            .finish()
    }
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object under a name, replacing any previous one.
    /// Returns the replaced object.
    pub fn store<T: Any>(&self, name: impl Into<String>, object: Rc<T>) -> Option<Rc<dyn Any>> {
        self.objects.borrow_mut().insert(name.into(), object)
    }

    /// Whether an object of type `T` is stored under the name.
    pub fn found_object<T: Any>(&self, name: &str) -> bool {
        self.objects
            .borrow()
            .get(name)
            .is_some_and(|obj| obj.is::<T>())
    }

    /// The object of type `T` stored under the name, if any.
    pub fn lookup_object<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        let obj = self.objects.borrow().get(name).cloned()?;
        obj.downcast::<T>().ok()
    }

    /// Remove an object. Returns whether there was one.
    pub fn check_out(&self, name: &str) -> bool {
        self.objects.borrow_mut().remove(name).is_some()
    }

    /// Names of all stored objects, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether objects with this name should be kept after computing them.
    pub fn cache(&self, name: &str) -> bool {
        self.cached.borrow().contains(name)
    }

    /// Turn caching of a name on or off.
    pub fn set_cached(&self, name: &str, on: bool) {
        let mut cached = self.cached.borrow_mut();
        if on {
            cached.insert(name.to_string());
        } else {
            cached.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_lookup() {
        let reg = ObjectRegistry::new();
        assert!(reg.store("phi", Rc::new(vec![1.0f64, 2.0])).is_none());
        assert!(reg.found_object::<Vec<f64>>("phi"));
        assert!(!reg.found_object::<Vec<f32>>("phi"));
        assert!(!reg.found_object::<Vec<f64>>("psi"));

        let phi = reg.lookup_object::<Vec<f64>>("phi").unwrap();
        assert_eq!(*phi, vec![1.0, 2.0]);
        assert!(reg.lookup_object::<String>("phi").is_none());

        assert!(reg.store("phi", Rc::new(0usize)).is_some());
        // the earlier handle stays valid after replacement
        assert_eq!(phi.len(), 2);
        assert_eq!(reg.names(), vec!["phi".to_string()]);

        assert!(reg.check_out("phi"));
        assert!(!reg.check_out("phi"));
    }

    #[test]
    fn cache_flags() {
        let reg = ObjectRegistry::new();
        assert!(!reg.cache("grad(p)"));
        reg.set_cached("grad(p)", true);
        assert!(reg.cache("grad(p)"));
        reg.set_cached("grad(p)", false);
        assert!(!reg.cache("grad(p)"));
    }
}
