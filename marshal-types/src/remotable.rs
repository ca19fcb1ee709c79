//! C2: the remotable registry and constructor.
//!
//! The source keys a process-wide weak map from host object to interface tag. Rust has no
//! native weak map over arbitrary keys, so per SPEC_FULL.md §9 "Weak association" this port
//! instead has the wrapper type ([`RemotableObject`]) own its tag field directly, and uses a
//! thread-local registry (the core is single-threaded, SPEC_FULL.md §5) keyed by the
//! `Rc` allocation's address purely to detect re-registration of the same target.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::RegistryError;

/// A host object wrapped as a remote-style value.
///
/// A `Target` exposes only named operations: Rust's trait-object model (methods, no public
/// fields) mirrors the source's "all enumerable own properties are operations" requirement
/// structurally, so there is no separate runtime field scan to perform.
pub trait Target: fmt::Debug {
    /// Names of the operations this target exposes. Used only to detect the forbidden
    /// iteration-continuation operation (`"then"`) that would make this object a thenable
    /// rather than a legal remote (SPEC_FULL.md §4.1 step 7).
    fn operations(&self) -> &[&'static str] {
        &[]
    }
}

const REMOTABLE_IFACE: &str = "Remotable";
const ALLEGED_PREFIX: &str = "Alleged: ";
const FORBIDDEN_THEN: &str = "then";

fn validate_interface_tag(iface: &str) -> Result<(), RegistryError> {
    if iface == REMOTABLE_IFACE || iface.starts_with(ALLEGED_PREFIX) {
        Ok(())
    } else {
        Err(RegistryError::InvalidInterfaceTag(iface.to_string()))
    }
}

thread_local! {
    static REGISTRY: RefCell<HashMap<usize, (Weak<dyn Target>, String)>> =
        RefCell::new(HashMap::new());
}

fn target_key(target: &Rc<dyn Target>) -> usize {
    Rc::as_ptr(target) as *const () as usize
}

/// A remote-style object reachable only by capability handle, never copied.
///
/// Construct via [`RemotableObject::new`] or the [`RemotableObject::far`] convenience
/// wrapper; both register the target in the process-wide registry before returning, so by
/// the time a caller holds an `Rc<RemotableObject>` it is already known-valid (C1's classifier
/// can therefore treat `Value::Remote` as infallible — see DESIGN.md).
#[derive(Debug)]
pub struct RemotableObject {
    iface: String,
    target: Rc<dyn Target>,
}

impl RemotableObject {
    /// `Remotable(iface, target)`. Fails if the tag is malformed or `target` is already
    /// registered under a live registration.
    pub fn new(iface: impl Into<String>, target: Rc<dyn Target>) -> Result<Rc<Self>, RegistryError> {
        let iface = iface.into();
        validate_interface_tag(&iface)?;
        if target.operations().contains(&FORBIDDEN_THEN) {
            // Caught here rather than in the classifier: a thenable is rejected at the
            // point where its shape is known, before it can be wrapped as a remote at all.
            return Err(RegistryError::InvalidInterfaceTag(format!(
                "target exposes forbidden operation {FORBIDDEN_THEN:?}; thenables cannot be registered as remotables"
            )));
        }
        let key = target_key(&target);
        REGISTRY.with(|registry| -> Result<(), RegistryError> {
            let mut registry = registry.borrow_mut();
            if let Some((weak, existing_iface)) = registry.get(&key) {
                if weak.upgrade().is_some() {
                    return Err(RegistryError::AlreadyRegistered(existing_iface.clone()));
                }
            }
            registry.insert(key, (Rc::downgrade(&target), iface.clone()));
            Ok(())
        })?;
        Ok(Rc::new(RemotableObject { iface, target }))
    }

    /// `Far(farName, target)`: shorthand for `Remotable("Alleged: " + farName, target)`.
    pub fn far(far_name: impl AsRef<str>, target: Rc<dyn Target>) -> Result<Rc<Self>, RegistryError> {
        Self::new(format!("{ALLEGED_PREFIX}{}", far_name.as_ref()), target)
    }

    /// The registered interface tag.
    pub fn interface(&self) -> &str {
        &self.iface
    }

    /// The wrapped target.
    pub fn target(&self) -> &Rc<dyn Target> {
        &self.target
    }
}

/// A placeholder for a not-yet-available value.
///
/// Futures are not remotables: they carry no interface tag and are not registered (the
/// classifier's "is a future/placeholder" check, SPEC_FULL.md §4.1 step 6, is structural —
/// it is simply a distinct `Value` case — not a registry lookup).
#[derive(Debug)]
pub struct FutureObject {
    label: Option<String>,
}

impl FutureObject {
    /// Constructs a new, distinct future placeholder. `label` is purely diagnostic.
    pub fn new(label: Option<String>) -> Rc<Self> {
        Rc::new(FutureObject { label })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Echo;
    impl Target for Echo {}

    #[derive(Debug)]
    struct Thenable;
    impl Target for Thenable {
        fn operations(&self) -> &[&'static str] {
            &["then"]
        }
    }

    #[test]
    fn accepts_default_iface() {
        let r = RemotableObject::new("Remotable", Rc::new(Echo)).unwrap();
        assert_eq!(r.interface(), "Remotable");
    }

    #[test]
    fn accepts_alleged_prefix() {
        let r = RemotableObject::far("Carol", Rc::new(Echo)).unwrap();
        assert_eq!(r.interface(), "Alleged: Carol");
    }

    #[test]
    fn rejects_invalid_iface() {
        let err = RemotableObject::new("Bogus", Rc::new(Echo)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInterfaceTag(_)));
    }

    #[test]
    fn rejects_thenable_target() {
        let err = RemotableObject::new("Remotable", Rc::new(Thenable)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInterfaceTag(_)));
    }

    #[test]
    fn rejects_double_registration_of_same_target() {
        let target: Rc<dyn Target> = Rc::new(Echo);
        let _first = RemotableObject::new("Remotable", target.clone()).unwrap();
        let err = RemotableObject::new("Remotable", target).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
    }

    #[test]
    fn registering_an_unrelated_target_after_the_first_is_dropped_succeeds() {
        {
            let target: Rc<dyn Target> = Rc::new(Echo);
            let first = RemotableObject::new("Remotable", target).unwrap();
            drop(first);
        }
        // A fresh, unrelated target is a different allocation and registers cleanly; the
        // registry's weak entry for the dropped target does not keep it, or this slot,
        // alive (the "weak association" requirement in SPEC_FULL.md §9).
        let other: Rc<dyn Target> = Rc::new(Echo);
        let second = RemotableObject::new("Remotable", other).unwrap();
        assert_eq!(second.interface(), "Remotable");
    }
}
