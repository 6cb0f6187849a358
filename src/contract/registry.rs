//! Process-wide descriptor cache.
//!
//! Entries are append-only and keyed by the contract's `TypeId`. The first
//! caller for a type derives and validates its descriptor while holding the
//! map shard's write lock, so concurrent first use computes it exactly once.
//! Failed derivations are not cached.

use dashmap::DashMap;
use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use crate::contract::descriptor::InterfaceDescriptor;
use crate::contract::validation::validate_contract;
use crate::contract::ApiContract;
use crate::error::ApiError;

fn registry() -> &'static DashMap<TypeId, Arc<InterfaceDescriptor>> {
    static REGISTRY: OnceLock<DashMap<TypeId, Arc<InterfaceDescriptor>>> = OnceLock::new();
    REGISTRY.get_or_init(DashMap::new)
}

/// Resolve the descriptor for `C`, deriving it on first use.
pub fn describe<C: ApiContract>() -> Result<Arc<InterfaceDescriptor>, ApiError> {
    let key = TypeId::of::<C>();
    if let Some(hit) = registry().get(&key) {
        return Ok(Arc::clone(hit.value()));
    }

    let entry = registry().entry(key).or_try_insert_with(|| {
        let name = C::name();
        let base_address = C::base_address();
        let methods = C::methods();
        validate_contract(name, base_address, &methods)?;

        tracing::debug!(contract = name, methods = methods.len(), "Contract descriptor built");
        Ok::<_, ApiError>(Arc::new(InterfaceDescriptor::new(name, base_address, methods)))
    })?;

    Ok(Arc::clone(entry.value()))
}

/// Number of cached descriptors.
pub fn cached_contracts() -> usize {
    registry().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::descriptor::{MethodDescriptor, ReturnShape};
    use crate::proxy::Proxy;
    use reqwest::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DERIVATIONS: AtomicUsize = AtomicUsize::new(0);

    struct Counted {
        proxy: Proxy,
    }

    impl ApiContract for Counted {
        fn name() -> &'static str {
            "Counted"
        }

        fn methods() -> Vec<MethodDescriptor> {
            DERIVATIONS.fetch_add(1, Ordering::SeqCst);
            vec![MethodDescriptor::new("home", Method::GET, "/", ReturnShape::Pending)]
        }

        fn bind(proxy: Proxy) -> Self {
            Self { proxy }
        }

        fn proxy(&self) -> &Proxy {
            &self.proxy
        }
    }

    struct Broken {
        proxy: Proxy,
    }

    impl ApiContract for Broken {
        fn name() -> &'static str {
            "Broken"
        }

        fn methods() -> Vec<MethodDescriptor> {
            Vec::new()
        }

        fn bind(proxy: Proxy) -> Self {
            Self { proxy }
        }

        fn proxy(&self) -> &Proxy {
            &self.proxy
        }
    }

    #[test]
    fn concurrent_first_use_derives_once() {
        let handles: Vec<_> = (0..16)
            .map(|_| std::thread::spawn(|| describe::<Counted>().unwrap()))
            .collect();
        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(DERIVATIONS.load(Ordering::SeqCst), 1);
        for d in &descriptors[1..] {
            assert!(Arc::ptr_eq(&descriptors[0], d));
        }
    }

    #[test]
    fn invalid_contract_is_not_cached() {
        assert!(describe::<Broken>().is_err());
        assert!(registry().get(&TypeId::of::<Broken>()).is_none());
        assert!(describe::<Broken>().is_err());
    }
}
