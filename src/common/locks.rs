// src/common/locks.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

// Registro de locks por chave (cliente da carteira, código de cupom).
//
// O modelo de execução é um único processo: serializar aqui o
// ler-verificar-gravar de resgate e débito é suficiente para fechar a
// corrida sem depender de lock de linha no banco. O mutex externo (std)
// protege só o mapa e nunca atravessa um await; o mutex interno (tokio)
// é o que cada operação segura durante o I/O.
#[derive(Clone, Default)]
pub struct LockRegistry<K: Eq + Hash + Clone> {
    inner: Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<K: Eq + Hash + Clone> LockRegistry<K> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn lock_for(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("lock registry envenenado");
        map.entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mesma_chave_devolve_o_mesmo_lock() {
        let registry: LockRegistry<String> = LockRegistry::new();
        let a = registry.lock_for(&"abc".to_string());
        let b = registry.lock_for(&"abc".to_string());
        assert!(Arc::ptr_eq(&a, &b));

        let c = registry.lock_for(&"outro".to_string());
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn lock_serializa_secoes_criticas() {
        let registry: LockRegistry<u32> = LockRegistry::new();
        let counter = Arc::new(Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let lock = registry.lock_for(&1);
                let _guard = lock.lock().await;
                let value = *counter.lock().unwrap();
                tokio::task::yield_now().await;
                *counter.lock().unwrap() = value + 1;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*counter.lock().unwrap(), 16);
    }
}
