//! Key universe shared by the populate and sample phases

use std::ops::Range;

use crate::error::{HarnessError, HarnessResult};

/// Keys `0..size`, each addressed as `{prefix}/{key}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    size: u64,
    prefix: String,
}

impl Keyspace {
    pub fn new(size: u64, prefix: impl Into<String>) -> HarnessResult<Self> {
        if size == 0 {
            return Err(HarnessError::Setup("keyspace must hold at least one key".to_string()));
        }

        let prefix: String = prefix.into();
        Ok(Self {
            size,
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Every key exactly once, in order
    pub fn keys(&self) -> Range<u64> {
        0..self.size
    }

    /// Request path for `key`
    pub fn path(&self, key: u64) -> String {
        format!("{}/{}", self.prefix, key)
    }

    /// Uniform draw from `0..size`
    pub fn random_key(&self, rng: &mut fastrand::Rng) -> u64 {
        rng.u64(0..self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let keyspace = Keyspace::new(3, "/cache/").unwrap();
        let paths: Vec<String> = keyspace.keys().map(|key| keyspace.path(key)).collect();
        assert_eq!(paths, vec!["/cache/0", "/cache/1", "/cache/2"]);
    }

    #[test]
    fn test_random_keys_stay_in_range() {
        let keyspace = Keyspace::new(10, "/cache").unwrap();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..1_000 {
            assert!(keyspace.random_key(&mut rng) < 10);
        }
    }

    #[test]
    fn test_empty_keyspace_rejected() {
        assert!(matches!(
            Keyspace::new(0, "/cache"),
            Err(HarnessError::Setup(_))
        ));
    }
}
