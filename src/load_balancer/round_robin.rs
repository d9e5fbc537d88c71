//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Round-robin selector.
/// Stores an internal counter to rotate through backends.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next healthy backend in rotation order.
    ///
    /// Every candidate costs one cursor advance, and at most `backends.len()`
    /// candidates are tried, so each backend is looked at no more than once
    /// per call. Returns `None` only if every backend tried was unhealthy.
    pub fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let len = backends.len();
        for _ in 0..len {
            // Wraps on overflow; only the value modulo `len` matters.
            let index = self.counter.fetch_add(1, Ordering::Relaxed) % len;
            let backend = &backends[index];
            if backend.is_healthy() {
                return Some(backend.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::HealthThresholds;
    use std::collections::HashMap;

    fn backends(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| Arc::new(Backend::new(format!("127.0.0.1:{}", 5300 + i))))
            .collect()
    }

    fn mark_unhealthy(backend: &Backend) {
        backend.record_health_check(false, &HealthThresholds::new(1, 1));
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let pool = backends(2);

        let s1 = lb.next_server(&pool).unwrap();
        assert_eq!(s1.address(), pool[0].address());

        let s2 = lb.next_server(&pool).unwrap();
        assert_eq!(s2.address(), pool[1].address());

        let s3 = lb.next_server(&pool).unwrap();
        assert_eq!(s3.address(), pool[0].address());
    }

    #[test]
    fn test_skips_unhealthy_in_order() {
        let lb = RoundRobin::new();
        let pool = backends(5);
        mark_unhealthy(&pool[1]);
        mark_unhealthy(&pool[2]);
        mark_unhealthy(&pool[4]);

        let picked: Vec<String> = (0..6)
            .map(|_| lb.next_server(&pool).unwrap().address().to_string())
            .collect();
        let expected: Vec<String> = [0, 3, 0, 3, 0, 3]
            .iter()
            .map(|&i| pool[i].address().to_string())
            .collect();
        assert_eq!(picked, expected);
    }

    #[test]
    fn test_none_iff_all_unhealthy() {
        let lb = RoundRobin::new();
        let pool = backends(3);
        for b in &pool {
            mark_unhealthy(b);
        }
        assert!(lb.next_server(&pool).is_none());

        pool[2].record_health_check(true, &HealthThresholds::new(1, 1));
        for _ in 0..5 {
            let s = lb.next_server(&pool).unwrap();
            assert_eq!(s.address(), pool[2].address());
        }
    }

    #[test]
    fn test_empty_pool() {
        let lb = RoundRobin::new();
        assert!(lb.next_server(&[]).is_none());
    }

    #[test]
    fn test_wraparound_is_harmless() {
        let lb = RoundRobin {
            counter: AtomicUsize::new(usize::MAX),
        };
        let pool = backends(3);
        for _ in 0..10 {
            assert!(lb.next_server(&pool).is_some());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distribution_is_even() {
        let lb = Arc::new(RoundRobin::new());
        let pool = Arc::new(backends(4));
        mark_unhealthy(&pool[1]);

        let mut tasks = Vec::new();
        for _ in 0..30 {
            let lb = lb.clone();
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                let mut picked = Vec::with_capacity(300);
                for _ in 0..300 {
                    let b = lb.next_server(&pool).unwrap();
                    assert!(b.is_healthy());
                    picked.push(b.address().to_string());
                }
                picked
            }));
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for task in tasks {
            for addr in task.await.unwrap() {
                *counts.entry(addr).or_default() += 1;
            }
        }

        assert!(!counts.contains_key(pool[1].address()));
        assert_eq!(counts.len(), 3);
        let expected = 9000.0 / 3.0;
        for (addr, count) in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.1, "{} got {} picks", addr, count);
        }
    }
}
