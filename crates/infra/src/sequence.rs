//! Serialized allocation of sequential human-readable codes.

use std::sync::Mutex;

use mostrador_core::{DomainError, DomainResult};

/// Allocator for sequential codes (sale, ticket, return, credit note).
///
/// Allocation holds the internal lock for the whole read-increment, so two
/// concurrent callers can never receive the same code. Codes handed out for
/// operations that later fail are not reused; the numbering is
/// gap-tolerant.
#[derive(Debug)]
pub struct SequenceAllocator {
    next: Mutex<u64>,
}

impl SequenceAllocator {
    pub fn starting_at(base: u64) -> Self {
        Self {
            next: Mutex::new(base),
        }
    }

    pub fn next(&self) -> DomainResult<u64> {
        let mut next = self
            .next
            .lock()
            .map_err(|_| DomainError::conflict("sequence lock poisoned"))?;
        let code = *next;
        *next += 1;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn codes_start_at_the_base_and_increase() {
        let seq = SequenceAllocator::starting_at(1000);
        assert_eq!(seq.next().unwrap(), 1000);
        assert_eq!(seq.next().unwrap(), 1001);
        assert_eq!(seq.next().unwrap(), 1002);
    }

    #[test]
    fn concurrent_allocators_never_share_a_code() {
        let seq = Arc::new(SequenceAllocator::starting_at(1));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let seq = seq.clone();
            handles.push(std::thread::spawn(move || {
                (0..100).map(|_| seq.next().unwrap()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for code in handle.join().unwrap() {
                assert!(seen.insert(code), "code {code} allocated twice");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
