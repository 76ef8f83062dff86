//! Token generation: branch parameters, tags and Call-IDs.
//!
//! `Branch = "z9hG4bK" + rand32`; `Tag = rand10..rand20`;
//! `Call-ID = rand16`. These are kept short and dependency-free (no UUID)
//! because the wire format pins exact prefixes and rough lengths, not a
//! particular random-ID scheme.

use rand::distributions::Alphanumeric;
use rand::Rng;

const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A fresh RFC 3261 §8.1.1.7 branch parameter.
pub fn new_branch() -> String {
    format!("{BRANCH_MAGIC_COOKIE}{}", random_alphanumeric(32))
}

/// A fresh From/To tag, length in `[10, 20)`
pub fn new_tag() -> String {
    let len = rand::thread_rng().gen_range(10..20);
    random_alphanumeric(len)
}

/// A fresh Call-ID, 16 random alphanumeric characters.
pub fn new_call_id() -> String {
    random_alphanumeric(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn branch_carries_the_magic_cookie() {
        let b = new_branch();
        assert!(b.starts_with(BRANCH_MAGIC_COOKIE));
        assert_eq!(b.len(), BRANCH_MAGIC_COOKIE.len() + 32);
    }

    #[test]
    fn tag_length_is_in_range() {
        for _ in 0..50 {
            let t = new_tag();
            assert!(t.len() >= 10 && t.len() < 20, "tag length {} out of range", t.len());
        }
    }

    #[test]
    fn call_ids_do_not_collide_across_many_samples() {
        let mut seen = HashSet::new();
        for _ in 0..100_000 {
            assert!(seen.insert(new_call_id()), "Call-ID collision");
        }
    }
}
