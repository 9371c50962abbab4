//! Output identifier allocation.

use indexmap::{IndexMap, IndexSet};

/// Naming policy of a target language.
pub trait IdentGen: Send + Sync {
    /// Candidate output names for `name`, best first.
    fn preferred(&self, name: &str) -> Vec<String>;

    /// Pool of short names handed out when no preferred name is free.
    fn short(&self) -> Vec<String>;

    /// The `index`-th fallback name.
    fn general(&self, index: usize) -> String;
}

/// Single letters: the name's initial (either case), then `a..z`, `A..Z`,
/// then `v0`, `v1`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdentGen;

impl IdentGen for DefaultIdentGen {
    fn preferred(&self, name: &str) -> Vec<String> {
        let Some(first) = name.chars().next() else {
            return Vec::new();
        };
        let swapped = if first.is_lowercase() {
            first.to_uppercase().collect::<String>()
        } else {
            first.to_lowercase().collect::<String>()
        };
        vec![first.to_string(), swapped]
    }

    fn short(&self) -> Vec<String> {
        ('a'..='z').chain('A'..='Z').map(String::from).collect()
    }

    fn general(&self, index: usize) -> String {
        format!("v{index}")
    }
}

/// Map every name in `names` to a distinct output name.
///
/// Allocation is greedy and first-fit in three rounds: each name's preferred
/// candidates, then the shared short pool, then `general(i)` for increasing
/// `i`. Earlier names win conflicts. The result covers every input name.
pub fn allocate<'n>(
    names: impl IntoIterator<Item = &'n str>,
    policy: &dyn IdentGen,
) -> IndexMap<String, String> {
    let names: IndexSet<&str> = names.into_iter().collect();
    let mut claimed: IndexSet<String> = IndexSet::new();
    let mut map: IndexMap<String, String> = IndexMap::new();

    for &name in &names {
        if let Some(out) = policy
            .preferred(name)
            .into_iter()
            .find(|c| !claimed.contains(c))
        {
            claimed.insert(out.clone());
            map.insert(name.to_string(), out);
        }
    }

    let short = policy.short();
    for &name in &names {
        if map.contains_key(name) {
            continue;
        }
        if let Some(out) = short.iter().find(|c| !claimed.contains(*c)) {
            claimed.insert(out.clone());
            map.insert(name.to_string(), out.clone());
        }
    }

    let mut index = 0;
    for &name in &names {
        if map.contains_key(name) {
            continue;
        }
        let out = loop {
            let candidate = policy.general(index);
            index += 1;
            if !claimed.contains(&candidate) {
                break candidate;
            }
        };
        claimed.insert(out.clone());
        map.insert(name.to_string(), out);
    }

    // Present the map in input order regardless of which round filled it.
    names
        .iter()
        .filter_map(|&n| map.get(n).map(|out| (n.to_string(), out.clone())))
        .collect()
}
