use std::collections::BTreeMap;

/// Hands out names like "Road_1", "Road_2", "Node_1", with one counter per prefix.
#[derive(Clone, Debug, Default)]
pub struct NameAllocator {
    counters: BTreeMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> NameAllocator {
        NameAllocator::default()
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{}_{}", prefix, counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_counters() {
        let mut names = NameAllocator::new();
        assert_eq!(names.next("Road"), "Road_1");
        assert_eq!(names.next("Road"), "Road_2");
        assert_eq!(names.next("Node"), "Node_1");
        assert_eq!(names.next("Road"), "Road_3");
    }
}
