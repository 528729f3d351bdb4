/// Supply of compiler-generated variable names.
///
/// Generated names start with `%`, which no surface binder can contain, so
/// they never capture or shadow user variables.
#[derive(Debug, Clone)]
pub struct NameSupply {
    prefix: &'static str,
    next: usize,
}

impl NameSupply {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 0 }
    }

    pub fn fresh(&mut self) -> String {
        let name = format!("%{}{}", self.prefix, self.next);
        self.next += 1;
        name
    }

    pub fn fresh_n(&mut self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.fresh()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::NameSupply;

    #[test]
    fn names_are_distinct_and_prefixed() {
        let mut names = NameSupply::new("a");
        assert_eq!(names.fresh(), "%a0");
        assert_eq!(names.fresh_n(2), vec!["%a1", "%a2"]);
    }
}
