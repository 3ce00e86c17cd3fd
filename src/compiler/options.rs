//! Catalog of the custom options a toolchain offers (the check boxes of the
//! build options dialog).

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompOption {
    pub name: String,
    pub option: String,
    pub linker_option: String,
    pub additional_libs: String,
    pub category: String,
    /// Options that conflict with this one.
    pub check_against: Vec<String>,
    pub check_message: String,
    /// Options this one makes redundant.
    pub supersedes: Vec<String>,
    /// Only one option of an exclusive category may be checked.
    pub exclusive: bool,
    pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    options: Vec<CompOption>,
}

impl CompilerOptions {
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompOption> {
        self.options.iter()
    }

    /// Adds an option; one with the same name and category replaces it.
    pub fn add(&mut self, option: CompOption) {
        match self
            .options
            .iter_mut()
            .find(|o| o.name == option.name && o.category == option.category)
        {
            Some(existing) => *existing = option,
            None => self.options.push(option),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.options.len();
        self.options.retain(|o| o.name != name);
        before != self.options.len()
    }

    pub fn by_name(&self, name: &str) -> Option<&CompOption> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn by_option(&self, option: &str) -> Option<&CompOption> {
        self.options
            .iter()
            .find(|o| !option.is_empty() && (o.option == option || o.linker_option == option))
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut cats: Vec<&str> = Vec::new();
        for o in &self.options {
            if !cats.contains(&o.category.as_str()) {
                cats.push(&o.category);
            }
        }
        cats
    }

    /// Checks or unchecks an option. Checking an option of an exclusive
    /// category unchecks the other options of that category.
    pub fn set_checked(&mut self, name: &str, checked: bool) -> bool {
        let Some(pos) = self.options.iter().position(|o| o.name == name) else {
            return false;
        };
        if checked && self.options[pos].exclusive {
            let category = self.options[pos].category.clone();
            for (i, o) in self.options.iter_mut().enumerate() {
                if i != pos && o.category == category && o.exclusive {
                    o.checked = false;
                }
            }
        }
        self.options[pos].checked = checked;
        true
    }

    /// Names of the currently checked options, in catalog order.
    pub fn checked_names(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| o.checked)
            .map(|o| o.name.clone())
            .collect()
    }

    /// Checked options that conflict with `option` (by its `check_against`).
    pub fn conflicts_for(&self, name: &str) -> Vec<&CompOption> {
        let Some(target) = self.by_name(name) else {
            return Vec::new();
        };
        self.options
            .iter()
            .filter(|o| o.checked && o.name != name)
            .filter(|o| target.check_against.contains(&o.option))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(name: &str, option: &str, category: &str, exclusive: bool) -> CompOption {
        CompOption {
            name: name.into(),
            option: option.into(),
            category: category.into(),
            exclusive,
            ..Default::default()
        }
    }

    #[test]
    fn test_exclusive_category() {
        let mut opts = CompilerOptions::default();
        opts.add(opt("O1", "-O1", "Optimization", true));
        opts.add(opt("O2", "-O2", "Optimization", true));
        opts.add(opt("g", "-g", "Debugging", false));
        opts.set_checked("O1", true);
        opts.set_checked("g", true);
        opts.set_checked("O2", true);
        assert_eq!(opts.checked_names(), vec!["O2", "g"]);
    }

    #[test]
    fn test_add_replaces_same_name_and_category() {
        let mut opts = CompilerOptions::default();
        opts.add(opt("std", "-std=c++11", "General", false));
        opts.add(opt("std", "-std=c++17", "General", false));
        assert_eq!(opts.len(), 1);
        assert_eq!(opts.by_option("-std=c++17").unwrap().name, "std");
    }

    #[test]
    fn test_conflicts() {
        let mut opts = CompilerOptions::default();
        let mut debug = opt("g", "-g", "Debugging", false);
        debug.check_against = vec!["-s".into()];
        opts.add(debug);
        opts.add(opt("strip", "-s", "Linker", false));
        opts.set_checked("strip", true);
        assert_eq!(opts.conflicts_for("g").len(), 1);
    }
}
