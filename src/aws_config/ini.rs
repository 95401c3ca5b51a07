// Ordered INI document for ~/.aws/config and ~/.aws/credentials
//
// Sections, keys and comment lines this tool does not manage are kept so the
// whole file can be rewritten without losing anything. Blank lines are
// normalized to a single separator between sections.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Pair { key: String, value: String },
    /// Comments, indented sub-settings and anything else kept verbatim
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Pair { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Update a key in place or append it
    pub fn set(&mut self, key: &str, value: &str) {
        for entry in self.entries.iter_mut() {
            if let Entry::Pair { key: k, value: v } = entry {
                if k == key {
                    *v = value.to_string();
                    return;
                }
            }
        }
        self.entries.push(Entry::Pair {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn remove(&mut self, key: &str) {
        self.entries
            .retain(|entry| !matches!(entry, Entry::Pair { key: k, .. } if k == key));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    /// Lines before the first section header
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn parse(content: &str) -> Self {
        let mut doc = IniDocument::default();

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim();
                doc.sections.push(Section::new(name));
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                doc.preamble.push(line.trim_end().to_string());
                continue;
            };

            let is_comment = trimmed.starts_with('#') || trimmed.starts_with(';');
            let is_nested = line.starts_with(char::is_whitespace);
            match trimmed.find('=') {
                Some(eq_pos) if !is_comment && !is_nested => {
                    section.entries.push(Entry::Pair {
                        key: trimmed[..eq_pos].trim().to_string(),
                        value: trimmed[eq_pos + 1..].trim().to_string(),
                    });
                }
                _ => section.entries.push(Entry::Raw(line.trim_end().to_string())),
            }
        }

        doc
    }

    pub fn render(&self) -> String {
        let mut result = String::new();

        for line in &self.preamble {
            result.push_str(line);
            result.push('\n');
        }

        for section in &self.sections {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&format!("[{}]\n", section.name));
            for entry in &section.entries {
                match entry {
                    Entry::Pair { key, value } if value.is_empty() => {
                        result.push_str(&format!("{} =\n", key));
                    }
                    Entry::Pair { key, value } => {
                        result.push_str(&format!("{} = {}\n", key, value));
                    }
                    Entry::Raw(line) => {
                        result.push_str(line);
                        result.push('\n');
                    }
                }
            }
        }

        result
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Existing section with this name, or a new one appended at the end
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    /// Replace the whole content of a section, keeping its position
    pub fn replace_section(&mut self, name: &str, pairs: &[(&str, String)]) {
        let section = self.section_mut(name);
        section.entries = pairs
            .iter()
            .map(|(key, value)| Entry::Pair {
                key: key.to_string(),
                value: value.clone(),
            })
            .collect();
    }
}
