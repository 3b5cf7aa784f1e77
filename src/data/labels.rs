use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Ordered class labels. Index position is the model's class id.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    labels: Vec<String>,
}

impl LabelStore {
    /// Loads labels from a text file, one label per line. Blank lines are
    /// skipped; surrounding whitespace is stripped.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file_in = fs::File::open(path)?;
        let reader = BufReader::new(file_in);
        let labels = reader
            .lines()
            .filter_map(io::Result::ok)
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        Ok(Self { labels })
    }

    pub fn from_vec(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    /// Index of a label, if configured.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
