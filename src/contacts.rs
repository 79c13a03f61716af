//! Contact list file management
//!
//! A contact list is a plain text file, one phone number per line (first
//! column when lines are comma-separated), order = dial order. Duplicates
//! are rejected at the add stage; dispatch trusts the list as given.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// File-backed ordered set of raw phone numbers
#[derive(Clone, Debug)]
pub struct ContactList {
    path: PathBuf,
    numbers: Vec<String>,
}

impl ContactList {
    /// Load a contact list, failing when the file is missing
    ///
    /// A missing contact file before a batch run is a configuration error
    /// surfaced to the operator, not an empty run.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config(
                    format!("contact list not found: {}", path.display()),
                    "contacts_path",
                )
            } else {
                Error::Io(e)
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            numbers: Self::parse(&content),
        })
    }

    /// Load a contact list, treating a missing file as empty
    ///
    /// Used by the add flow, which creates the file on first write.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Self {
                path: path.to_path_buf(),
                numbers: Self::parse(&content),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self {
                path: path.to_path_buf(),
                numbers: Vec::new(),
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn parse(content: &str) -> Vec<String> {
        content
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Numbers in dial order
    pub fn numbers(&self) -> &[String] {
        &self.numbers
    }

    /// Number of contacts
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Append a number, rejecting duplicates
    ///
    /// Returns `Ok(false)` without touching the file when the number is
    /// already present. The whole file is rewritten on success, matching the
    /// simple one-number-per-line format.
    pub async fn add(&mut self, number: &str) -> Result<bool> {
        let number = number.trim();
        if number.is_empty() {
            return Err(Error::ContactList("cannot add an empty number".to_string()));
        }
        if self.numbers.iter().any(|n| n == number) {
            tracing::warn!(number = %number, "number already in contact list");
            return Ok(false);
        }

        self.numbers.push(number.to_string());
        self.save().await?;
        tracing::info!(number = %number, path = %self.path.display(), "contact added");
        Ok(true)
    }

    async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut content = self.numbers.join("\n");
        content.push('\n');
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}
