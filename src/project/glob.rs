use super::file::GlobId;

/// A rule that discovers project files on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGlob {
    id: GlobId,
    pub directory: String,
    pub wildcard: String,
    pub recursive: bool,
}

impl ProjectGlob {
    pub fn new(
        id: GlobId,
        directory: impl Into<String>,
        wildcard: impl Into<String>,
        recursive: bool,
    ) -> Self {
        Self {
            id,
            directory: directory.into(),
            wildcard: wildcard.into(),
            recursive,
        }
    }

    pub fn id(&self) -> GlobId {
        self.id
    }
}
