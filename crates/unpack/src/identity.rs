//! Output folder resolution for extracted bundles
//!
//! A bundle reader reports two independently ordered enumerations: the
//! manifest's member table (every package the bundle declares) and the
//! applicable payload file names (what was actually extracted). Folder names
//! come from joining the two by file name, in the order of the applicable
//! list.

use appxtract_errors::UnpackError;
use appxtract_types::BundleMember;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maps payload file names to package full names
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    full_names: HashMap<String, String>,
}

impl IdentityResolver {
    /// Index the member table by exact file name
    ///
    /// When a file name is declared twice, the first row wins.
    #[must_use]
    pub fn new(members: &[BundleMember]) -> Self {
        let mut full_names = HashMap::with_capacity(members.len());
        for member in members {
            full_names
                .entry(member.file_name.clone())
                .or_insert_with(|| member.identity.full_name());
        }
        Self { full_names }
    }

    /// Full name declared for `file_name`
    #[must_use]
    pub fn full_name(&self, file_name: &str) -> Option<&str> {
        self.full_names.get(file_name).map(String::as_str)
    }

    /// Folders produced by a bundle extraction
    ///
    /// The bundle's own folder comes first, followed by one folder per
    /// applicable payload in `applicable` order. Members that are not
    /// applicable produce nothing.
    ///
    /// # Errors
    ///
    /// Returns `UndeclaredPayload` if an applicable file name has no row in
    /// the member table.
    pub fn resolve(
        &self,
        destination: &Path,
        bundle_full_name: &str,
        applicable: &[String],
    ) -> Result<Vec<PathBuf>, UnpackError> {
        let mut folders = Vec::with_capacity(applicable.len() + 1);
        folders.push(destination.join(bundle_full_name));

        for file_name in applicable {
            let full_name =
                self.full_name(file_name)
                    .ok_or_else(|| UnpackError::UndeclaredPayload {
                        file_name: file_name.clone(),
                    })?;
            folders.push(destination.join(full_name));
        }

        Ok(folders)
    }
}
