use std::path::Path;

use crate::credentials::StagedCredential;
use crate::model::{ItemId, Variant};

/// One admitted conversion waiting for a worker.
///
/// The task owns the staged credential: whichever way the task ends
/// (executed, or dropped unexecuted at shutdown) the file is released.
#[derive(Debug)]
pub struct ConversionTask {
    pub id: String,
    pub item_id: ItemId,
    pub variant: Variant,
    pub credential: Option<StagedCredential>,
}

impl ConversionTask {
    pub fn new(item_id: ItemId, variant: Variant, credential: Option<StagedCredential>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            item_id,
            variant,
            credential,
        }
    }

    pub fn credential_path(&self) -> Option<&Path> {
        self.credential.as_ref().map(StagedCredential::path)
    }
}
