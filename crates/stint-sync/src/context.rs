//! The explicit identity handed to every engine call.

use stint_core::record::OwnerId;

/// Who is acting. The engine never reads ambient identity state; whatever
/// the caller resolved at call time is passed in here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncContext {
  owner: Option<OwnerId>,
}

impl SyncContext {
  pub fn signed_in(owner: OwnerId) -> Self { Self { owner: Some(owner) } }

  pub fn anonymous() -> Self { Self::default() }

  pub fn owner(&self) -> Option<&OwnerId> { self.owner.as_ref() }
}

impl From<Option<OwnerId>> for SyncContext {
  fn from(owner: Option<OwnerId>) -> Self { Self { owner } }
}
