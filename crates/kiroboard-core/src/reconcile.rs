//! Create-or-update keyed by a stable resource id

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info};

/// Which path a reconciliation took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Created,
    Updated,
}

impl Reconciled {
    pub fn as_str(self) -> &'static str {
        match self {
            Reconciled::Created => "created",
            Reconciled::Updated => "updated",
        }
    }
}

/// Try `create`; when it fails because the resource exists, `update` instead
///
/// Any other failure is returned untouched. `kind` and `resource_id` only
/// feed the logs.
pub async fn reconcile<P, E, C, CF, CT, U, UF, UT, X>(
    kind: &str,
    resource_id: &str,
    payload: P,
    create: C,
    update: U,
    already_exists: X,
) -> Result<Reconciled, E>
where
    P: Clone,
    E: Display,
    C: FnOnce(P) -> CF,
    CF: Future<Output = Result<CT, E>>,
    U: FnOnce(P) -> UF,
    UF: Future<Output = Result<UT, E>>,
    X: Fn(&E) -> bool,
{
    match create(payload.clone()).await {
        Ok(_) => {
            info!(resource = kind, id = resource_id, "Created {}", kind);
            Ok(Reconciled::Created)
        }
        Err(err) if already_exists(&err) => {
            debug!(resource = kind, id = resource_id, error = %err, "Already exists, updating");
            update(payload).await?;
            info!(resource = kind, id = resource_id, "Updated {}", kind);
            Ok(Reconciled::Updated)
        }
        Err(err) => Err(err),
    }
}
