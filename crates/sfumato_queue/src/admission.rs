//! Spend-limit admission control.
//!
//! A ceiling admits work only if
//! `spent in window + reserved by other open jobs + additional <= ceiling`.
//! Reservations are recomputed from live job rows on every decision.

use sfumato_core::CostWindow;
use sfumato_database::SqliteStore;
use sfumato_error::{QueueError, QueueErrorKind, SfumatoResult, SpendLimitKind};
use sfumato_interface::SpendLimits;
use tracing::debug;

/// Tolerance for floating point comparison against a ceiling.
const EPSILON: f64 = 1e-9;

/// Inputs to one admission decision, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpendSnapshot {
    /// Confirmed spend in the current calendar month
    pub monthly_spent: f64,
    /// Confirmed spend across all usage
    pub total_spent: f64,
    /// Cost reserved by open jobs, excluding any job being re-checked
    pub reserved: f64,
}

/// Decide whether `additional` fits under both ceilings.
///
/// The monthly ceiling is checked first.
///
/// # Examples
///
/// ```
/// use sfumato_interface::SpendLimits;
/// use sfumato_queue::{SpendSnapshot, evaluate};
///
/// let limits = SpendLimits { monthly: Some(1.00), total: None };
/// let snapshot = SpendSnapshot { monthly_spent: 0.80, total_spent: 0.80, reserved: 0.134 };
///
/// assert!(evaluate(&limits, &snapshot, 0.10).is_err());
/// assert!(evaluate(&limits, &snapshot, 0.05).is_ok());
/// ```
pub fn evaluate(
    limits: &SpendLimits,
    snapshot: &SpendSnapshot,
    additional: f64,
) -> Result<(), QueueError> {
    let checks = [
        (SpendLimitKind::Monthly, limits.monthly, snapshot.monthly_spent),
        (SpendLimitKind::Total, limits.total, snapshot.total_spent),
    ];
    for (limit, ceiling, spent) in checks {
        let Some(ceiling) = ceiling else { continue };
        let projected = spent + snapshot.reserved + additional;
        if projected > ceiling + EPSILON {
            return Err(QueueError::new(QueueErrorKind::SpendLimitExceeded {
                limit,
                ceiling,
                spent,
                reserved: snapshot.reserved,
                attempted: additional,
                shortfall: projected - ceiling,
            }));
        }
    }
    Ok(())
}

/// Gather spend and reservations from the store.
///
/// Windows without a ceiling are not queried.
pub async fn snapshot(
    store: &SqliteStore,
    limits: &SpendLimits,
    exclude_job: Option<&str>,
) -> SfumatoResult<SpendSnapshot> {
    let monthly_spent = match limits.monthly {
        Some(_) => store.get_session_cost(CostWindow::Month).await?,
        None => 0.0,
    };
    let total_spent = match limits.total {
        Some(_) => store.get_session_cost(CostWindow::All).await?,
        None => 0.0,
    };
    let reserved = store
        .list_open_queue_jobs()
        .await?
        .iter()
        .filter(|job| Some(job.id().as_str()) != exclude_job)
        .map(|job| job.reserved_cost())
        .sum();

    Ok(SpendSnapshot {
        monthly_spent,
        total_spent,
        reserved,
    })
}

/// Check `additional` against the configured ceilings.
///
/// # Errors
///
/// Returns [`QueueErrorKind::SpendLimitExceeded`] naming the ceiling hit.
pub async fn check(
    store: &SqliteStore,
    limits: &SpendLimits,
    additional: f64,
    exclude_job: Option<&str>,
) -> SfumatoResult<()> {
    if limits.monthly.is_none() && limits.total.is_none() {
        return Ok(());
    }
    let snapshot = snapshot(store, limits, exclude_job).await?;
    debug!(?snapshot, additional, "Evaluating admission");
    evaluate(limits, &snapshot, additional)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_ceilings_admit_anything() {
        let snapshot = SpendSnapshot {
            monthly_spent: 1e6,
            total_spent: 1e6,
            reserved: 1e6,
        };
        assert!(evaluate(&SpendLimits::default(), &snapshot, 1e6).is_ok());
    }

    #[test]
    fn exact_ceiling_is_admitted() {
        let limits = SpendLimits {
            monthly: None,
            total: Some(0.3),
        };
        let snapshot = SpendSnapshot {
            monthly_spent: 0.0,
            total_spent: 0.1,
            reserved: 0.1,
        };
        assert!(evaluate(&limits, &snapshot, 0.1).is_ok());
    }

    #[test]
    fn rejection_names_limit_and_shortfall() {
        let limits = SpendLimits {
            monthly: Some(5.0),
            total: Some(1.0),
        };
        let snapshot = SpendSnapshot {
            monthly_spent: 0.5,
            total_spent: 0.9,
            reserved: 0.0,
        };
        let err = evaluate(&limits, &snapshot, 0.24).unwrap_err();
        match err.kind {
            QueueErrorKind::SpendLimitExceeded {
                limit, shortfall, ..
            } => {
                assert_eq!(limit, SpendLimitKind::Total);
                assert!((shortfall - 0.14).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("total spend limit"));
    }
}
