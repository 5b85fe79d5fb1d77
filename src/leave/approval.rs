use crate::error::AppError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Principal;
use crate::model::user::User;
use crate::store::{Review, Store};
use serde::Deserialize;
use std::str::FromStr;
use strum_macros::EnumString;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// `approve` or `reject`
    #[schema(example = "approve")]
    pub action: Option<String>,
    #[schema(example = "Enjoy your time off")]
    pub manager_comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ReviewAction {
    Approve,
    Reject,
}

/// Picks the transition for a pending request.
///
/// pending → approved | rejected; anything already decided is final. Approval needs
/// the owner's live counter for the leave type to cover the whole span.
fn decide(
    leave: &LeaveRequest,
    owner: Option<&User>,
    action: Option<&str>,
    manager_comment: Option<String>,
) -> Result<Review, AppError> {
    if leave.status != LeaveStatus::Pending {
        return Err(AppError::conflict("Leave request already processed"));
    }

    let requested_days = leave.requested_days();
    if requested_days <= 0 {
        return Err(AppError::validation("Invalid leave duration"));
    }

    let manager_comment = manager_comment.unwrap_or_default();

    match action.and_then(|a| ReviewAction::from_str(a).ok()) {
        Some(ReviewAction::Approve) => {
            let owner = owner.ok_or_else(|| AppError::not_found("User not found"))?;
            let current = owner.leave_balances.get(leave.leave_type);

            if requested_days > current {
                return Err(AppError::validation(format!(
                    "Cannot approve {requested_days} days. Only {current} days available for {} leave.",
                    leave.leave_type
                )));
            }

            Ok(Review {
                status: LeaveStatus::Approved,
                deduct_days: Some(requested_days),
                manager_comment,
            })
        }
        Some(ReviewAction::Reject) => Ok(Review {
            status: LeaveStatus::Rejected,
            deduct_days: None,
            manager_comment,
        }),
        None => Err(AppError::conflict("Action must be approve or reject")),
    }
}

/// Approves or rejects a pending leave request on behalf of `reviewer`.
pub async fn process_leave<S: Store>(
    store: &S,
    reviewer: &Principal,
    leave_id: u64,
    request: ReviewRequest,
) -> Result<LeaveRequest, AppError> {
    let ReviewRequest {
        action,
        manager_comment,
    } = request;

    let leave = store
        .review_leave(leave_id, |leave, owner| {
            decide(leave, owner, action.as_deref(), manager_comment)
        })
        .await?;

    info!(
        leave_id,
        reviewer_id = reviewer.user_id,
        employee_id = leave.employee_id,
        status = %leave.status,
        "Leave request reviewed"
    );
    Ok(leave)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leave::testing::{day, employee, manager, seed};
    use crate::model::leave_request::LeaveType;
    use crate::store::memory::MemoryStore;

    fn review(action: &str, comment: Option<&str>) -> ReviewRequest {
        ReviewRequest {
            action: Some(action.to_string()),
            manager_comment: comment.map(str::to_string),
        }
    }

    async fn sick_balance(store: &MemoryStore, user_id: u64) -> i64 {
        store
            .find_user(user_id)
            .await
            .unwrap()
            .unwrap()
            .leave_balances
            .get(LeaveType::Sick)
    }

    #[actix_web::test]
    async fn approve_deducts_requested_days() {
        let store = MemoryStore::new();
        let jane = employee(&store, "Jane").await;
        let leave = seed(&store, &jane, LeaveType::Sick, day(2), day(4), LeaveStatus::Pending);

        let approved = process_leave(&store, &manager(), leave.id, review("approve", Some("ok")))
            .await
            .unwrap();

        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.manager_comment.as_deref(), Some("ok"));
        assert_eq!(sick_balance(&store, jane.id).await, 4);
    }

    #[actix_web::test]
    async fn reject_leaves_balances_untouched() {
        let store = MemoryStore::new();
        let jane = employee(&store, "Jane").await;
        let leave = seed(&store, &jane, LeaveType::Sick, day(2), day(4), LeaveStatus::Pending);

        let rejected = process_leave(&store, &manager(), leave.id, review("reject", None))
            .await
            .unwrap();

        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.manager_comment.as_deref(), Some(""));
        let user = store.find_user(jane.id).await.unwrap().unwrap();
        assert_eq!(user.leave_balances, jane.leave_balances);
    }

    #[actix_web::test]
    async fn second_review_is_rejected() {
        let store = MemoryStore::new();
        let jane = employee(&store, "Jane").await;
        let leave = seed(&store, &jane, LeaveType::Sick, day(2), day(2), LeaveStatus::Pending);

        process_leave(&store, &manager(), leave.id, review("approve", None))
            .await
            .unwrap();

        for action in ["approve", "reject"] {
            let err = process_leave(&store, &manager(), leave.id, review(action, None))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(ref m) if m == "Leave request already processed"));
        }
        assert_eq!(sick_balance(&store, jane.id).await, 6);
    }

    #[actix_web::test]
    async fn insufficient_counter_blocks_approval_without_mutation() {
        let store = MemoryStore::new();
        let jane = employee(&store, "Jane").await;
        store.set_balance(jane.id, LeaveType::Sick, 2);
        let leave = seed(&store, &jane, LeaveType::Sick, day(2), day(4), LeaveStatus::Pending);

        let err = process_leave(&store, &manager(), leave.id, review("approve", None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ref m) if m == "Cannot approve 3 days. Only 2 days available for sick leave."
        ));
        assert_eq!(sick_balance(&store, jane.id).await, 2);
        let stored = store.leaves_for_employee(jane.id).await.unwrap();
        assert_eq!(stored[0].status, LeaveStatus::Pending);
    }

    #[actix_web::test]
    async fn unknown_action_and_unknown_leave() {
        let store = MemoryStore::new();
        let jane = employee(&store, "Jane").await;
        let leave = seed(&store, &jane, LeaveType::Paid, day(2), day(2), LeaveStatus::Pending);

        let err = process_leave(&store, &manager(), leave.id, review("escalate", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Action must be approve or reject"));

        let err = process_leave(&store, &manager(), 404, review("approve", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Leave not found"));
    }

    #[actix_web::test]
    async fn approval_uses_live_counter_not_quota() {
        let store = MemoryStore::new();
        let jane = employee(&store, "Jane").await;
        // quota says vacation is exhausted by this approved leave, counter still says 2
        seed(&store, &jane, LeaveType::Vacation, day(1), day(2), LeaveStatus::Approved);
        let leave = seed(&store, &jane, LeaveType::Vacation, day(5), day(6), LeaveStatus::Pending);

        let approved = process_leave(&store, &manager(), leave.id, review("approve", None))
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
    }

    #[test]
    fn decide_checks_duration_before_action() {
        let leave = LeaveRequest {
            id: 1,
            employee_id: 1,
            leave_type: LeaveType::Sick,
            start_date: day(3),
            end_date: day(1),
            reason: None,
            status: LeaveStatus::Pending,
            manager_comment: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let err = decide(&leave, None, Some("nonsense"), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid leave duration"));
    }
}
