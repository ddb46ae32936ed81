//! Integration tests for the service layer over the in-memory adapters.
//!
//! Tests: Service → Repository → MovementRecorder / EventBus
//!
//! Verifies:
//! - Move and loan scenarios end to end
//! - Movement failures never fail the mutation that triggered them
//! - Concurrent loans cannot oversell a unit
//! - Tenant isolation is preserved

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use chrono::DateTime;
    use stowage_core::{
        BorrowerId, DomainError, Entity, ErrorKind, InventoryId, ItemId, LoanId, LocationId,
        TenantId, UserId,
    };
    use stowage_inventory::{
        Condition, InventoryUnit, InventoryUpdate, Movement, NewInventoryUnit, Status,
    };
    use stowage_loans::{Borrower, Loan, LoanState, NewBorrower, NewLoan};

    use crate::locks::UnitLocks;
    use crate::movement_recorder::MovementRecorder;
    use crate::publisher::EventPublisher;
    use crate::repository::{
        Admission, InMemoryLoanRepository, LoanRepository, MovementRepository, RepositoryError,
        RepositoryResult,
    };
    use crate::services::{LoanService, MoveRequest, ServiceError};
    use crate::{Repositories, Stowage, WorkspaceContext};

    /// Movement store whose every call fails.
    struct FailingMovementRepository;

    #[async_trait]
    impl MovementRepository for FailingMovementRepository {
        async fn append(&self, _movement: &Movement) -> RepositoryResult<()> {
            Err(RepositoryError::Unavailable("movement store down".to_string()))
        }

        async fn list_for_unit(
            &self,
            _tenant_id: TenantId,
            _inventory_id: InventoryId,
        ) -> RepositoryResult<Vec<Movement>> {
            Err(RepositoryError::Unavailable("movement store down".to_string()))
        }
    }

    /// Loan store that finds the unit no longer AVAILABLE when it re-reads it
    /// under its own lock, as a database shared with another process would.
    #[derive(Default)]
    struct StatusChangedLoanRepository {
        inner: InMemoryLoanRepository,
    }

    #[async_trait]
    impl LoanRepository for StatusChangedLoanRepository {
        async fn save(&self, loan: &Loan) -> RepositoryResult<()> {
            self.inner.save(loan).await
        }

        async fn insert_within(&self, _loan: &Loan, _unit_quantity: i64) -> RepositoryResult<Admission> {
            Ok(Admission::Unavailable)
        }

        async fn find_by_id(&self, tenant_id: TenantId, id: LoanId) -> RepositoryResult<Option<Loan>> {
            self.inner.find_by_id(tenant_id, id).await
        }

        async fn find_active_for_unit(
            &self,
            tenant_id: TenantId,
            inventory_id: InventoryId,
        ) -> RepositoryResult<Vec<Loan>> {
            self.inner.find_active_for_unit(tenant_id, inventory_id).await
        }

        async fn find_for_unit(
            &self,
            tenant_id: TenantId,
            inventory_id: InventoryId,
        ) -> RepositoryResult<Vec<Loan>> {
            self.inner.find_for_unit(tenant_id, inventory_id).await
        }

        async fn find_for_borrower(
            &self,
            tenant_id: TenantId,
            borrower_id: BorrowerId,
        ) -> RepositoryResult<Vec<Loan>> {
            self.inner.find_for_borrower(tenant_id, borrower_id).await
        }

        async fn find_active(&self, tenant_id: TenantId) -> RepositoryResult<Vec<Loan>> {
            self.inner.find_active(tenant_id).await
        }

        async fn find_overdue(
            &self,
            tenant_id: TenantId,
            now: DateTime<Utc>,
        ) -> RepositoryResult<Vec<Loan>> {
            self.inner.find_overdue(tenant_id, now).await
        }
    }

    fn test_ctx() -> WorkspaceContext {
        stowage_observability::init_for_tests();
        WorkspaceContext::new(TenantId::new()).with_actor(UserId::new())
    }

    fn new_unit(location_id: LocationId, quantity: i64, status: Status) -> NewInventoryUnit {
        NewInventoryUnit {
            workspace_id: TenantId::nil(),
            item_id: ItemId::new(),
            location_id,
            container_id: None,
            quantity,
            condition: Condition::New,
            status,
            currency_code: None,
        }
    }

    async fn create_unit(
        app: &Stowage,
        ctx: &WorkspaceContext,
        quantity: i64,
        status: Status,
    ) -> InventoryUnit {
        app.inventory
            .create(ctx, new_unit(LocationId::new(), quantity, status))
            .await
            .unwrap()
    }

    async fn create_borrower(app: &Stowage, ctx: &WorkspaceContext, name: &str) -> Borrower {
        app.borrowers
            .create(
                ctx,
                NewBorrower {
                    workspace_id: TenantId::nil(),
                    name: name.to_string(),
                    email: None,
                    phone: None,
                    notes: None,
                },
            )
            .await
            .unwrap()
    }

    fn loan_request(unit: &InventoryUnit, borrower: &Borrower, quantity: i64) -> NewLoan {
        NewLoan {
            workspace_id: TenantId::nil(),
            inventory_id: *unit.id(),
            borrower_id: *borrower.id(),
            quantity,
            due_date: None,
            notes: None,
        }
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(e) => e,
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    fn unit_id(unit: &InventoryUnit) -> InventoryId {
        *unit.id()
    }

    #[tokio::test]
    async fn scenario_a_move_records_old_and_new_placement() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let l1 = LocationId::new();
        let l2 = LocationId::new();

        let unit = app
            .inventory
            .create(&ctx, new_unit(l1, 5, Status::Available))
            .await
            .unwrap();
        let moved = app
            .inventory
            .move_unit(
                &ctx,
                unit_id(&unit),
                MoveRequest {
                    location_id: l2,
                    container_id: None,
                    reason: Some("shelf swap".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.location_id(), l2);
        assert_eq!(
            app.inventory.get(&ctx, unit_id(&unit)).await.unwrap().location_id(),
            l2
        );

        let history = app.inventory.movement_history(&ctx, unit_id(&unit)).await.unwrap();
        let moves: Vec<&Movement> = history
            .iter()
            .filter(|m| !m.is_initial_placement())
            .collect();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from().location_id, Some(l1));
        assert_eq!(moves[0].to().location_id, Some(l2));
        assert_eq!(moves[0].quantity(), 5);
        assert_eq!(moves[0].moved_by(), ctx.actor_id);
        assert_eq!(moves[0].reason(), Some("shelf swap"));

        // Newest first: the move precedes the creation record.
        assert!(history[0] == *moves[0]);
        assert!(history.last().unwrap().is_initial_placement());
    }

    #[tokio::test]
    async fn scenario_b_return_frees_capacity() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 5, Status::Available).await;
        let b1 = create_borrower(&app, &ctx, "B1").await;
        let b2 = create_borrower(&app, &ctx, "B2").await;

        let first = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &b1, 5))
            .await
            .unwrap();
        assert_eq!(app.loans.remaining_quantity(&ctx, unit_id(&unit)).await.unwrap(), 0);

        let err = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &b2, 1))
            .await
            .unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::QuantityExceedsAvailable {
                requested: 1,
                remaining: 0
            }
        );

        let returned = app
            .loans
            .return_loan(&ctx, *first.id())
            .await
            .unwrap();
        assert_eq!(returned.state_at(Utc::now()), LoanState::Returned);

        let second = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &b2, 1))
            .await
            .unwrap();
        assert!(second.is_active());
        assert_eq!(app.loans.remaining_quantity(&ctx, unit_id(&unit)).await.unwrap(), 4);

        // Loans never flip the unit's status.
        let unit = app.inventory.get(&ctx, unit_id(&unit)).await.unwrap();
        assert_eq!(unit.status(), Status::Available);

        let reasons: Vec<Option<String>> = app
            .inventory
            .movement_history(&ctx, unit_id(&unit))
            .await
            .unwrap()
            .iter()
            .map(|m| m.reason().map(str::to_string))
            .collect();
        assert_eq!(
            reasons,
            vec![
                Some("loaned out".to_string()),
                Some("loan returned".to_string()),
                Some("loaned out".to_string()),
                None,
            ]
        );
    }

    #[tokio::test]
    async fn scenario_c_unit_not_available() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 10, Status::InUse).await;
        let borrower = create_borrower(&app, &ctx, "Casey").await;

        for qty in [1, 10, 100] {
            let err = app
                .loans
                .create_loan(&ctx, loan_request(&unit, &borrower, qty))
                .await
                .unwrap_err();
            assert_eq!(domain(err), DomainError::InventoryNotAvailable);
        }
        assert!(app.loans.list_active(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_that_relocates_records_a_movement() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let l1 = LocationId::new();
        let l2 = LocationId::new();

        let unit = app
            .inventory
            .create(&ctx, new_unit(l1, 4, Status::Available))
            .await
            .unwrap();
        let update = |location_id| InventoryUpdate {
            location_id,
            container_id: None,
            quantity: 4,
            condition: Condition::Good,
            details: unit.details().clone(),
        };

        // Same placement: no relocation record.
        app.inventory
            .update(&ctx, unit_id(&unit), update(l1))
            .await
            .unwrap();
        let updated = app
            .inventory
            .update(&ctx, unit_id(&unit), update(l2))
            .await
            .unwrap();
        assert_eq!(updated.location_id(), l2);

        let history = app.inventory.movement_history(&ctx, unit_id(&unit)).await.unwrap();
        let moves: Vec<&Movement> = history
            .iter()
            .filter(|m| !m.is_initial_placement())
            .collect();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from().location_id, Some(l1));
        assert_eq!(moves[0].to().location_id, Some(l2));
        assert_eq!(moves[0].quantity(), 4);
        assert_eq!(moves[0].moved_by(), ctx.actor_id);
    }

    #[tokio::test]
    async fn store_side_status_recheck_rejects_the_loan() {
        let mut repos = Repositories::in_memory();
        repos.loans = Arc::new(StatusChangedLoanRepository::default());
        let app = Stowage::from_repositories(repos);
        let ctx = test_ctx();

        let unit = create_unit(&app, &ctx, 5, Status::Available).await;
        let borrower = create_borrower(&app, &ctx, "Kit").await;

        let err = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &borrower, 1))
            .await
            .unwrap_err();
        assert_eq!(domain(err), DomainError::InventoryNotAvailable);
        assert!(app.loans.list_active(&ctx).await.unwrap().is_empty());

        let history = app.inventory.movement_history(&ctx, unit_id(&unit)).await.unwrap();
        assert!(history.iter().all(Movement::is_initial_placement));
    }

    #[tokio::test]
    async fn foreign_tenant_loan_does_not_wait_on_the_unit_lock() {
        let repos = Repositories::in_memory();
        let app = Stowage::from_repositories(repos.clone());
        let locks = Arc::new(UnitLocks::new());
        let loans = LoanService::new(
            repos.loans.clone(),
            repos.inventory.clone(),
            repos.borrowers.clone(),
            MovementRecorder::new(repos.movements.clone()),
            EventPublisher::disabled(),
            locks.clone(),
        );

        let owner = test_ctx();
        let intruder = test_ctx();
        let unit = create_unit(&app, &owner, 5, Status::Available).await;
        let borrower = create_borrower(&app, &intruder, "Rae").await;

        let _held = locks.lock(unit_id(&unit)).await;
        let attempt = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            loans.create_loan(&intruder, loan_request(&unit, &borrower, 1)),
        )
        .await
        .expect("lookup must not wait for another tenant's lock");
        assert_eq!(domain(attempt.unwrap_err()), DomainError::NotFound);
    }

    #[tokio::test]
    async fn movement_failure_does_not_fail_the_move() {
        let mut repos = Repositories::in_memory();
        repos.movements = Arc::new(FailingMovementRepository);
        let app = Stowage::from_repositories(repos);
        let ctx = test_ctx();

        let unit = create_unit(&app, &ctx, 3, Status::Available).await;
        let target = LocationId::new();
        let moved = app
            .inventory
            .move_unit(
                &ctx,
                unit_id(&unit),
                MoveRequest {
                    location_id: target,
                    container_id: None,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.location_id(), target);
        assert_eq!(
            app.inventory.get(&ctx, unit_id(&unit)).await.unwrap().location_id(),
            target
        );

        // Loans go through as well.
        let borrower = create_borrower(&app, &ctx, "Dana").await;
        let loan = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &borrower, 2))
            .await
            .unwrap();
        app.loans
            .return_loan(&ctx, *loan.id())
            .await
            .unwrap();

        // Reading the history surfaces the outage.
        let err = app
            .inventory
            .movement_history(&ctx, unit_id(&unit))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_loans_never_oversell() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();

        for _ in 0..20 {
            let unit = create_unit(&app, &ctx, 5, Status::Available).await;
            let borrower = create_borrower(&app, &ctx, "Eli").await;

            let mut handles = Vec::new();
            for _ in 0..2 {
                let app = app.clone();
                let request = loan_request(&unit, &borrower, 3);
                handles.push(tokio::spawn(async move {
                    app.loans.create_loan(&ctx, request).await
                }));
            }

            let mut admitted = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => admitted += 1,
                    Err(err) => assert_eq!(
                        domain(err),
                        DomainError::QuantityExceedsAvailable {
                            requested: 3,
                            remaining: 2
                        }
                    ),
                }
            }
            assert_eq!(admitted, 1);

            let on_loan: i64 = app
                .loans
                .list_for_unit(&ctx, unit_id(&unit))
                .await
                .unwrap()
                .iter()
                .filter(|l| l.is_active())
                .map(Loan::quantity)
                .sum();
            assert!(on_loan <= 5);
        }
    }

    #[tokio::test]
    async fn double_return_is_rejected() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 1, Status::Available).await;
        let borrower = create_borrower(&app, &ctx, "Fay").await;
        let loan = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &borrower, 1))
            .await
            .unwrap();
        let id = *loan.id();

        app.loans.return_loan(&ctx, id).await.unwrap();
        let err = app.loans.return_loan(&ctx, id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(domain(err), DomainError::AlreadyReturned);

        let err = app
            .loans
            .extend_due_date(&ctx, id, Utc::now() + Duration::days(1))
            .await
            .unwrap_err();
        assert_eq!(domain(err), DomainError::AlreadyReturned);
    }

    #[tokio::test]
    async fn overdue_listing_uses_the_given_clock() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 4, Status::Available).await;
        let borrower = create_borrower(&app, &ctx, "Gus").await;

        let due = Utc::now() + Duration::days(3);
        let mut request = loan_request(&unit, &borrower, 1);
        request.due_date = Some(due);
        let loan = app.loans.create_loan(&ctx, request).await.unwrap();
        let id = *loan.id();

        assert!(app.loans.list_overdue(&ctx, Utc::now()).await.unwrap().is_empty());
        assert_eq!(
            app.loans
                .list_overdue(&ctx, due + Duration::seconds(1))
                .await
                .unwrap()
                .len(),
            1
        );

        let shorter = Utc::now() - Duration::hours(1);
        let extended = app.loans.extend_due_date(&ctx, id, shorter).await.unwrap();
        assert_eq!(extended.due_date(), Some(shorter));
        assert_eq!(app.loans.list_overdue(&ctx, Utc::now()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn archived_borrower_cannot_borrow() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 2, Status::Available).await;
        let borrower = create_borrower(&app, &ctx, "Hal").await;
        app.borrowers
            .archive(&ctx, *borrower.id())
            .await
            .unwrap();

        let err = app
            .loans
            .create_loan(&ctx, loan_request(&unit, &borrower, 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn other_tenants_see_nothing() {
        let app = Stowage::in_memory();
        let owner = test_ctx();
        let stranger = test_ctx();

        let unit = create_unit(&app, &owner, 5, Status::Available).await;
        let borrower = create_borrower(&app, &owner, "Ivy").await;
        let id = unit_id(&unit);

        assert_eq!(
            app.inventory.get(&stranger, id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            app.inventory
                .update_quantity(&stranger, id, 0)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            app.inventory.archive(&stranger, id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            app.inventory
                .movement_history(&stranger, id)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert!(app.inventory.list(&stranger, true).await.unwrap().is_empty());

        // The stranger cannot borrow from the owner's unit either.
        let err = app
            .loans
            .create_loan(&stranger, loan_request(&unit, &borrower, 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let untouched = app.inventory.get(&owner, id).await.unwrap();
        assert_eq!(untouched.quantity(), 5);
        assert!(!untouched.is_archived());
    }

    #[tokio::test]
    async fn rejected_mutations_leave_the_unit_unchanged() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 5, Status::Available).await;
        let id = unit_id(&unit);

        let err = app.inventory.update_quantity(&ctx, id, -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = app
            .inventory
            .move_unit(
                &ctx,
                id,
                MoveRequest {
                    location_id: LocationId::nil(),
                    container_id: None,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert_eq!(app.inventory.get(&ctx, id).await.unwrap(), unit);

        let emptied = app.inventory.update_quantity(&ctx, id, 0).await.unwrap();
        assert_eq!(emptied.quantity(), 0);
    }

    #[tokio::test]
    async fn archive_and_restore_are_idempotent_and_filter_listings() {
        let app = Stowage::in_memory();
        let ctx = test_ctx();
        let unit = create_unit(&app, &ctx, 2, Status::Available).await;
        let id = unit_id(&unit);

        assert!(app.inventory.archive(&ctx, id).await.unwrap().is_archived());
        assert!(app.inventory.archive(&ctx, id).await.unwrap().is_archived());
        assert!(app.inventory.list(&ctx, false).await.unwrap().is_empty());
        assert_eq!(app.inventory.list(&ctx, true).await.unwrap().len(), 1);
        assert_eq!(
            app.inventory.total_quantity_for_item(&ctx, unit.item_id()).await.unwrap(),
            0
        );

        assert!(!app.inventory.restore(&ctx, id).await.unwrap().is_archived());
        assert_eq!(
            app.inventory.available_for_item(&ctx, unit.item_id()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn mutations_publish_domain_events() {
        let app = Stowage::in_memory();
        let subscription = app.subscribe();
        let ctx = test_ctx();

        let unit = create_unit(&app, &ctx, 2, Status::Available).await;
        app.inventory
            .update_status(&ctx, unit_id(&unit), Status::Reserved)
            .await
            .unwrap();

        let types: Vec<String> = subscription
            .drain()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec!["inventory.unit.created", "inventory.unit.status_changed"]
        );
    }
}
