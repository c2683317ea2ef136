// Contract and onboarding workflow. All contract_status writes go
// through Restaurant::transition_contract_status; payment completion is
// idempotent and atomic with activation.

use chrono::Utc;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    models::contract::{Contract, ContractState, ContractUpdate, NewContract, CURRENT_TERMS_VERSION},
    models::payment::{NewPayment, Payment, PaymentStatus},
    models::restaurant::{ContractStatus, Restaurant, RestaurantUpdate},
    models::user::User,
    services::plans::PlanDefinition,
    utils::booking_errors::BookingError,
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct SelectPlanRequest {
    pub plan: String, // "basic" | "premium"
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AcceptContractRequest {
    pub terms_version: String,
    pub accept_terms: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CompletePaymentRequest {
    pub idempotency_key: String,
    pub provider: String,
    pub provider_payment_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatusResponse {
    pub contract_status: String,
    pub plan: String,
    pub email_verified: bool,
    pub completed_steps: Vec<String>,
    pub next_step: String,
    pub rejected_reason: Option<String>,
    pub offered_contract: Option<Contract>,
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct ContractService<'a> {
    state: &'a AppState,
}

impl<'a> ContractService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    async fn conn(
        &self,
    ) -> Result<
        bb8::PooledConnection<
            '_,
            diesel_async::pooled_connection::AsyncDieselConnectionManager<
                diesel_async::AsyncPgConnection,
            >,
        >,
        BookingError,
    > {
        self.state
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))
    }

    /// Admin approves a pending restaurant (pending -> approved)
    pub async fn approve(&self, restaurant_id: Uuid) -> Result<Restaurant, BookingError> {
        let mut conn = self.conn().await?;

        let restaurant = Restaurant::transition_contract_status(
            &mut conn,
            restaurant_id,
            ContractStatus::Approved,
            RestaurantUpdate {
                rejected_reason: Some(None),
                ..Default::default()
            },
        )
        .await?;

        let owner = User::find_by_id(&mut conn, restaurant.owner_id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
        drop(conn);

        tracing::info!(restaurant_id = %restaurant.id, "Restaurant approved");

        if let Err(e) = self
            .state
            .email_service
            .send_contract_decision_email(
                &owner.email,
                &owner.full_name,
                &restaurant.name,
                true,
                None,
            )
            .await
        {
            tracing::warn!("Failed to send approval email: {}", e);
        }

        Ok(restaurant)
    }

    /// Admin rejects a pending restaurant (pending -> rejected)
    pub async fn reject(
        &self,
        restaurant_id: Uuid,
        reason: &str,
    ) -> Result<Restaurant, BookingError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BookingError::ValidationError(
                "A rejection reason is required".to_string(),
            ));
        }

        let mut conn = self.conn().await?;

        let restaurant = Restaurant::transition_contract_status(
            &mut conn,
            restaurant_id,
            ContractStatus::Rejected,
            RestaurantUpdate {
                rejected_reason: Some(Some(reason.to_string())),
                ..Default::default()
            },
        )
        .await?;

        let owner = User::find_by_id(&mut conn, restaurant.owner_id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
        drop(conn);

        tracing::info!(restaurant_id = %restaurant.id, "Restaurant rejected");

        if let Err(e) = self
            .state
            .email_service
            .send_contract_decision_email(
                &owner.email,
                &owner.full_name,
                &restaurant.name,
                false,
                Some(reason),
            )
            .await
        {
            tracing::warn!("Failed to send rejection email: {}", e);
        }

        Ok(restaurant)
    }

    /// Owner picks a plan after approval. Supersedes any earlier offer.
    pub async fn select_plan(
        &self,
        owner_id: Uuid,
        request: SelectPlanRequest,
    ) -> Result<Contract, BookingError> {
        let plan = PlanDefinition::by_name(&request.plan)
            .map_err(|e| BookingError::ValidationError(e.to_string()))?;

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;

        if restaurant.contract_status_enum() != ContractStatus::Approved {
            return Err(BookingError::IllegalTransition {
                from: restaurant.contract_status.clone(),
                to: "plan_selection".to_string(),
            });
        }

        let plan_name = plan.name.clone();
        let fee = plan.monthly_fee_cents;
        let restaurant_id = restaurant.id;

        let contract = conn
            .transaction::<_, BookingError, _>(|conn| {
                async move {
                    Contract::cancel_open_offers(conn, restaurant_id)
                        .await
                        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

                    let contract = Contract::create(
                        conn,
                        NewContract {
                            restaurant_id,
                            plan: plan_name.clone(),
                            monthly_fee_cents: fee,
                            currency: "EUR".to_string(),
                            terms_version: CURRENT_TERMS_VERSION.to_string(),
                            status: ContractState::Offered.as_str().to_string(),
                        },
                    )
                    .await
                    .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

                    Restaurant::update(
                        conn,
                        restaurant_id,
                        RestaurantUpdate {
                            plan: Some(plan_name),
                            ..Default::default()
                        },
                    )
                    .await?;

                    Ok(contract)
                }
                .scope_boxed()
            })
            .await?;

        tracing::info!(restaurant_id = %restaurant_id, plan = %contract.plan, "Plan selected, contract offered");
        Ok(contract)
    }

    /// Owner accepts the offered contract. Basic (free) plans activate
    /// immediately; premium waits for payment.
    pub async fn accept_contract(
        &self,
        owner_id: Uuid,
        request: AcceptContractRequest,
    ) -> Result<OnboardingStatusResponse, BookingError> {
        if !request.accept_terms {
            return Err(BookingError::ValidationError(
                "Contract terms must be accepted".to_string(),
            ));
        }

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;

        let contract = Contract::latest_offered(&mut conn, restaurant.id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?
            .ok_or_else(|| BookingError::BadRequest("No contract offer to accept".to_string()))?;

        if contract.terms_version != request.terms_version {
            return Err(BookingError::BadRequest(format!(
                "Offered terms are version {}, not {}",
                contract.terms_version, request.terms_version
            )));
        }

        let restaurant_id = restaurant.id;
        let contract_id = contract.id;
        let free_plan = contract.monthly_fee_cents == 0;

        conn.transaction::<_, BookingError, _>(|conn| {
            async move {
                Contract::update(
                    conn,
                    contract_id,
                    ContractUpdate {
                        status: Some(ContractState::Accepted.as_str().to_string()),
                        accepted_at: Some(Some(Utc::now())),
                        accepted_by: Some(Some(owner_id)),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

                if free_plan {
                    // No payment step: activation happens with acceptance
                    Restaurant::transition_contract_status(
                        conn,
                        restaurant_id,
                        ContractStatus::Active,
                        RestaurantUpdate {
                            is_active: Some(true),
                            ..Default::default()
                        },
                    )
                    .await?;
                }

                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        tracing::info!(restaurant_id = %restaurant_id, free_plan, "Contract accepted");

        self.onboarding_status(owner_id).await
    }

    /// Record a completed payment and activate the restaurant, atomically.
    /// Replays with a known idempotency key return the recorded state
    /// without re-running the transition.
    pub async fn complete_payment(
        &self,
        owner_id: Uuid,
        request: CompletePaymentRequest,
    ) -> Result<OnboardingStatusResponse, BookingError> {
        let key = request.idempotency_key.trim().to_string();
        if key.is_empty() || key.len() > 100 {
            return Err(BookingError::ValidationError(
                "idempotency_key must be 1-100 characters".to_string(),
            ));
        }

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;

        // Replay: the payment was already recorded
        if let Some(existing) = Payment::find_by_idempotency_key(&mut conn, &key)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?
        {
            if existing.restaurant_id != restaurant.id {
                return Err(BookingError::Forbidden(
                    "Payment belongs to a different restaurant".to_string(),
                ));
            }
            tracing::info!(payment_id = %existing.id, "Payment replay, returning recorded state");
            drop(conn);
            return self.onboarding_status(owner_id).await;
        }

        let contract = self
            .latest_accepted_contract(&mut conn, restaurant.id)
            .await?
            .ok_or_else(|| {
                BookingError::BadRequest("No accepted contract awaiting payment".to_string())
            })?;

        if contract.monthly_fee_cents == 0 {
            return Err(BookingError::BadRequest(
                "The selected plan does not require payment".to_string(),
            ));
        }

        let restaurant_id = restaurant.id;
        let contract_id = contract.id;
        let amount = contract.monthly_fee_cents;
        let provider = request.provider.clone();
        let provider_payment_id = request.provider_payment_id.clone();

        // Payment row and activation commit or roll back together
        conn.transaction::<_, BookingError, _>(|conn| {
            async move {
                Payment::create(
                    conn,
                    NewPayment {
                        restaurant_id,
                        contract_id: Some(contract_id),
                        idempotency_key: key,
                        provider,
                        provider_payment_id,
                        amount_cents: amount,
                        currency: "EUR".to_string(),
                        status: PaymentStatus::Completed.as_str().to_string(),
                        completed_at: Some(Utc::now()),
                    },
                )
                .await
                .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

                Restaurant::transition_contract_status(
                    conn,
                    restaurant_id,
                    ContractStatus::Active,
                    RestaurantUpdate {
                        is_active: Some(true),
                        ..Default::default()
                    },
                )
                .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        tracing::info!(restaurant_id = %restaurant_id, "Payment completed, restaurant activated");

        self.onboarding_status(owner_id).await
    }

    /// Owner's onboarding progress and next step
    pub async fn onboarding_status(
        &self,
        owner_id: Uuid,
    ) -> Result<OnboardingStatusResponse, BookingError> {
        let mut conn = self.conn().await?;

        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;
        let owner = User::find_by_id(&mut conn, owner_id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let offered = Contract::latest_offered(&mut conn, restaurant.id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
        let accepted = self
            .latest_accepted_contract(&mut conn, restaurant.id)
            .await?;

        let status = restaurant.contract_status_enum();
        let mut completed_steps = vec!["registered".to_string()];

        if owner.email_verified {
            completed_steps.push("email_verified".to_string());
        }
        if matches!(status, ContractStatus::Approved | ContractStatus::Active) {
            completed_steps.push("approved".to_string());
        }
        if offered.is_some() || accepted.is_some() {
            completed_steps.push("plan_selected".to_string());
        }
        if accepted.is_some() {
            completed_steps.push("contract_accepted".to_string());
        }
        if status == ContractStatus::Active {
            completed_steps.push("active".to_string());
        }

        let next_step = match status {
            _ if !owner.email_verified => "verify_email",
            ContractStatus::Pending => "await_review",
            ContractStatus::Rejected => "edit_and_resubmit",
            ContractStatus::Approved => match (&offered, &accepted) {
                (None, None) => "select_plan",
                (Some(_), _) => "accept_contract",
                (None, Some(_)) => "complete_payment",
            },
            ContractStatus::Active => "dashboard",
        };

        Ok(OnboardingStatusResponse {
            contract_status: restaurant.contract_status.clone(),
            plan: restaurant.plan.clone(),
            email_verified: owner.email_verified,
            completed_steps,
            next_step: next_step.to_string(),
            rejected_reason: restaurant.rejected_reason.clone(),
            offered_contract: offered,
        })
    }

    async fn latest_accepted_contract(
        &self,
        conn: &mut diesel_async::AsyncPgConnection,
        restaurant: Uuid,
    ) -> Result<Option<Contract>, BookingError> {
        use crate::schema::contracts::dsl::*;
        use diesel::prelude::*;
        use diesel_async::RunQueryDsl;

        contracts
            .filter(restaurant_id.eq(restaurant))
            .filter(status.eq(ContractState::Accepted.as_str()))
            .order(accepted_at.desc())
            .first::<Contract>(conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))
    }
}
