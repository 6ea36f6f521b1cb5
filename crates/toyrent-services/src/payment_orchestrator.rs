//! Payment orchestrator
//!
//! Opens gateway transactions for rentals and extensions and reconciles
//! gateway callbacks with rental state:
//! - Create payments for a rental's outstanding amount
//! - Create payments for extensions, carrying rollback metadata
//! - Verify callbacks against the gateway's status API before acting
//! - Undo extensions whose payment failed

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use toyrent_core::{
    config::GatewayConfig,
    models::{
        ExtensionMetadata, GatewayCustomer, GatewayItem, GatewayTransactionRequest, Payment,
        PaymentStatus, PaymentType, Rental, RentalStatus, TransactionStatus,
    },
    traits::{PaymentGateway, PaymentRepository, RentalRepository},
    AppError, AppResult,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::fee_calculator::{classify_payment, rental_days};

/// Payment orchestration settings
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Hours until an issued checkout expires
    pub expiry_hours: i64,

    /// Deadline for each gateway call
    pub gateway_timeout: Duration,

    /// Reject callbacks whose claimed status differs from the gateway's
    pub strict_callback_verification: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            expiry_hours: 24,
            gateway_timeout: Duration::from_secs(15),
            strict_callback_verification: false,
        }
    }
}

impl From<&GatewayConfig> for PaymentConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            expiry_hours: config.expiry_hours,
            gateway_timeout: Duration::from_secs(config.timeout_secs),
            strict_callback_verification: config.strict_callback_verification,
        }
    }
}

/// What reconciliation changed besides the payment record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CallbackAction {
    /// Payment record updated, nothing else to do
    None,
    /// The extension paid for by this payment was undone
    ExtensionRolledBack,
    /// Rental payment status, and possibly lifecycle status, changed
    RentalUpdated {
        payment_status: PaymentStatus,
        rental_status: Option<RentalStatus>,
    },
}

/// Result of processing one gateway callback
#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub payment: Payment,
    pub action: CallbackAction,
}

/// Rental state implied by a gateway status for non-extension payments
///
/// `None` means the status leaves the rental untouched.
fn rental_effect(status: TransactionStatus) -> Option<(PaymentStatus, Option<RentalStatus>)> {
    match status {
        TransactionStatus::Capture | TransactionStatus::Settlement => {
            Some((PaymentStatus::Paid, Some(RentalStatus::Active)))
        }
        TransactionStatus::Pending => Some((PaymentStatus::Pending, Some(RentalStatus::Pending))),
        TransactionStatus::Deny
        | TransactionStatus::Cancel
        | TransactionStatus::Expire
        | TransactionStatus::Failure => Some((PaymentStatus::Failed, Some(RentalStatus::Pending))),
        TransactionStatus::Refund => Some((PaymentStatus::Refunded, None)),
        TransactionStatus::PartialRefund => None,
    }
}

/// Payment orchestrator
pub struct PaymentService {
    rentals: Arc<dyn RentalRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
}

impl PaymentService {
    /// Create a new payment service
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            rentals,
            payments,
            gateway,
            config,
        }
    }

    /// Run a gateway call under the configured deadline
    async fn gateway_deadline<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Gateway call exceeded {}s deadline",
                    self.config.gateway_timeout.as_secs()
                );
                Err(AppError::GatewayTimeout(self.config.gateway_timeout.as_secs()))
            }
        }
    }

    async fn load_rental(&self, rental_id: Uuid) -> AppResult<Rental> {
        self.rentals
            .find_by_id(rental_id)
            .await?
            .ok_or_else(|| AppError::RentalNotFound(rental_id.to_string()))
    }

    fn customer_details(rental: &Rental) -> Option<GatewayCustomer> {
        rental.customer.as_ref().map(|customer| GatewayCustomer {
            first_name: customer.full_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
        })
    }

    /// One line per rented item, then one line per outstanding fee
    fn rental_line_items(rental: &Rental) -> AppResult<Vec<GatewayItem>> {
        let days = Decimal::from(rental_days(
            rental.rental_date,
            rental.expected_return_date,
        )?);
        let mut items: Vec<GatewayItem> = rental
            .items
            .iter()
            .map(|item| {
                let name = item
                    .toy_name
                    .clone()
                    .unwrap_or_else(|| format!("Item {}", item.toy_id));
                GatewayItem::new(
                    item.toy_id.to_string(),
                    name,
                    item.price_per_unit * days,
                    item.quantity,
                )
            })
            .collect();

        if rental.late_fee > Decimal::ZERO {
            items.push(GatewayItem::new("late_fee", "Late Fee", rental.late_fee, 1));
        }
        if rental.damage_fee > Decimal::ZERO {
            items.push(GatewayItem::new("damage_fee", "Damage Fee", rental.damage_fee, 1));
        }

        Ok(items)
    }

    /// Open the gateway transaction for a new payment and fill its checkout fields
    async fn open_checkout(
        &self,
        mut payment: Payment,
        items: Vec<GatewayItem>,
        rental: &Rental,
    ) -> AppResult<Payment> {
        let request = GatewayTransactionRequest {
            order_id: payment.order_id.clone(),
            gross_amount: payment.gross_amount,
            items,
            customer: Self::customer_details(rental),
            expiry_hours: self.config.expiry_hours,
        };

        let transaction = self
            .gateway_deadline(self.gateway.create_transaction(&request))
            .await
            .map_err(|e| {
                error!(order_id = %payment.order_id, "Gateway transaction failed: {}", e);
                e
            })?;

        payment.snap_token = Some(transaction.token);
        payment.snap_url = Some(transaction.redirect_url);
        Ok(payment)
    }

    /// Create a payment for everything a rental currently owes
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The rental doesn't exist or is already paid
    /// - The gateway rejects the transaction or misses the deadline
    /// - The payment record cannot be stored
    #[instrument(skip(self))]
    pub async fn create_for_rental(&self, rental_id: Uuid) -> AppResult<Payment> {
        let rental = self.load_rental(rental_id).await?;

        if rental.payment_status == PaymentStatus::Paid {
            return Err(AppError::AlreadyPaid(rental_id.to_string()));
        }

        let gross_amount = rental.amount_due();
        if gross_amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Rental {} has nothing to pay",
                rental_id
            )));
        }

        let payment_type = classify_payment(rental.late_fee, rental.damage_fee);
        let payment = Payment::new(rental.id, payment_type, gross_amount)
            .with_expiry_hours(self.config.expiry_hours);

        info!(
            "Creating {} payment {} for rental {}: {}",
            payment_type, payment.order_id, rental_id, gross_amount
        );

        let items = Self::rental_line_items(&rental)?;
        let payment = self.open_checkout(payment, items, &rental).await?;
        let payment = self.payments.create(&payment).await?;

        if let Err(e) = self
            .rentals
            .update_payment_status(rental_id, PaymentStatus::Pending)
            .await
        {
            warn!(
                "Failed to mark rental {} payment as pending: {}",
                rental_id, e
            );
        }

        Ok(payment)
    }

    /// Create the payment for an extension already applied to the rental
    #[instrument(skip(self, metadata), fields(additional_cost = %metadata.additional_cost))]
    pub async fn create_for_extension(
        &self,
        rental_id: Uuid,
        metadata: ExtensionMetadata,
    ) -> AppResult<Payment> {
        let rental = self.load_rental(rental_id).await?;

        if metadata.additional_cost <= Decimal::ZERO {
            return Err(AppError::InvalidExtension(format!(
                "Extension cost must be positive, got {}",
                metadata.additional_cost
            )));
        }

        let mut payment = Payment::new(rental.id, PaymentType::Extension, metadata.additional_cost)
            .with_expiry_hours(self.config.expiry_hours);

        let items = vec![GatewayItem::new(
            "extension",
            format!("Extension ({} days)", metadata.additional_days),
            metadata.additional_cost,
            1,
        )];
        payment.set_extension_metadata(metadata)?;

        info!(
            "Creating extension payment {} for rental {}",
            payment.order_id, rental_id
        );

        let payment = self.open_checkout(payment, items, &rental).await?;
        self.payments.create(&payment).await
    }

    /// Reconcile an inbound gateway notification
    ///
    /// The notification only names the order; the status acted on is the one
    /// the gateway's status API reports.
    #[instrument(skip(self, notification))]
    pub async fn process_callback(&self, notification: &Value) -> AppResult<CallbackOutcome> {
        let order_id = notification
            .get("order_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("order_id is required".to_string()))?;
        let notified = notification.get("transaction_status").and_then(Value::as_str);

        let status = self
            .gateway_deadline(self.gateway.check_transaction_status(order_id))
            .await?;

        if let Some(notified) = notified {
            let actual = status.transaction_status.to_string();
            if notified != actual {
                warn!(
                    order_id = %order_id,
                    notified = %notified,
                    actual = %actual,
                    "Callback status differs from gateway status"
                );
                if self.config.strict_callback_verification {
                    return Err(AppError::CallbackMismatch {
                        order_id: order_id.to_string(),
                        notified: notified.to_string(),
                        actual,
                    });
                }
            }
        }

        let payment = self
            .payments
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(order_id.to_string()))?;

        let payment = self.payments.update_transaction(payment.id, &status).await?;
        let transaction_status = payment.transaction_status;

        info!(
            "Payment {} ({}) is now {}",
            payment.id, payment.payment_type, transaction_status
        );

        let action = if payment.payment_type == PaymentType::Extension {
            self.reconcile_extension(&payment).await?
        } else {
            self.reconcile_rental(&payment).await?
        };

        Ok(CallbackOutcome { payment, action })
    }

    async fn reconcile_extension(&self, payment: &Payment) -> AppResult<CallbackAction> {
        if !payment.transaction_status.is_failure() {
            debug!(
                "Extension payment {} at {}, nothing to undo",
                payment.id, payment.transaction_status
            );
            return Ok(CallbackAction::None);
        }

        let metadata = payment.extension_metadata().ok_or_else(|| {
            error!("Extension payment {} has no rollback metadata", payment.id);
            AppError::Internal(format!(
                "Extension payment {} has no rollback metadata",
                payment.id
            ))
        })?;

        self.rentals
            .rollback_extension(
                payment.rental_id,
                metadata.old_expected_return_date,
                metadata.original_rental_price,
            )
            .await?;

        info!(
            "Rolled back extension of rental {} to {}",
            payment.rental_id, metadata.old_expected_return_date
        );
        Ok(CallbackAction::ExtensionRolledBack)
    }

    async fn reconcile_rental(&self, payment: &Payment) -> AppResult<CallbackAction> {
        let Some((payment_status, rental_status)) = rental_effect(payment.transaction_status)
        else {
            return Ok(CallbackAction::None);
        };

        self.rentals
            .update_payment_status(payment.rental_id, payment_status)
            .await?;

        let mut applied_status = None;
        if let Some(target) = rental_status {
            let rental = self.load_rental(payment.rental_id).await?;
            if rental.status.can_transition_to(target) {
                self.rentals.update_status(rental.id, target).await?;
                applied_status = Some(target);
            } else {
                warn!(
                    "Rental {} stays {}: callback cannot move it to {}",
                    rental.id, rental.status, target
                );
            }
        }

        Ok(CallbackAction::RentalUpdated {
            payment_status,
            rental_status: applied_status,
        })
    }

    /// Get payment by ID
    #[instrument(skip(self))]
    pub async fn get_payment(&self, id: Uuid) -> AppResult<Payment> {
        self.payments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(id.to_string()))
    }

    /// Get payment by gateway order ID
    #[instrument(skip(self))]
    pub async fn find_by_order_id(&self, order_id: &str) -> AppResult<Payment> {
        self.payments
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(order_id.to_string()))
    }

    /// All payments of a rental, oldest first
    #[instrument(skip(self))]
    pub async fn list_for_rental(&self, rental_id: Uuid) -> AppResult<Vec<Payment>> {
        self.load_rental(rental_id).await?;
        self.payments.find_by_rental_id(rental_id).await
    }
}
