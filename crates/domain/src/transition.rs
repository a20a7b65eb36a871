//! Travel order status transitions.

use common::{Locale, TravelOrderStatus};
use store::{OrderStore, TravelOrder};

use crate::DomainError;

/// Moves travel orders between statuses.
///
/// Status is only ever written through [`OrderStore::update_status_if`], so of
/// two racing changes to the same order at most one can succeed.
pub struct StatusTransitionService<S: OrderStore> {
    store: S,
    locale: Locale,
}

impl<S: OrderStore> StatusTransitionService<S> {
    /// Creates a new transition service with English status labels.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locale: Locale::default(),
        }
    }

    /// Uses `locale` for the status labels in error messages.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Changes `order` to `target` and returns the freshly stored order.
    ///
    /// A change to the current status succeeds without touching the store,
    /// even for terminal states. `order` may be stale: the update only lands
    /// if the stored status still equals `order.status`.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, from = %order.status))]
    pub async fn change(
        &self,
        order: TravelOrder,
        target: TravelOrderStatus,
    ) -> Result<TravelOrder, DomainError> {
        let from = order.status;

        if from == target {
            tracing::debug!("status unchanged, nothing to do");
            return Ok(order);
        }

        if !from.can_transition_to(target) {
            metrics::counter!(
                "travel_order_transitions_rejected_total",
                "from" => from.as_str(),
                "to" => target.as_str()
            )
            .increment(1);
            tracing::info!("transition rejected");
            return Err(DomainError::validation(
                "status",
                self.rejection_message(from, target),
            ));
        }

        let affected = self.store.update_status_if(order.id, from, target).await?;

        if affected == 0 {
            metrics::counter!("travel_order_transition_conflicts_total").increment(1);
            tracing::warn!("status changed concurrently");
            return Err(DomainError::validation(
                "status",
                concurrency_message(self.locale),
            ));
        }

        metrics::counter!(
            "travel_order_transitions_total",
            "from" => from.as_str(),
            "to" => target.as_str()
        )
        .increment(1);
        tracing::info!("status changed");

        self.store.find(order.id).await?.ok_or(DomainError::NotFound)
    }

    fn rejection_message(&self, from: TravelOrderStatus, to: TravelOrderStatus) -> String {
        match (self.locale, from, to) {
            (Locale::En, TravelOrderStatus::Approved, TravelOrderStatus::Canceled) => {
                "Cannot cancel an already-approved order.".to_string()
            }
            (Locale::PtBr, TravelOrderStatus::Approved, TravelOrderStatus::Canceled) => {
                "Não é possível cancelar um pedido já aprovado.".to_string()
            }
            (Locale::En, _, _) => format!(
                "Invalid transition from {} to {}.",
                from.label(self.locale),
                to.label(self.locale)
            ),
            (Locale::PtBr, _, _) => format!(
                "Transição inválida de {} para {}.",
                from.label(self.locale),
                to.label(self.locale)
            ),
        }
    }
}

fn concurrency_message(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Status was changed by another process, try again.",
        Locale::PtBr => "O status foi alterado por outro processo, tente novamente.",
    }
}
