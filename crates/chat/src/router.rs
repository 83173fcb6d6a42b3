use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shopbot_core::dialogue::{
    step, DialogueAction, DialogueState, Prompt, ScratchSnapshot, StepOutcome,
};
use shopbot_core::domain::order::{NewOrder, NewPayment, Payment};
use shopbot_core::domain::session::{UserId, UserSession};
use shopbot_core::pricing::order_amount_cents;
use shopbot_core::reference::payment_reference;
use shopbot_db::repositories::{
    OrderRepository, PaymentRepository, RepositoryError, SessionRepository,
};
use shopbot_prices::{PriceError, PriceLookup};

use crate::commands::{parse_global_command, GlobalCommand};
use crate::replies::{self, Reply};
use crate::transport::{ChatTransport, InboundMessage, TransportError};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Process-local working data for one user. `cached_state` shadows the
/// durable session row and wins when the two disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchEntry {
    pub cached_state: DialogueState,
    pub product_type: Option<String>,
    pub rating: Option<u8>,
}

impl ScratchEntry {
    fn new(state: DialogueState) -> Self {
        Self { cached_state: state, product_type: None, rating: None }
    }
}

const ORDER_HISTORY_LIMIT: u32 = 5;

/// Per-message dialogue driver. Owns the scratch map, so it must be the
/// only task reading messages off the transport; the poll runner upholds
/// that by feeding it sequentially.
pub struct MessageRouter {
    sessions: Arc<dyn SessionRepository>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    transport: Arc<dyn ChatTransport>,
    prices: Arc<dyn PriceLookup>,
    admin_user_id: UserId,
    scratch: HashMap<UserId, ScratchEntry>,
}

impl MessageRouter {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        transport: Arc<dyn ChatTransport>,
        prices: Arc<dyn PriceLookup>,
        admin_user_id: UserId,
    ) -> Self {
        Self {
            sessions,
            orders,
            payments,
            transport,
            prices,
            admin_user_id,
            scratch: HashMap::new(),
        }
    }

    /// Read-only view of a user's scratch entry, for diagnostics and tests.
    pub fn scratch_entry(&self, user_id: &UserId) -> Option<&ScratchEntry> {
        self.scratch.get(user_id)
    }

    pub async fn handle_batch(&mut self, batch: Vec<InboundMessage>) {
        for message in batch {
            let correlation_id = Uuid::new_v4();
            debug!(%correlation_id, user_id = %message.user_id, "handling inbound message");
            match self.handle_message(&message).await {
                Ok(()) => {}
                Err(RouterError::Transport(send_error)) => {
                    warn!(
                        %correlation_id,
                        user_id = %message.user_id,
                        error = %send_error,
                        "reply delivery failed"
                    );
                }
                Err(RouterError::Repository(db_error)) => {
                    error!(
                        %correlation_id,
                        user_id = %message.user_id,
                        error = %db_error,
                        "message handling failed; resetting dialogue"
                    );
                    self.recover(&message.user_id).await;
                }
            }
        }
    }

    pub async fn handle_message(&mut self, message: &InboundMessage) -> Result<(), RouterError> {
        let (state, session) = self.resolve_state(&message.user_id).await?;
        let command = parse_global_command(&message.text);

        // Reset, leaving the admin chat, admin replies, profile and menu
        // take precedence over everything, including the admin relay.
        if let Some(command) = &command {
            match command {
                GlobalCommand::Start => {
                    self.commit_transition(&message.user_id, DialogueState::Idle).await?;
                    return self
                        .send_reply(&message.user_id, replies::render_prompt(&Prompt::Welcome))
                        .await;
                }
                GlobalCommand::LeaveAdminChat if state == DialogueState::ContactingAdmin => {
                    self.commit_transition(&message.user_id, DialogueState::Idle).await?;
                    return self.send_reply(&message.user_id, replies::left_admin_chat()).await;
                }
                GlobalCommand::AdminReply { user_id: target, text }
                    if message.user_id == self.admin_user_id =>
                {
                    let outbound = format!("Support: {text}");
                    if let Err(send_error) = self.transport.send(target, &outbound, None).await {
                        warn!(
                            target = %target,
                            error = %send_error,
                            "admin reply could not be delivered"
                        );
                        return self
                            .send_reply(&message.user_id, replies::reply_delivery_failed(target))
                            .await;
                    }
                    return Ok(());
                }
                GlobalCommand::Profile => {
                    return self.send_reply(&message.user_id, replies::profile(&session)).await;
                }
                GlobalCommand::Menu => {
                    self.commit_transition(&message.user_id, DialogueState::Idle).await?;
                    return self
                        .send_reply(&message.user_id, replies::render_prompt(&Prompt::MainMenu))
                        .await;
                }
                _ => {}
            }
        }

        // Inside the admin chat every remaining message is relayed verbatim,
        // shortcuts included. A failed relay leaves the state untouched.
        if state == DialogueState::ContactingAdmin && message.user_id != self.admin_user_id {
            let relayed = replies::admin_relay(&message.user_id, message.text.trim());
            if let Err(send_error) = self.transport.send(&self.admin_user_id, &relayed, None).await
            {
                warn!(
                    user_id = %message.user_id,
                    error = %send_error,
                    "relay to admin failed"
                );
                return self.send_reply(&message.user_id, replies::relay_failed()).await;
            }
            return Ok(());
        }

        if let Some(command) = command {
            match command {
                GlobalCommand::Price { symbol } => {
                    let reply = match self.prices.fetch_price(&symbol).await {
                        Ok(quote) => replies::price_quote(&quote),
                        Err(PriceError::UnknownSymbol(_)) => replies::unknown_symbol(&symbol),
                        Err(fetch_error) => {
                            warn!(symbol = %symbol, error = %fetch_error, "price lookup failed");
                            replies::price_unavailable(&symbol)
                        }
                    };
                    return self.send_reply(&message.user_id, reply).await;
                }
                GlobalCommand::OrderStatus => {
                    let orders = self
                        .orders
                        .list_recent_for_user(&message.user_id, ORDER_HISTORY_LIMIT)
                        .await?;
                    let mut entries = Vec::with_capacity(orders.len());
                    for order in orders {
                        let payment = self.payments.find_by_order(&order.id).await?;
                        entries.push((order, payment));
                    }
                    return self
                        .send_reply(&message.user_id, replies::orders_summary(&entries))
                        .await;
                }
                GlobalCommand::Help => {
                    return self
                        .send_reply(&message.user_id, replies::render_prompt(&Prompt::Help))
                        .await;
                }
                GlobalCommand::Feedback => {
                    self.commit_transition(&message.user_id, DialogueState::FeedbackRating)
                        .await?;
                    return self
                        .send_reply(
                            &message.user_id,
                            replies::render_prompt(&Prompt::RatingPrompt),
                        )
                        .await;
                }
                GlobalCommand::CancelFeedback => {
                    self.commit_transition(&message.user_id, DialogueState::Idle).await?;
                    return self
                        .send_reply(&message.user_id, replies::render_prompt(&Prompt::Cancelled))
                        .await;
                }
                GlobalCommand::Shop => {
                    self.commit_transition(&message.user_id, DialogueState::SelectingProductCategory)
                        .await?;
                    return self
                        .send_reply(
                            &message.user_id,
                            replies::render_prompt(&Prompt::CategoryMenu),
                        )
                        .await;
                }
                GlobalCommand::Support => {
                    self.commit_transition(&message.user_id, DialogueState::ContactingAdmin)
                        .await?;
                    return self
                        .send_reply(
                            &message.user_id,
                            replies::render_prompt(&Prompt::SupportIntro),
                        )
                        .await;
                }
                // Context-gated commands that did not apply above are
                // ordinary text as far as the state table is concerned.
                _ => {}
            }
        }

        let snapshot = self.snapshot(&message.user_id);
        let outcome = step(state, &message.text, &snapshot);
        self.apply_outcome(&message.user_id, state, outcome).await
    }

    /// Reconciles the durable session row with the scratch map and returns
    /// the effective state. The scratch copy wins on divergence and the
    /// durable row is rewritten to match.
    async fn resolve_state(
        &mut self,
        user_id: &UserId,
    ) -> Result<(DialogueState, UserSession), RouterError> {
        let now = Utc::now();
        let mut session = match self.sessions.find(user_id).await? {
            Some(mut session) => {
                session.last_seen_at = now;
                self.sessions.upsert(session.clone()).await?;
                session
            }
            None => {
                let session = UserSession::new(user_id.clone(), now);
                self.sessions.upsert(session.clone()).await?;
                session
            }
        };

        let durable = match DialogueState::from_label(session.dialogue_state.as_deref()) {
            Ok(state) => state,
            Err(label_error) => {
                warn!(user_id = %user_id, error = %label_error, "clearing unreadable dialogue state");
                self.sessions.set_state(user_id, None).await?;
                DialogueState::Idle
            }
        };

        let cached = self.scratch.get(user_id).map(|entry| entry.cached_state);
        let state = match cached {
            Some(cached) if cached != durable => {
                info!(
                    user_id = %user_id,
                    cached = ?cached,
                    durable = ?durable,
                    "dialogue state diverged; scratch copy wins"
                );
                self.sessions.set_state(user_id, cached.as_label()).await?;
                cached
            }
            Some(cached) => cached,
            None => {
                if !durable.is_idle() {
                    // Seen after a restart: the row survived, the map did not.
                    self.scratch.insert(user_id.clone(), ScratchEntry::new(durable));
                }
                durable
            }
        };

        // The returned row reflects the effective state, not whatever the
        // durable layer held before reconciliation.
        session.dialogue_state = state.as_label().map(str::to_owned);
        Ok((state, session))
    }

    /// Writes a transition to both layers. The durable row goes first so a
    /// crash in between leaves the recoverable copy ahead, not behind.
    async fn commit_transition(
        &mut self,
        user_id: &UserId,
        next: DialogueState,
    ) -> Result<(), RouterError> {
        self.sessions.set_state(user_id, next.as_label()).await?;
        if next.is_idle() {
            self.scratch.remove(user_id);
        } else {
            self.scratch
                .entry(user_id.clone())
                .or_insert_with(|| ScratchEntry::new(next))
                .cached_state = next;
        }
        Ok(())
    }

    fn snapshot(&self, user_id: &UserId) -> ScratchSnapshot {
        ScratchSnapshot {
            product_type: self
                .scratch
                .get(user_id)
                .and_then(|entry| entry.product_type.clone()),
        }
    }

    async fn apply_outcome(
        &mut self,
        user_id: &UserId,
        state: DialogueState,
        outcome: StepOutcome,
    ) -> Result<(), RouterError> {
        let mut extra_replies: Vec<Reply> = Vec::new();

        for action in &outcome.actions {
            match action {
                DialogueAction::SetProductType(product_type) => {
                    self.scratch
                        .entry(user_id.clone())
                        .or_insert_with(|| ScratchEntry::new(state))
                        .product_type = Some(product_type.clone());
                }
                DialogueAction::RecordRating(rating) => {
                    self.scratch
                        .entry(user_id.clone())
                        .or_insert_with(|| ScratchEntry::new(state))
                        .rating = Some(*rating);
                }
                DialogueAction::CommitOrder { details } => {
                    match self.trigger_order_payment(user_id, details).await {
                        Ok(payment) => extra_replies.push(replies::payment_instructions(&payment)),
                        Err(commit_error) => {
                            error!(
                                user_id = %user_id,
                                error = %commit_error,
                                "order commit failed"
                            );
                            extra_replies.push(replies::order_failed());
                        }
                    }
                }
                DialogueAction::ForwardFeedback { text } => {
                    let rating = self.scratch.get(user_id).and_then(|entry| entry.rating);
                    let relayed = replies::feedback_relay(user_id, rating, text);
                    if let Err(send_error) =
                        self.transport.send(&self.admin_user_id, &relayed, None).await
                    {
                        warn!(
                            user_id = %user_id,
                            error = %send_error,
                            "feedback could not be forwarded to the admin"
                        );
                    }
                }
            }
        }

        self.commit_transition(user_id, outcome.next).await?;

        for prompt in &outcome.prompts {
            self.send_reply(user_id, replies::render_prompt(prompt)).await?;
        }
        for reply in extra_replies {
            self.send_reply(user_id, reply).await?;
        }
        Ok(())
    }

    /// Persists the order, derives the reference code from its sequence id
    /// and records the pending payment. A payment failure after the order
    /// write is logged for manual reconciliation; the order stays.
    async fn trigger_order_payment(
        &self,
        user_id: &UserId,
        details: &str,
    ) -> Result<Payment, RepositoryError> {
        let amount_cents = order_amount_cents(details);
        let order_id = self
            .orders
            .create(NewOrder {
                user_id: user_id.clone(),
                details: details.to_owned(),
                amount_cents,
            })
            .await?;
        let reference_code = payment_reference(order_id);

        match self
            .payments
            .create(NewPayment {
                order_id,
                user_id: user_id.clone(),
                amount_cents,
                reference_code,
            })
            .await
        {
            Ok(payment) => {
                info!(
                    user_id = %user_id,
                    order_id = order_id.0,
                    amount_cents,
                    "order and pending payment recorded"
                );
                Ok(payment)
            }
            Err(payment_error) => {
                error!(
                    user_id = %user_id,
                    order_id = order_id.0,
                    error = %payment_error,
                    "order persisted without payment; manual reconciliation required"
                );
                Err(payment_error)
            }
        }
    }

    /// After a storage fault the dialogue position is suspect on both
    /// layers, so drop both and tell the user, best effort.
    async fn recover(&mut self, user_id: &UserId) {
        self.scratch.remove(user_id);
        if let Err(reset_error) = self.sessions.set_state(user_id, None).await {
            warn!(user_id = %user_id, error = %reset_error, "could not reset durable state");
        }
        let reply = replies::try_again_later();
        if let Err(send_error) =
            self.transport.send(user_id, &reply.text, reply.keyboard).await
        {
            warn!(user_id = %user_id, error = %send_error, "could not notify user of failure");
        }
    }

    async fn send_reply(&self, user_id: &UserId, reply: Reply) -> Result<(), RouterError> {
        self.transport.send(user_id, &reply.text, reply.keyboard).await?;
        Ok(())
    }
}
