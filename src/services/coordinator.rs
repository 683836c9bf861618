use std::sync::Arc;

use super::capacity_manager::{CapacityManager, RegistrationOutcome, WaitlistStatus};
use super::event_lifecycle::EventLifecycleService;
use super::expiry_sweeper::ExpirySweeper;
use super::promotion_controller::{PromotionController, SweepReport};
use crate::config::VolunteerConfig;
use crate::error::Result;
use crate::models::{Event, EventId, EventRoster, NewEvent, VolunteerId};
use crate::notifications::NotificationGateway;
use crate::state_machine::{AppliedTransition, EventStatus, ParticipationStatus};
use crate::system_context::SystemContext;

/// Caller-facing entry point wiring the services over one [`SystemContext`]
#[derive(Debug, Clone)]
pub struct VolunteerCoordinator {
    context: SystemContext,
    capacity: CapacityManager,
    promotions: PromotionController,
    lifecycle: EventLifecycleService,
}

impl VolunteerCoordinator {
    pub fn new(context: SystemContext) -> Self {
        let promotions = PromotionController::new(context.clone());
        let capacity = CapacityManager::new(context.clone(), promotions.clone());
        let lifecycle = EventLifecycleService::new(context.clone());
        Self {
            context,
            capacity,
            promotions,
            lifecycle,
        }
    }

    /// Coordinator over the in-memory store
    pub fn in_memory(config: VolunteerConfig, gateway: Arc<dyn NotificationGateway>) -> Self {
        Self::new(SystemContext::in_memory(config, gateway))
    }

    pub fn context(&self) -> &SystemContext {
        &self.context
    }

    pub fn capacity(&self) -> &CapacityManager {
        &self.capacity
    }

    pub fn promotions(&self) -> &PromotionController {
        &self.promotions
    }

    pub fn lifecycle(&self) -> &EventLifecycleService {
        &self.lifecycle
    }

    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(self.context.clone(), self.promotions.clone())
    }

    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        self.lifecycle.create_event(new_event).await
    }

    pub async fn get_event(&self, event_id: EventId) -> Result<EventRoster> {
        self.lifecycle.get_event(event_id).await
    }

    pub async fn transition_status(
        &self,
        event_id: EventId,
        target: EventStatus,
    ) -> Result<AppliedTransition> {
        self.lifecycle.transition_status(event_id, target).await
    }

    pub async fn register(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<RegistrationOutcome> {
        self.capacity.register(event_id, volunteer_id).await
    }

    pub async fn unregister(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        self.capacity.unregister(event_id, volunteer_id).await
    }

    pub async fn join_waitlist(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<usize> {
        self.capacity.join_waitlist(event_id, volunteer_id).await
    }

    pub async fn leave_waitlist(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        self.capacity.leave_waitlist(event_id, volunteer_id).await
    }

    pub async fn waitlist_status(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<WaitlistStatus> {
        self.capacity.waitlist_status(event_id, volunteer_id).await
    }

    pub async fn accept_promotion(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        self.promotions.accept_promotion(event_id, volunteer_id).await
    }

    pub async fn decline_promotion(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        self.promotions.decline_promotion(event_id, volunteer_id).await
    }

    pub async fn promote(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        self.promotions.promote(event_id, volunteer_id).await
    }

    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        self.promotions.sweep_expired().await
    }

    pub async fn record_attendance(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
        attended: bool,
    ) -> Result<ParticipationStatus> {
        self.lifecycle
            .record_attendance(event_id, volunteer_id, attended)
            .await
    }
}
