//! # Promotion & Expiry Controller
//!
//! Turns freed seats into time-limited offers for waitlisted volunteers.
//!
//! ## Offer Flow
//!
//! 1. A seat frees up (unregistration, decline, expiry, waitlist leave)
//! 2. The next WAITING entry becomes NOTIFIED with `expires_at = now + window`
//! 3. The volunteer accepts (REGISTERED, entry PROMOTED) or the offer lapses
//! 4. Lapsed offers are expired by the sweep and the next entry is offered
//!
//! Offers never outnumber free seats. Offered seats are not reserved: a direct
//! registration may take one first, in which case the late acceptance fails
//! with `EventFull` and the entry goes back in line at its original position.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info};

use super::critical_section::{run_exclusive, Outbox};
use crate::constants::{events, system};
use crate::error::{Result, VolunteerError};
use crate::logging::{log_error, log_promotion_operation};
use crate::models::{EventId, EventRoster, VolunteerId};
use crate::notifications::NotificationKind;
use crate::state_machine::{EventStateMachine, ParticipationStatus};
use crate::system_context::SystemContext;

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub events_scanned: usize,
    pub offers_expired: usize,
    pub offers_sent: usize,
    pub failures: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.offers_expired == 0 && self.offers_sent == 0 && self.failures == 0
    }
}

/// Per-event expiry result, folded into a [`SweepReport`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryOutcome {
    pub expired: usize,
    pub offered: usize,
}

#[derive(Debug, Clone)]
pub struct PromotionController {
    context: SystemContext,
}

impl PromotionController {
    pub fn new(context: SystemContext) -> Self {
        Self { context }
    }

    fn window(&self) -> Duration {
        self.context.config.acceptance_window()
    }

    /// Offer free, unoffered seats to the next waiting volunteers.
    ///
    /// Runs inside the caller's critical section. Returns the volunteers offered
    /// a seat.
    pub fn on_seat_freed(
        &self,
        roster: &mut EventRoster,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Vec<VolunteerId> {
        let mut offered = Vec::new();
        if !roster.event.status.permits_waitlist_join() || roster.event.has_started(now) {
            return offered;
        }

        let event_id = roster.event.id;
        let window = self.window();
        while roster.unoffered_seats() > 0 {
            let Some(entry) = roster.waitlist_mut().notify_next(now, window) else {
                break;
            };
            let volunteer_id = entry.volunteer_id;
            let expires_at = entry.expires_at.unwrap_or(now + window);

            log_promotion_operation(
                "offer",
                &event_id.to_string(),
                &volunteer_id.to_string(),
                "notified",
                Some(&expires_at.to_rfc3339()),
            );
            outbox.notify(
                volunteer_id,
                event_id,
                NotificationKind::SeatOffered { expires_at },
            );
            outbox.publish(
                events::WAITLIST_OFFER_SENT,
                json!({
                    "event_id": event_id,
                    "volunteer_id": volunteer_id,
                    "expires_at": expires_at,
                }),
            );
            offered.push(volunteer_id);
        }
        offered
    }

    /// Expire one outstanding offer: archive the entry and cancel the record
    fn expire_offer(
        &self,
        roster: &mut EventRoster,
        volunteer_id: VolunteerId,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let event_id = roster.event.id;
        let entry = roster
            .waitlist_mut()
            .mark_expired(volunteer_id)
            .ok_or_else(|| VolunteerError::waitlist_entry_not_found(event_id, volunteer_id))?;

        if roster.active_participation(volunteer_id).is_some() {
            roster.transition_participation(
                volunteer_id,
                ParticipationStatus::Cancelled,
                Some(system::REASON_PROMOTION_EXPIRED),
                now,
            )?;
        }

        log_promotion_operation(
            "expire",
            &event_id.to_string(),
            &volunteer_id.to_string(),
            "expired",
            entry.expires_at.map(|t| t.to_rfc3339()).as_deref(),
        );
        outbox.notify(volunteer_id, event_id, NotificationKind::OfferExpired);
        outbox.publish(
            events::WAITLIST_OFFER_EXPIRED,
            json!({
                "event_id": event_id,
                "volunteer_id": volunteer_id,
                "expired_at": entry.expires_at,
            }),
        );
        Ok(())
    }

    /// Expire every lapsed offer on the roster, then cascade to the next entries
    pub fn expire_lapsed(
        &self,
        roster: &mut EventRoster,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<ExpiryOutcome> {
        let lapsed = roster.waitlist().expired_offers(now);
        for volunteer_id in &lapsed {
            self.expire_offer(roster, *volunteer_id, now, outbox)?;
        }
        if lapsed.is_empty() {
            return Ok(ExpiryOutcome::default());
        }

        let offered = self.on_seat_freed(roster, now, outbox);
        Ok(ExpiryOutcome {
            expired: lapsed.len(),
            offered: offered.len(),
        })
    }

    /// Accept an outstanding seat offer
    pub async fn accept_promotion(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        run_exclusive(
            &self.context,
            event_id,
            "accept_promotion",
            |roster, now, outbox| {
                let entry = roster
                    .waitlist()
                    .entry(volunteer_id)
                    .ok_or_else(|| VolunteerError::waitlist_entry_not_found(event_id, volunteer_id))?;
                if !entry.is_notified() {
                    return Err(VolunteerError::PromotionNotOffered {
                        event_id,
                        volunteer_id,
                    });
                }

                if entry.is_offer_expired(now) {
                    let expired_at = entry.expires_at.unwrap_or(now);
                    self.expire_offer(roster, volunteer_id, now, outbox)?;
                    self.on_seat_freed(roster, now, outbox);
                    outbox.keep_changes_on_error();
                    return Err(VolunteerError::PromotionWindowExpired {
                        event_id,
                        volunteer_id,
                        expired_at,
                    });
                }

                roster.event.ensure_not_started(now)?;

                if !roster.has_free_seat() {
                    // Seat went to a direct registration; back in line.
                    roster.waitlist_mut().revert_to_waiting(volunteer_id);
                    self.on_seat_freed(roster, now, outbox);
                    outbox.keep_changes_on_error();
                    log_promotion_operation(
                        "accept",
                        &event_id.to_string(),
                        &volunteer_id.to_string(),
                        "reverted",
                        None,
                    );
                    return Err(VolunteerError::EventFull { event_id });
                }

                self.promote_in_roster(
                    roster,
                    volunteer_id,
                    system::REASON_PROMOTION_ACCEPTED,
                    now,
                    outbox,
                )
            },
        )
        .await
    }

    /// Turn down an outstanding offer and pass the seat on
    pub async fn decline_promotion(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<()> {
        run_exclusive(
            &self.context,
            event_id,
            "decline_promotion",
            |roster, now, outbox| {
                let entry = roster
                    .waitlist()
                    .entry(volunteer_id)
                    .ok_or_else(|| VolunteerError::waitlist_entry_not_found(event_id, volunteer_id))?;
                if !entry.is_notified() {
                    return Err(VolunteerError::PromotionNotOffered {
                        event_id,
                        volunteer_id,
                    });
                }

                roster.transition_participation(
                    volunteer_id,
                    ParticipationStatus::Cancelled,
                    Some(system::REASON_PROMOTION_DECLINED),
                    now,
                )?;
                roster.waitlist_mut().leave(volunteer_id);

                log_promotion_operation(
                    "decline",
                    &event_id.to_string(),
                    &volunteer_id.to_string(),
                    "declined",
                    None,
                );
                outbox.publish(
                    events::WAITLIST_OFFER_DECLINED,
                    json!({ "event_id": event_id, "volunteer_id": volunteer_id }),
                );

                self.on_seat_freed(roster, now, outbox);
                Ok(())
            },
        )
        .await
    }

    /// Administrative override: seat a waitlisted volunteer immediately.
    ///
    /// Skips the offer step but still honours capacity.
    pub async fn promote(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        run_exclusive(&self.context, event_id, "promote", |roster, now, outbox| {
            if !roster.event.status.permits_waitlist_join() {
                return Err(VolunteerError::EventNotOpen {
                    event_id,
                    status: roster.event.status,
                });
            }
            roster.event.ensure_not_started(now)?;
            if !roster.waitlist().contains(volunteer_id) {
                return Err(VolunteerError::waitlist_entry_not_found(
                    event_id,
                    volunteer_id,
                ));
            }
            if !roster.has_free_seat() {
                return Err(VolunteerError::EventFull { event_id });
            }

            self.promote_in_roster(
                roster,
                volunteer_id,
                system::REASON_MANUAL_PROMOTION,
                now,
                outbox,
            )
        })
        .await
    }

    /// Move a waitlisted volunteer into a seat; caller has checked capacity
    fn promote_in_roster(
        &self,
        roster: &mut EventRoster,
        volunteer_id: VolunteerId,
        reason: &'static str,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let event_id = roster.event.id;
        roster.transition_participation(volunteer_id, ParticipationStatus::Registered, Some(reason), now)?;
        roster.waitlist_mut().mark_promoted(volunteer_id);

        if let Some(applied) = EventStateMachine::sync_capacity_status(roster, now)? {
            outbox.status_changed(event_id, applied.from, applied.to);
        }

        log_promotion_operation(
            "promote",
            &event_id.to_string(),
            &volunteer_id.to_string(),
            "promoted",
            None,
        );
        outbox.notify(volunteer_id, event_id, NotificationKind::PromotionConfirmed);
        outbox.publish(
            events::WAITLIST_PROMOTED,
            json!({
                "event_id": event_id,
                "volunteer_id": volunteer_id,
                "reason": reason,
                "seats_taken": roster.seats_taken(),
            }),
        );

        self.on_seat_freed(roster, now, outbox);
        Ok(())
    }

    /// Expire lapsed offers on one event
    pub async fn sweep_event(&self, event_id: EventId) -> Result<ExpiryOutcome> {
        run_exclusive(&self.context, event_id, "sweep_expired", |roster, now, outbox| {
            self.expire_lapsed(roster, now, outbox)
        })
        .await
    }

    /// Expire every lapsed offer across all events.
    ///
    /// Idempotent: a second call with no time passing finds nothing to do. A
    /// failure on one event is logged and counted, and the sweep moves on.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = self.context.now();
        let event_ids = self.context.store.events_with_expired_offers(now).await?;

        let mut report = SweepReport {
            events_scanned: event_ids.len(),
            ..SweepReport::default()
        };

        for event_id in event_ids {
            match self.sweep_event(event_id).await {
                Ok(outcome) => {
                    report.offers_expired += outcome.expired;
                    report.offers_sent += outcome.offered;
                }
                Err(e) => {
                    report.failures += 1;
                    log_error(
                        "promotion_controller",
                        "sweep_expired",
                        &e.to_string(),
                        Some(&event_id.to_string()),
                    );
                }
            }
        }

        if report.is_idle() {
            debug!(events_scanned = report.events_scanned, "No lapsed offers this sweep");
        } else {
            info!(
                events_scanned = report.events_scanned,
                offers_expired = report.offers_expired,
                offers_sent = report.offers_sent,
                failures = report.failures,
                "Expiry sweep completed"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolunteerConfig;
    use crate::state_machine::EventStatus;
    use crate::test_helpers::{EventFactory, RecordingNotificationGateway};
    use std::sync::Arc;

    fn controller() -> PromotionController {
        PromotionController::new(SystemContext::in_memory(
            VolunteerConfig::default(),
            Arc::new(RecordingNotificationGateway::new()),
        ))
    }

    fn full_roster_with_waitlist(waiting: usize, now: DateTime<Utc>) -> (EventRoster, Vec<VolunteerId>) {
        let mut roster = EventFactory::new()
            .capacity(1)
            .waitlist(5)
            .status(EventStatus::Full)
            .build();
        let event_id = roster.event.id;
        roster
            .open_participation(VolunteerId::new(), ParticipationStatus::Registered, now)
            .unwrap();
        let volunteers: Vec<VolunteerId> = (0..waiting).map(|_| VolunteerId::new()).collect();
        for v in &volunteers {
            roster.waitlist_mut().join(event_id, *v, now, 5).unwrap();
            roster
                .open_participation(*v, ParticipationStatus::Waitlisted, now)
                .unwrap();
        }
        (roster, volunteers)
    }

    #[test]
    fn test_no_offer_while_full() {
        let now = Utc::now();
        let (mut roster, _) = full_roster_with_waitlist(2, now);
        let mut outbox = Outbox::default();
        assert!(controller().on_seat_freed(&mut roster, now, &mut outbox).is_empty());
        assert!(outbox.notifications().is_empty());
    }

    #[test]
    fn test_offers_match_free_seats() {
        let now = Utc::now();
        let (mut roster, volunteers) = full_roster_with_waitlist(3, now);
        roster.event.capacity = 3;
        roster.event.status = EventStatus::Approved;

        let mut outbox = Outbox::default();
        let offered = controller().on_seat_freed(&mut roster, now, &mut outbox);
        assert_eq!(offered, vec![volunteers[0], volunteers[1]]);
        assert_eq!(roster.waitlist().notified_count(), 2);
        assert_eq!(roster.unoffered_seats(), 0);
        assert_eq!(outbox.event_names(), vec![events::WAITLIST_OFFER_SENT; 2]);

        // A second call offers nothing more
        assert!(controller().on_seat_freed(&mut roster, now, &mut outbox).is_empty());
    }

    #[test]
    fn test_expire_lapsed_cascades_to_next_entry() {
        let now = Utc::now();
        let (mut roster, volunteers) = full_roster_with_waitlist(2, now);
        roster.event.capacity = 2;
        roster.event.status = EventStatus::Approved;
        let controller = controller();

        let mut outbox = Outbox::default();
        controller.on_seat_freed(&mut roster, now, &mut outbox);

        let later = now + Duration::hours(25);
        let outcome = controller
            .expire_lapsed(&mut roster, later, &mut outbox)
            .unwrap();
        assert_eq!(outcome, ExpiryOutcome { expired: 1, offered: 1 });
        assert!(roster.active_participation(volunteers[0]).is_none());
        assert!(roster.waitlist().entry(volunteers[1]).unwrap().is_notified());

        // Nothing else lapsed at the same instant
        let again = controller
            .expire_lapsed(&mut roster, later, &mut outbox)
            .unwrap();
        assert_eq!(again, ExpiryOutcome::default());
    }

    #[test]
    fn test_no_offers_after_event_start() {
        let now = Utc::now();
        let (mut roster, _) = full_roster_with_waitlist(1, now);
        roster.event.capacity = 2;
        roster.event.status = EventStatus::Approved;
        let after_start = roster.event.start_time;

        let mut outbox = Outbox::default();
        assert!(controller()
            .on_seat_freed(&mut roster, after_start, &mut outbox)
            .is_empty());
    }
}
