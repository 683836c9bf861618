use serde::{Deserialize, Serialize};
use std::fmt;

/// Event lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created, awaiting review
    Pending,
    /// Open for registration
    Approved,
    /// Rejected during review
    Rejected,
    /// Every seat is taken; only waitlist joins are accepted
    Full,
    /// Called off by the organizer
    Cancelled,
    /// Event took place
    Completed,
}

impl EventStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    /// Direct registration is only permitted while approved
    pub fn permits_registration(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Waitlist joins are permitted while approved or full
    pub fn permits_waitlist_join(&self) -> bool {
        matches!(self, Self::Approved | Self::Full)
    }

    /// States the lifecycle graph allows moving to from this one
    pub fn allowed_transitions(&self) -> &'static [EventStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Full, Self::Cancelled, Self::Completed],
            Self::Full => &[Self::Approved, Self::Cancelled, Self::Completed],
            Self::Rejected | Self::Cancelled | Self::Completed => &[],
        }
    }

    /// Check a single edge of the lifecycle graph
    pub fn can_transition_to(&self, target: EventStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Full => write!(f, "full"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "full" => Ok(Self::Full),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid event status: {s}")),
        }
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Participation record states for one volunteer at one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    /// Holds a seat
    Registered,
    /// Queued for a seat
    Waitlisted,
    /// Withdrawn, expired or cancelled with the event
    Cancelled,
    /// Showed up
    Attended,
    /// Held a seat but did not show up
    NoShow,
}

impl ParticipationStatus {
    /// Active records block a second registration for the same event
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Statuses counted against event capacity
    pub fn holds_seat(&self) -> bool {
        matches!(self, Self::Registered | Self::Attended | Self::NoShow)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Attended | Self::NoShow)
    }

    pub fn allowed_transitions(&self) -> &'static [ParticipationStatus] {
        match self {
            Self::Waitlisted => &[Self::Registered, Self::Cancelled],
            Self::Registered => &[Self::Cancelled, Self::Attended, Self::NoShow],
            Self::Cancelled | Self::Attended | Self::NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, target: ParticipationStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Waitlisted => write!(f, "waitlisted"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Attended => write!(f, "attended"),
            Self::NoShow => write!(f, "no_show"),
        }
    }
}

impl std::str::FromStr for ParticipationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "waitlisted" => Ok(Self::Waitlisted),
            "cancelled" => Ok(Self::Cancelled),
            "attended" => Ok(Self::Attended),
            "no_show" => Ok(Self::NoShow),
            _ => Err(format!("Invalid participation status: {s}")),
        }
    }
}

/// Waitlist entry states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistEntryStatus {
    /// Queued, no offer yet
    Waiting,
    /// Offered a seat, acceptance window running
    Notified,
    /// Acceptance window lapsed
    Expired,
    /// Accepted the offer and took a seat
    Promoted,
}

impl WaitlistEntryStatus {
    /// Active entries count against `max_waitlist_size`
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Waiting | Self::Notified)
    }
}

impl fmt::Display for WaitlistEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Notified => write!(f, "notified"),
            Self::Expired => write!(f, "expired"),
            Self::Promoted => write!(f, "promoted"),
        }
    }
}

impl std::str::FromStr for WaitlistEntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "notified" => Ok(Self::Notified),
            "expired" => Ok(Self::Expired),
            "promoted" => Ok(Self::Promoted),
            _ => Err(format!("Invalid waitlist entry status: {s}")),
        }
    }
}
