use proptest::prelude::*;

/// One caller request against a single event, by volunteer index
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Register(usize),
    Unregister(usize),
    LeaveWaitlist(usize),
    Accept(usize),
    Decline(usize),
    /// Advance the clock by this many hours, then sweep
    Sweep(i64),
}

pub fn operation_strategy(volunteers: usize) -> impl Strategy<Value = Operation> {
    let v = 0..volunteers;
    prop_oneof![
        4 => v.clone().prop_map(Operation::Register),
        2 => v.clone().prop_map(Operation::Unregister),
        1 => v.clone().prop_map(Operation::LeaveWaitlist),
        2 => v.clone().prop_map(Operation::Accept),
        1 => v.prop_map(Operation::Decline),
        1 => (0i64..30).prop_map(Operation::Sweep),
    ]
}

pub fn operation_sequence_strategy(
    volunteers: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(volunteers), 1..max_len)
}

/// (capacity, max waitlist size)
pub fn event_shape_strategy() -> impl Strategy<Value = (u32, u32)> {
    (1u32..5, 0u32..4)
}
