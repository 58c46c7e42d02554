/// Ticket handed to a request when it is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Orders overlapping request/response calls of one kind.
///
/// Only the completion of the most recently issued ticket may be applied;
/// anything older finished late and is dropped.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: u64,
}

impl RequestSequencer {
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }
}
