//! Inputs and outcomes of store operations that span more than one row.
//! Record types themselves live in kindred-types.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    AccountMissing,
    AlreadyPaired,
    /// No unpaired account (other than the caller) holds the code.
    InvalidCode,
    Paired { partner_email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOutcome {
    AccountMissing,
    /// The account got paired in the meantime; its code is left alone.
    AlreadyPaired,
    /// Another account holds the code. Try a different one.
    InUse,
    Assigned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchupOutcome {
    AccountMissing,
    NotOnBreak,
    NoPartner,
    PartnerMissing,
    /// Request recorded; the partner has not asked yet.
    Waiting,
    /// Both asked: the pair is active again.
    Completed,
}

/// Partial reminder update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ReminderChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub priority: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurring_type: Option<String>,
}
