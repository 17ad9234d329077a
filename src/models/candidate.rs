use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of candidate lifecycle states. `Rejected` and `Completed` are
/// terminal; `Completed` is reachable only from `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "candidate_status", rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl CandidateStatus {
    pub fn can_transition_to(self, next: CandidateStatus) -> bool {
        match (self, next) {
            (CandidateStatus::Pending, CandidateStatus::Approved) => true,
            (CandidateStatus::Pending, CandidateStatus::Rejected) => true,
            (CandidateStatus::Approved, CandidateStatus::Completed) => true,
            (CandidateStatus::Pending, _) => false,
            (CandidateStatus::Approved, _) => false,
            (CandidateStatus::Rejected, _) => false,
            (CandidateStatus::Completed, _) => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CandidateStatus::Rejected | CandidateStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Approved => "approved",
            CandidateStatus::Rejected => "rejected",
            CandidateStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CandidateStatus::Pending),
            "approved" => Ok(CandidateStatus::Approved),
            "rejected" => Ok(CandidateStatus::Rejected),
            "completed" => Ok(CandidateStatus::Completed),
            other => Err(format!("unknown candidate status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidat {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub date_naissance: NaiveDate,
    pub email: String,
    pub telephone: String,
    pub adresse: String,
    pub numero_cnoa: String,
    pub piece_identite_recto: String,
    pub piece_identite_verso: String,
    pub fichier_biographie: Option<String>,
    pub fichier_note_intention: Option<String>,
    pub fichier_projet: Option<String>,
    pub statut: CandidateStatus,
    #[serde(skip_serializing)]
    pub token_step2: Option<String>,
    pub langue: String,
    pub created_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_only_reach_jury_decisions() {
        let s = CandidateStatus::Pending;
        assert!(s.can_transition_to(CandidateStatus::Approved));
        assert!(s.can_transition_to(CandidateStatus::Rejected));
        assert!(!s.can_transition_to(CandidateStatus::Completed));
        assert!(!s.can_transition_to(CandidateStatus::Pending));
    }

    #[test]
    fn completed_only_from_approved() {
        assert!(CandidateStatus::Approved.can_transition_to(CandidateStatus::Completed));
        assert!(!CandidateStatus::Approved.can_transition_to(CandidateStatus::Rejected));
        assert!(!CandidateStatus::Approved.can_transition_to(CandidateStatus::Pending));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [CandidateStatus::Rejected, CandidateStatus::Completed] {
            assert!(terminal.is_terminal());
            for next in [
                CandidateStatus::Pending,
                CandidateStatus::Approved,
                CandidateStatus::Rejected,
                CandidateStatus::Completed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CandidateStatus::Pending,
            CandidateStatus::Approved,
            CandidateStatus::Rejected,
            CandidateStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<CandidateStatus>(), Ok(status));
        }
        assert!("archived".parse::<CandidateStatus>().is_err());
    }
}
